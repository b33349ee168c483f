//! 批量分析程序依赖的通用组件.

use rtp_berry::MetricConfig;
use std::env;
use std::io::{self, Write};

pub mod loader;

const SEP: &str = "--------------------------------------------------------";

/// 简单分隔线.
#[inline]
pub fn sep() {
    println!("{SEP}");
}

/// 简单分隔线.
#[inline]
pub fn sep_to<W: Write>(mut w: W) -> io::Result<()> {
    writeln!(&mut w, "{SEP}")
}

/// 获得可并行核心数.
pub fn cpus() -> usize {
    std::thread::available_parallelism().map_or_else(|_| num_cpus::get(), usize::from)
}

/// 获取指标计算参数.
///
/// 1. 若环境变量 `$RTP_LEAF_PITCH` 是合法的叶片宽度, 则使用该宽度和默认门限;
/// 2. 否则使用 [`MetricConfig::standard`].
pub fn config_from_env() -> MetricConfig {
    let Ok(s) = env::var("RTP_LEAF_PITCH") else {
        return MetricConfig::standard();
    };
    match s.trim().parse::<f64>().ok().and_then(MetricConfig::with_leaf_pitch) {
        Some(c) => c,
        None => {
            log::warn!("invalid $RTP_LEAF_PITCH `{s}`, using the standard leaf pitch");
            MetricConfig::standard()
        }
    }
}
