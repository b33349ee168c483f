//! 批量计划复杂度报告.
//!
//! 读取 `$RTP_PLAN_DIR` (或 `$HOME/dataset/plans`) 下的所有计划, 并行计算, 逐个打印报告.

mod result;
mod runner;

use log::LevelFilter;
use simple_logger::SimpleLogger;

fn main() {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .init()
        .expect("Logger initialization error");

    runner::run().analyze();
}
