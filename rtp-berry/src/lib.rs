#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 从放疗计划 (RT Plan) 中每个射束的控制点序列出发,
//! 计算与射束调制程度相关的几何复杂度指标.
//!
//! 该 crate 不解析 DICOM 文件. 计划数据由外部读取器转换为 [`plan`] 模块中的结构,
//! 本 crate 只负责消费这些只读快照并产出指标.
//!
//! # 计算流程
//!
//! ```text
//! ComplexityEngine -> 每个射束 -> 每个控制点 -> metrics::aperture::analyze
//!                  -> metrics::beam::aggregate (射束内归约)
//!                  -> metrics::plan::aggregate (射束间 MU 加权归约)
//! ```
//!
//! # 注意
//!
//! 1. 所有长度单位与叶片宽度 (`leaf_pitch`) 保持一致, 默认按毫米理解.
//! 2. 控制点顺序即照射顺序, 所有序列都是有序的, 不使用无序容器.
//!
//! # 开发计划
//!
//! ### 单控制点孔径几何 ✅
//!
//! 面积, 周长, LSV, 孔径大小直方图.
//!
//! 实现位于 `rtp-berry/src/metrics/aperture.rs`.
//!
//! ### 射束级指标 ✅
//!
//! 增量 MU 分配, AAV, M, MCS, MCSV, MFC, BI, SAS.
//!
//! 实现位于 `rtp-berry/src/metrics/beam.rs`.
//!
//! ### 计划级指标 ✅
//!
//! 实现位于 `rtp-berry/src/metrics/plan.rs`.
//!
//! ### 控制点统计 ✅
//!
//! 平均值, 标准差, 最值, 中位数.
//!
//! 实现位于 `rtp-berry/src/metrics/stats.rs`.
//!
//! ### 第三方指标库接口 ⌛️
//!
//! 目前仅提供指标枚举和 trait, 具体计算由外部实现.

pub mod config;
pub mod consts;
pub mod engine;
mod error;
pub mod library;
pub mod metrics;
pub mod plan;
pub mod prelude;

pub use config::MetricConfig;
pub use engine::{ComplexityEngine, PlanComplexity};
pub use error::{CalcError, GeometryError, MissingField};
pub use plan::{Beam, Collimator, ControlPoint, JawWindow, LeafBanks, Plan};

/// 复杂度计算运行时错误.
pub type CalcResult<T> = Result<T, CalcError>;

#[cfg(test)]
pub(crate) mod testing;
