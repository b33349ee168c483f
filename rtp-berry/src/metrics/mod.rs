//! 复杂度指标.
//!
//! 自底向上分为三层: 控制点孔径几何 [`aperture`], 射束内归约 [`beam`],
//! 射束间 MU 加权归约 [`plan`]. 另外 [`stats`] 提供跨射束的控制点统计.

pub mod aperture;
pub mod beam;
pub mod plan;
pub mod stats;

pub use aperture::{ApertureMetrics, Overlap};
pub use beam::{BeamMetrics, ControlPointMetrics};
pub use plan::PlanMetrics;
pub use stats::{ControlPointStats, Summary};
