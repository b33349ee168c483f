//! 第三方复杂度指标库接口.
//!
//! 本 crate 只负责选择要计算的指标, 具体计算由实现 [`MetricLibrary`] 的外部库完成.

use crate::plan::Plan;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 外部指标库提供的指标.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LibraryMetric {
    /// 复杂度指数 (complexity index).
    PyComplexity,
    /// 平均面积估计.
    MeanAreaEstimator,
    /// 面积估计.
    AreaEstimator,
    /// 孔径不规则度.
    ApertureIrregularity,
}

/// 默认计算的外部指标.
pub const DEFAULT_LIBRARY_METRICS: [LibraryMetric; 4] = [
    LibraryMetric::PyComplexity,
    LibraryMetric::MeanAreaEstimator,
    LibraryMetric::AreaEstimator,
    LibraryMetric::ApertureIrregularity,
];

impl LibraryMetric {
    /// 指标单位.
    pub const fn unit(&self) -> &'static str {
        match self {
            LibraryMetric::PyComplexity => "CI [mm^-1]",
            LibraryMetric::MeanAreaEstimator | LibraryMetric::AreaEstimator => "mm^2",
            LibraryMetric::ApertureIrregularity => "dimensionless",
        }
    }

    /// 指标名.
    pub const fn name(&self) -> &'static str {
        match self {
            LibraryMetric::PyComplexity => "PyComplexityMetric",
            LibraryMetric::MeanAreaEstimator => "MeanAreaMetricEstimator",
            LibraryMetric::AreaEstimator => "AreaMetricEstimator",
            LibraryMetric::ApertureIrregularity => "ApertureIrregularityMetric",
        }
    }
}

/// 外部指标库.
pub trait MetricLibrary {
    /// 计划级指标值. 无法计算时返回 `None`.
    fn for_plan(&self, metric: LibraryMetric, plan: &Plan) -> Option<f64>;
}

/// 一次外部指标读数.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct LibraryReading {
    /// 指标.
    pub metric: LibraryMetric,
    /// 计划级指标值.
    pub value: f64,
    /// 单位.
    pub unit: &'static str,
}
