//! 计划级指标: 射束指标的 MU 加权合并.

use super::beam::BeamMetrics;
use crate::{CalcError, CalcResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 计划级指标.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlanMetrics {
    /// 计划总跳数.
    pub mu: f64,
    /// MU 加权的 M.
    pub m: f64,
    /// MU 加权的 MCS.
    pub mcs: f64,
    /// MU 加权的 MCSV.
    pub mcsv: f64,
    /// MU 加权的 MFC.
    pub mfc: f64,
    /// 计划不规则度 PI (MU 加权的 BI).
    pub pi: f64,
    /// 所有射束存在的控制点个数之和.
    pub n_cp: usize,
    /// 平均孔径不超过 1 cm 的控制点个数之和.
    pub avg_aperture_lt_1cm: u32,
    /// 铅门窗口高度不超过 1 cm 的控制点个数之和.
    pub y_diff_lt_1cm: u32,
}

/// 合并所有射束的指标.
///
/// 比值型指标按 `sum(MU_beam * X_beam) / sum(MU_beam)` 加权,
/// 计数型指标直接求和. `beams` 为空时返回 `Err(CalcError::EmptyPlan)`.
pub fn aggregate(beams: &[BeamMetrics]) -> CalcResult<PlanMetrics> {
    if beams.is_empty() {
        return Err(CalcError::EmptyPlan);
    }

    let mu: f64 = beams.iter().map(|b| b.mu).sum();
    let weighted = |x: fn(&BeamMetrics) -> f64| {
        beams.iter().map(|b| b.mu * x(b)).sum::<f64>() / mu
    };

    Ok(PlanMetrics {
        mu,
        m: weighted(|b| b.m),
        mcs: weighted(|b| b.mcs),
        mcsv: weighted(|b| b.mcsv),
        mfc: weighted(|b| b.mfc),
        pi: weighted(|b| b.bi),
        n_cp: beams.iter().map(BeamMetrics::n_control_points).sum(),
        avg_aperture_lt_1cm: beams.iter().map(|b| b.avg_aperture_lt_1cm).sum(),
        y_diff_lt_1cm: beams.iter().map(|b| b.y_diff_lt_1cm).sum(),
    })
}
