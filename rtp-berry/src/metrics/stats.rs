//! 控制点级指标的统计描述.

use super::beam::{BeamMetrics, ControlPointMetrics};
use ordered_float::OrderedFloat;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 一组数值的统计描述.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Summary {
    /// 平均值.
    pub avg: f64,
    /// 总体标准差.
    pub std: f64,
    /// 最大值.
    pub max: f64,
    /// 最小值.
    pub min: f64,
    /// 中位数. 偶数个数据时取中间两个值的平均.
    pub med: f64,
}

impl Summary {
    /// 统计 `values`. 为空时返回 `None`.
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let avg = values.iter().sum::<f64>() / n;
        let std = (values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / n).sqrt();

        let mut sorted: Vec<OrderedFloat<f64>> =
            values.iter().copied().map(OrderedFloat).collect();
        sorted.sort_unstable();
        let mid = sorted.len() / 2;
        let med = if sorted.len() % 2 == 0 {
            (sorted[mid - 1].0 + sorted[mid].0) / 2.0
        } else {
            sorted[mid].0
        };

        Some(Self {
            avg,
            std,
            max: sorted[sorted.len() - 1].0,
            min: sorted[0].0,
            med,
        })
    }
}

/// 跨射束汇集的控制点统计. 每一项为 `(字段名, 统计描述)`, 顺序固定.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ControlPointStats {
    entries: Vec<(String, Summary)>,
}

impl ControlPointStats {
    /// 汇集 `beams` 中所有存在的控制点记录并统计每个数值字段.
    ///
    /// 门限字段名取自第一个射束的门限. 没有任何控制点记录时返回 `None`.
    pub fn collect(beams: &[BeamMetrics]) -> Option<Self> {
        let thresholds = beams.first()?.thresholds;
        let records: Vec<Vec<(String, f64)>> = beams
            .iter()
            .flat_map(|b| b.present())
            .map(|cp| fields(cp, thresholds))
            .collect();
        let first = records.first()?;

        let entries = (0..first.len())
            .filter_map(|k| {
                let values: Vec<f64> = records.iter().map(|r| r[k].1).collect();
                Some((first[k].0.clone(), Summary::of(&values)?))
            })
            .collect();
        Some(Self { entries })
    }

    /// 按字段名查找.
    pub fn get(&self, field: &str) -> Option<&Summary> {
        self.entries
            .iter()
            .find_map(|(name, s)| (name == field).then_some(s))
    }

    /// 迭代所有字段.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Summary)> + '_ {
        self.entries.iter().map(|(name, s)| (name.as_str(), s))
    }

    /// 展平为 `<字段>_avg`, `<字段>_std`, `<字段>_max`, `<字段>_min`, `<字段>_med`.
    pub fn flatten(&self) -> Vec<(String, f64)> {
        self.iter()
            .flat_map(|(name, s)| {
                [
                    (format!("{name}_avg"), s.avg),
                    (format!("{name}_std"), s.std),
                    (format!("{name}_max"), s.max),
                    (format!("{name}_min"), s.min),
                    (format!("{name}_med"), s.med),
                ]
            })
            .collect()
    }
}

/// 控制点记录的全部数值字段, 顺序与 [`crate::engine::PlanComplexity::to_json`] 一致.
pub(crate) fn fields(cp: &ControlPointMetrics, thresholds: [f64; 4]) -> Vec<(String, f64)> {
    let a = &cp.aperture;
    let mut v: Vec<(String, f64)> = [
        ("minAperture", a.min_aperture),
        ("maxAperture", a.max_aperture),
        ("maxApertureNoAlign", a.max_aperture_no_align),
        ("avgAperture", a.avg_aperture),
        ("sumAllApertures", a.sum_all_apertures),
        ("yDiff", a.y_diff),
        ("totalMLC", a.total_mlc as f64),
        ("activeMLC", a.active_mlc as f64),
        ("lowestActiveMLC", a.lowest_active_mlc as f64),
        ("highestActiveMLC", a.highest_active_mlc as f64),
        ("perimeter", a.perimeter),
        ("perimeterNoMLCSize", a.perimeter_no_mlc_size),
        ("area", a.area),
        ("LSV", a.lsv),
        ("nAperturesG0", a.n_apertures_open as f64),
    ]
    .into_iter()
    .map(|(k, x)| (k.to_owned(), x))
    .collect();

    v.extend(
        thresholds
            .iter()
            .zip(a.n_apertures_leq)
            .map(|(t, n)| (format!("nAperturesLeq{t}"), n as f64)),
    );
    v.extend([
        ("MU".to_owned(), cp.delta_mu),
        ("MUrel".to_owned(), cp.mu_rel),
        ("MUcumrel".to_owned(), cp.mu_cum_rel),
        ("AAV".to_owned(), cp.aav),
    ]);
    v
}
