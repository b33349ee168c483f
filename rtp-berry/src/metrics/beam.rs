//! 射束级指标: 增量 MU 分配及控制点序列上的归约.

use super::aperture::ApertureMetrics;
use crate::config::MetricConfig;
use crate::consts::SMALL_FIELD_LIMIT;
use crate::error::GeometryError;
use crate::plan::Beam;
use crate::{CalcError, CalcResult};
use ndarray::{Array2, ArrayView1, Axis};
use std::f64::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 带有跳数分配和 AAV 标注的控制点指标.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ControlPointMetrics {
    /// 控制点索引 (从 0 开始).
    pub index: usize,
    /// 本控制点到下一控制点之间的增量跳数. 最后一个控制点为 0.
    pub delta_mu: f64,
    /// `delta_mu / MU`.
    pub mu_rel: f64,
    /// 累积权重 + `mu_rel`.
    pub mu_cum_rel: f64,
    /// 激活孔径值 (active aperture value).
    pub aav: f64,
    /// 孔径几何.
    pub aperture: ApertureMetrics,
}

/// 射束级指标.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BeamMetrics {
    /// 射束名.
    pub name: String,
    /// 射束总跳数.
    pub mu: f64,
    /// FinalCumulativeMetersetWeight.
    pub final_weight: f64,
    /// 计算时使用的孔径大小门限.
    pub thresholds: [f64; 4],
    /// 控制点序列. 缺少准直器数据的控制点记为 `None`.
    pub sequence: Vec<Option<ControlPointMetrics>>,
    /// 调制指数 M.
    pub m: f64,
    /// 调制复杂度评分 MCS.
    pub mcs: f64,
    /// 按相邻控制点梯形配对的 MCS (MCSV).
    pub mcsv: f64,
    /// 平均照射野面积 MFC.
    pub mfc: f64,
    /// 射束不规则度 BI.
    pub bi: f64,
    /// 平均孔径不超过 1 cm 的控制点个数.
    pub avg_aperture_lt_1cm: u32,
    /// 铅门窗口高度不超过 1 cm 的控制点个数.
    pub y_diff_lt_1cm: u32,
    /// 小孔径评分 SAS, 与 `thresholds` 一一对应.
    pub sas: [f64; 4],
}

impl BeamMetrics {
    /// 所有存在的控制点指标.
    #[inline]
    pub fn present(&self) -> impl Iterator<Item = &ControlPointMetrics> + '_ {
        self.sequence.iter().flatten()
    }

    /// 存在的控制点个数.
    #[inline]
    pub fn n_control_points(&self) -> usize {
        self.present().count()
    }
}

/// 汇总一个射束的控制点孔径指标.
///
/// `apertures` 与 `beam` 的控制点一一对应, `None` 表示该控制点缺少准直器数据.
///
/// # 边界情况
///
/// - 面积为 0 的控制点不参与 M 和 BI 的累加;
/// - 没有张开叶片对的控制点不参与 SAS 的累加;
/// - 缺失的控制点不参与任何累加; MCSV 只对相邻且都存在的控制点配对.
///
/// # 错误
///
/// 除射束不变量和 AAV 归一化错误之外, `apertures.len()` 与控制点个数不一致时返回
/// `Err(CalcError::InvalidBeam)`.
pub fn aggregate(
    beam: &Beam,
    apertures: Vec<Option<ApertureMetrics>>,
    config: &MetricConfig,
) -> CalcResult<BeamMetrics> {
    beam.check()?;
    let cps = beam.control_points();
    if cps.len() != apertures.len() {
        return Err(CalcError::InvalidBeam {
            beam: beam.name().to_owned(),
            reason: "aperture records do not match the control points",
        });
    }

    let norm = aav_normalization(beam)?;
    let (mu, final_weight) = (beam.mu(), beam.final_weight());

    let sequence: Vec<Option<ControlPointMetrics>> = apertures
        .into_iter()
        .enumerate()
        .map(|(index, aperture)| {
            let aperture = aperture?;
            let weight = cps[index].cumulative_weight();
            let delta_mu = match cps.get(index + 1) {
                Some(next) => (next.cumulative_weight() - weight) * mu / final_weight,
                None => 0.0,
            };
            let mu_rel = delta_mu / mu;
            Some(ControlPointMetrics {
                index,
                delta_mu,
                mu_rel,
                mu_cum_rel: weight + mu_rel,
                aav: aperture.sum_all_apertures / norm,
                aperture,
            })
        })
        .collect();

    let present = || sequence.iter().flatten();

    let m = present()
        .map(|cp| cp.delta_mu * perimeter_over_area(&cp.aperture))
        .sum::<f64>()
        / mu;
    let mcs: f64 = present().map(|cp| cp.aav * cp.aperture.lsv * cp.mu_rel).sum();
    let mcsv: f64 = sequence
        .windows(2)
        .filter_map(|w| Some((w[0].as_ref()?, w[1].as_ref()?)))
        .map(|(a, b)| {
            (a.aav + b.aav) / 2.0 * (a.aperture.lsv + b.aperture.lsv) / 2.0 * a.mu_rel
        })
        .sum();
    let mfc: f64 = present().map(|cp| cp.aperture.area * cp.mu_rel).sum();
    let bi: f64 = present()
        .map(|cp| {
            let a = &cp.aperture;
            if a.area > 0.0 {
                cp.mu_rel * a.perimeter.powi(2) / (4.0 * PI * a.area)
            } else {
                0.0
            }
        })
        .sum();
    let avg_aperture_lt_1cm = present()
        .filter(|cp| cp.aperture.avg_aperture <= SMALL_FIELD_LIMIT)
        .count() as u32;
    let y_diff_lt_1cm = present()
        .filter(|cp| cp.aperture.y_diff <= SMALL_FIELD_LIMIT)
        .count() as u32;
    let sas = [0, 1, 2, 3].map(|k| {
        present()
            .filter(|cp| cp.aperture.n_apertures_open > 0)
            .map(|cp| {
                let a = &cp.aperture;
                a.n_apertures_leq[k] as f64 / a.n_apertures_open as f64 * cp.mu_rel
            })
            .sum::<f64>()
    });

    log::debug!(
        "beam `{}`: {} control points, M = {m:.6}, MCS = {mcs:.6}",
        beam.name(),
        sequence.len()
    );

    Ok(BeamMetrics {
        name: beam.name().to_owned(),
        mu,
        final_weight,
        thresholds: config.thresholds(),
        sequence,
        m,
        mcs,
        mcsv,
        mfc,
        bi,
        avg_aperture_lt_1cm,
        y_diff_lt_1cm,
        sas,
    })
}

/// `perimeter / area`. 面积为 0 时返回 0.
#[inline]
fn perimeter_over_area(a: &ApertureMetrics) -> f64 {
    if a.area > 0.0 {
        a.perimeter / a.area
    } else {
        0.0
    }
}

/// AAV 归一化因子: `sum_leaf |max_cp(right) - min_cp(left)|`.
///
/// 只使用存在准直器数据的控制点. 所有控制点都缺失时返回 1 (此时没有需要标注的记录).
fn aav_normalization(beam: &Beam) -> CalcResult<f64> {
    let banks: Vec<(usize, _)> = beam
        .control_points()
        .iter()
        .enumerate()
        .filter_map(|(i, cp)| Some((i, &cp.collimator().ok()?.banks)))
        .collect();
    let Some(leaves) = banks.first().map(|(_, b)| b.len()) else {
        return Ok(1.0);
    };

    let mut left = Array2::<f64>::zeros((banks.len(), leaves));
    let mut right = Array2::<f64>::zeros((banks.len(), leaves));
    for (row, &(index, b)) in banks.iter().enumerate() {
        let found = b.left().len().max(b.right().len());
        if b.left().len() != leaves || b.right().len() != leaves {
            return Err(CalcError::Geometry {
                beam: beam.name().to_owned(),
                control_point: index,
                source: GeometryError::InconsistentLeafCount {
                    expected: leaves,
                    found,
                },
            });
        }
        left.row_mut(row).assign(&ArrayView1::from(b.left()));
        right.row_mut(row).assign(&ArrayView1::from(b.right()));
    }

    let max_right = right.fold_axis(Axis(0), f64::NEG_INFINITY, |&a, &b| a.max(b));
    let min_left = left.fold_axis(Axis(0), f64::INFINITY, |&a, &b| a.min(b));
    let norm = (&max_right - &min_left).mapv(f64::abs).sum();

    if norm == 0.0 {
        return Err(CalcError::ZeroNormalization {
            beam: beam.name().to_owned(),
        });
    }
    Ok(norm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::aperture::analyze;
    use crate::plan::{ControlPoint, JawWindow, LeafBanks};
    use crate::testing::{f64_eq, rect_beam, uniform_banks};

    fn run(beam: &Beam) -> CalcResult<BeamMetrics> {
        let cfg = MetricConfig::standard();
        let apertures = beam
            .control_points()
            .iter()
            .map(|cp| {
                cp.collimator()
                    .ok()
                    .map(|c| analyze(c.jaw, &c.banks, &cfg).unwrap())
            })
            .collect();
        aggregate(beam, apertures, &cfg)
    }

    #[test]
    fn test_two_point_rectangle() {
        let beam = rect_beam("B1", 100.0, 1.0, &[0.0, 1.0]);
        let bm = run(&beam).unwrap();

        let cp0 = bm.sequence[0].as_ref().unwrap();
        let cp1 = bm.sequence[1].as_ref().unwrap();
        assert!(f64_eq(cp0.delta_mu, 100.0));
        assert!(f64_eq(cp0.mu_rel, 1.0));
        assert!(f64_eq(cp0.mu_cum_rel, 1.0));
        assert!(f64_eq(cp1.delta_mu, 0.0));
        assert!(f64_eq(cp1.mu_rel, 0.0));
        assert!(f64_eq(cp1.mu_cum_rel, 1.0));
        assert!(f64_eq(cp0.aperture.area, 4000.0));
        assert!(f64_eq(cp1.aperture.area, 4000.0));

        // 所有叶片对在两个控制点都是 [-20, 20].
        assert!(f64_eq(cp0.aav, 1.0));
        assert!(f64_eq(cp1.aav, 1.0));

        let lsv = cp0.aperture.lsv;
        assert!(f64_eq(bm.mcsv, (1.0 + 1.0) / 2.0 * (lsv + lsv) / 2.0 * 1.0));
        assert!(f64_eq(bm.mcs, lsv));
        assert!(f64_eq(bm.m, 100.0 * 280.0 / 4000.0 / 100.0));
        assert!(f64_eq(bm.mfc, 4000.0));
        assert!(f64_eq(bm.bi, 280.0 * 280.0 / (4.0 * PI * 4000.0)));
        assert_eq!(bm.avg_aperture_lt_1cm, 0);
        assert_eq!(bm.y_diff_lt_1cm, 0);
        assert_eq!(bm.sas, [0.0; 4]);
        assert_eq!(bm.n_control_points(), 2);
    }

    #[test]
    fn test_mu_conservation() {
        let beam = rect_beam("B", 237.5, 1.0, &[0.0, 0.13, 0.4, 0.4, 0.81, 1.0]);
        let bm = run(&beam).unwrap();
        let total: f64 = bm.present().map(|cp| cp.mu_rel).sum();
        assert!(f64_eq(total, 1.0));
        let total_mu: f64 = bm.present().map(|cp| cp.delta_mu).sum();
        assert!(f64_eq(total_mu, 237.5));
    }

    #[test]
    fn test_final_weight_scaling() {
        let beam = rect_beam("B", 50.0, 2.0, &[0.0, 0.5, 2.0]);
        let bm = run(&beam).unwrap();
        let deltas: Vec<f64> = bm.present().map(|cp| cp.delta_mu).collect();
        assert!(f64_eq(deltas[0], 12.5));
        assert!(f64_eq(deltas[1], 37.5));
        assert!(f64_eq(deltas[2], 0.0));
    }

    #[test]
    fn test_missing_control_point_is_skipped() {
        let jaw = JawWindow::new(-50.0, 50.0);
        let beam = Beam::new(
            "B",
            100.0,
            1.0,
            vec![
                ControlPoint::new(0.0, jaw, uniform_banks(40, -20.0, 20.0)),
                ControlPoint::without_collimator(0.5),
                ControlPoint::new(1.0, jaw, uniform_banks(40, -20.0, 20.0)),
            ],
        )
        .unwrap();
        let bm = run(&beam).unwrap();

        assert!(bm.sequence[1].is_none());
        assert_eq!(bm.n_control_points(), 2);
        // 第 0 个控制点仍按下一个 (缺失的) 控制点的权重分配跳数.
        assert!(f64_eq(bm.sequence[0].as_ref().unwrap().delta_mu, 50.0));
        // 缺失位置打断了 MCSV 的配对.
        assert!(f64_eq(bm.mcsv, 0.0));
        assert_eq!(bm.sequence[2].as_ref().unwrap().index, 2);
    }

    #[test]
    fn test_closed_control_point_contributes_zero() {
        // 激活叶片全部闭合, 但闭合位置不同, 因此跨度非 0.
        let closed = LeafBanks::new(
            (0..40).map(|i| i as f64).collect(),
            (0..40).map(|i| i as f64).collect(),
        );
        let open = uniform_banks(40, -2.0, 2.0);
        let jaw = JawWindow::new(-10.0, 10.0);
        let beam = Beam::new(
            "B",
            100.0,
            1.0,
            vec![
                ControlPoint::new(0.0, jaw, closed),
                ControlPoint::new(0.5, jaw, open.clone()),
                ControlPoint::new(1.0, jaw, open),
            ],
        )
        .unwrap();
        let bm = run(&beam).unwrap();

        let cp0 = bm.sequence[0].as_ref().unwrap();
        assert_eq!(cp0.aperture.n_apertures_open, 0);
        assert!(f64_eq(cp0.aperture.area, 0.0));

        // 只有第 1 个控制点 (mu_rel = 0.5) 参与: 4 对激活叶片, 孔径均为 4.
        assert!(f64_eq(bm.sas[0], 0.0));
        assert!(f64_eq(bm.sas[1], 0.5));
        assert!(f64_eq(bm.sas[2], 0.5));
        assert!(f64_eq(bm.sas[3], 0.5));
        let cp1 = bm.sequence[1].as_ref().unwrap();
        assert!(f64_eq(
            bm.m,
            50.0 * cp1.aperture.perimeter / cp1.aperture.area / 100.0
        ));
        assert!(bm.m.is_finite());
        assert!(bm.bi.is_finite());
        // 三个控制点平均孔径都不超过 1 cm, 窗口高度 20 mm.
        assert_eq!(bm.avg_aperture_lt_1cm, 3);
        assert_eq!(bm.y_diff_lt_1cm, 0);
    }

    #[test]
    fn test_aav_normalization_uses_beam_extremes() {
        let jaw = JawWindow::new(-10.0, 10.0);
        let beam = Beam::new(
            "B",
            100.0,
            1.0,
            vec![
                ControlPoint::new(0.0, jaw, uniform_banks(40, -10.0, 0.0)),
                ControlPoint::new(1.0, jaw, uniform_banks(40, 0.0, 10.0)),
            ],
        )
        .unwrap();
        let bm = run(&beam).unwrap();
        // 每对叶片 |10 - (-10)| = 20, 共 40 对.
        for cp in bm.present() {
            assert!(f64_eq(cp.aav, 400.0 / 800.0));
        }
    }

    #[test]
    fn test_inconsistent_leaf_count() {
        let jaw = JawWindow::new(-10.0, 10.0);
        let beam = Beam::new(
            "B",
            100.0,
            1.0,
            vec![
                ControlPoint::new(0.0, jaw, uniform_banks(40, -5.0, 5.0)),
                ControlPoint::new(1.0, jaw, uniform_banks(60, -5.0, 5.0)),
            ],
        )
        .unwrap();
        let err = run(&beam).unwrap_err();
        assert_eq!(
            err,
            CalcError::Geometry {
                beam: "B".into(),
                control_point: 1,
                source: GeometryError::InconsistentLeafCount {
                    expected: 40,
                    found: 60
                }
            }
        );
    }

    #[test]
    fn test_aperture_count_mismatch() {
        let beam = rect_beam("B", 100.0, 1.0, &[0.0, 0.5, 1.0]);
        let cfg = MetricConfig::standard();
        let err = aggregate(&beam, vec![None, None], &cfg).unwrap_err();
        assert!(matches!(err, CalcError::InvalidBeam { .. }));
        assert_eq!(err.beam(), Some("B"));
    }
}
