//! 复杂度计算流程编排.
//!
//! 每个射束的计算彼此独立, 只有最后的计划级归约需要汇合所有射束.
//! 打开 `rayon` feature 后, 射束级计算会并行进行 (结果顺序与射束顺序一致).

use crate::config::MetricConfig;
use crate::library::{LibraryMetric, LibraryReading, MetricLibrary};
use crate::metrics::{aperture, beam, plan, BeamMetrics, ControlPointStats, PlanMetrics};
use crate::plan::{Beam, Plan};
use crate::{CalcError, CalcResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
    }
}

/// 一个计划的完整计算结果.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlanComplexity {
    /// 计划标识.
    pub id: String,
    /// 各射束指标, 顺序与计划中的射束一致.
    pub beams: Vec<BeamMetrics>,
    /// 计划级指标.
    pub plan: PlanMetrics,
}

impl PlanComplexity {
    /// 按名字查找射束指标.
    pub fn beam(&self, name: &str) -> Option<&BeamMetrics> {
        self.beams.iter().find(|b| b.name == name)
    }

    /// 所有射束的控制点统计.
    #[inline]
    pub fn control_point_stats(&self) -> Option<ControlPointStats> {
        ControlPointStats::collect(&self.beams)
    }
}

/// 复杂度计算引擎.
#[derive(Copy, Clone, Debug, Default)]
pub struct ComplexityEngine {
    config: MetricConfig,
}

impl ComplexityEngine {
    /// 以 `config` 初始化.
    #[inline]
    pub fn new(config: MetricConfig) -> Self {
        Self { config }
    }

    /// 计算参数.
    #[inline]
    pub fn config(&self) -> &MetricConfig {
        &self.config
    }

    /// 计算单个射束.
    ///
    /// 缺少准直器数据的控制点被跳过 (记为 `None`); 几何错误对整个射束是致命的,
    /// 返回的错误带有射束名和控制点索引.
    pub fn analyze_beam(&self, beam: &Beam) -> CalcResult<BeamMetrics> {
        beam.check()?;
        let apertures = beam
            .control_points()
            .iter()
            .enumerate()
            .map(|(index, cp)| match cp.collimator() {
                Ok(c) => aperture::analyze(c.jaw, &c.banks, &self.config)
                    .map(Some)
                    .map_err(|source| CalcError::Geometry {
                        beam: beam.name().to_owned(),
                        control_point: index,
                        source,
                    }),
                Err(e) => {
                    log::warn!("beam `{}`, control point {index}: {e}, skipped", beam.name());
                    Ok(None)
                }
            })
            .collect::<CalcResult<Vec<_>>>()?;
        beam::aggregate(beam, apertures, &self.config)
    }

    /// 计算整个计划.
    pub fn compute(&self, plan: &Plan) -> CalcResult<PlanComplexity> {
        plan.check()?;
        log::debug!("plan `{}`: {} beams", plan.id(), plan.beams().len());

        let beams = self.analyze_beams(plan.beams())?;
        let metrics = plan::aggregate(&beams)?;
        Ok(PlanComplexity {
            id: plan.id().to_owned(),
            beams,
            plan: metrics,
        })
    }

    #[cfg(feature = "rayon")]
    fn analyze_beams(&self, beams: &[Beam]) -> CalcResult<Vec<BeamMetrics>> {
        beams.par_iter().map(|b| self.analyze_beam(b)).collect()
    }

    #[cfg(not(feature = "rayon"))]
    fn analyze_beams(&self, beams: &[Beam]) -> CalcResult<Vec<BeamMetrics>> {
        beams.iter().map(|b| self.analyze_beam(b)).collect()
    }

    /// 通过外部指标库计算 `metrics` 中的每个计划级指标.
    ///
    /// 指标库无法给出结果的指标不出现在返回值中.
    pub fn library_metrics<L: MetricLibrary + ?Sized>(
        &self,
        library: &L,
        plan: &Plan,
        metrics: &[LibraryMetric],
    ) -> Vec<LibraryReading> {
        metrics
            .iter()
            .filter_map(|&metric| {
                let value = library.for_plan(metric, plan);
                if value.is_none() {
                    log::warn!("plan `{}`: library metric {metric:?} unavailable", plan.id());
                }
                Some(LibraryReading {
                    metric,
                    value: value?,
                    unit: metric.unit(),
                })
            })
            .collect()
    }
}

#[cfg(feature = "serde")]
mod json {
    use super::PlanComplexity;
    use crate::consts::PLAN_KEY;
    use crate::metrics::stats::fields;
    use crate::metrics::{BeamMetrics, ControlPointMetrics, PlanMetrics};
    use serde_json::{json, Map, Value};

    impl PlanComplexity {
        /// 输出嵌套映射 `{射束名 -> {"Sequence": [...], 标量...}, "plan" -> {...}}`.
        ///
        /// 射束顺序与计划一致; 缺失的控制点记为 `null`.
        pub fn to_json(&self) -> Value {
            let mut root = Map::new();
            for b in &self.beams {
                root.insert(b.name.clone(), beam_value(b));
            }
            root.insert(PLAN_KEY.to_owned(), plan_value(&self.plan));
            Value::Object(root)
        }
    }

    fn control_point_value(cp: &ControlPointMetrics, thresholds: [f64; 4]) -> Value {
        let mut m = Map::new();
        m.insert("index".to_owned(), json!(cp.index));
        for (k, v) in fields(cp, thresholds) {
            m.insert(k, json!(v));
        }
        Value::Object(m)
    }

    fn beam_value(b: &BeamMetrics) -> Value {
        let sequence: Vec<Value> = b
            .sequence
            .iter()
            .map(|cp| match cp {
                Some(cp) => control_point_value(cp, b.thresholds),
                None => Value::Null,
            })
            .collect();

        let mut m = Map::new();
        m.insert("Sequence".to_owned(), Value::Array(sequence));
        m.insert("MUbeam".to_owned(), json!(b.mu));
        m.insert("MUfinalweight".to_owned(), json!(b.final_weight));
        m.insert("M".to_owned(), json!(b.m));
        m.insert("MCS".to_owned(), json!(b.mcs));
        m.insert("MCSV".to_owned(), json!(b.mcsv));
        m.insert("MFC".to_owned(), json!(b.mfc));
        m.insert("BI".to_owned(), json!(b.bi));
        m.insert("avgApertureLessThan1cm".to_owned(), json!(b.avg_aperture_lt_1cm));
        m.insert("yDiffLessThan1cm".to_owned(), json!(b.y_diff_lt_1cm));
        for (t, sas) in b.thresholds.iter().zip(b.sas) {
            m.insert(format!("SAS{t}"), json!(sas));
        }
        Value::Object(m)
    }

    fn plan_value(p: &PlanMetrics) -> Value {
        json!({
            "MUplan": p.mu,
            "Mplan": p.m,
            "MCSplan": p.mcs,
            "MCSVplan": p.mcsv,
            "MFCplan": p.mfc,
            "PI": p.pi,
            "nCP": p.n_cp,
            "avgApertureLessThan1cm": p.avg_aperture_lt_1cm,
            "yDiffLessThan1cm": p.y_diff_lt_1cm,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeometryError;
    use crate::plan::{ControlPoint, JawWindow};
    use crate::testing::{f64_eq, rect_beam, uniform_banks};

    fn init_logger() {
        let _ = simple_logger::SimpleLogger::new()
            .with_level(log::LevelFilter::Debug)
            .init();
    }

    fn two_beam_plan() -> Plan {
        Plan::new(
            "P1",
            vec![
                rect_beam("Beam1", 50.0, 1.0, &[0.0, 0.4, 1.0]),
                rect_beam("Beam2", 150.0, 1.0, &[0.0, 1.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_compute_plan() {
        init_logger();
        let engine = ComplexityEngine::default();
        let res = engine.compute(&two_beam_plan()).unwrap();

        assert_eq!(res.id, "P1");
        assert_eq!(res.beams.len(), 2);
        assert_eq!(res.beams[0].name, "Beam1");
        assert_eq!(res.beams[1].name, "Beam2");
        assert_eq!(res.plan.mu, 200.0);
        assert_eq!(res.plan.n_cp, 5);

        // 两个射束形状一致, M 相同.
        let m = res.beam("Beam1").unwrap().m;
        assert!(f64_eq(res.beam("Beam2").unwrap().m, m));
        assert!(f64_eq(res.plan.m, m));
    }

    #[test]
    fn test_compute_is_idempotent() {
        let engine = ComplexityEngine::default();
        let plan = two_beam_plan();
        let a = engine.compute(&plan).unwrap();
        let b = engine.compute(&plan).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_geometry_error_carries_context() {
        init_logger();
        let jaw = JawWindow::new(-50.0, 50.0);
        let bad = Beam::new(
            "Beam2",
            100.0,
            1.0,
            vec![
                ControlPoint::new(0.0, jaw, uniform_banks(40, -20.0, 20.0)),
                ControlPoint::new(0.5, jaw, uniform_banks(40, 0.0, 0.0)),
                ControlPoint::new(1.0, jaw, uniform_banks(40, -20.0, 20.0)),
            ],
        )
        .unwrap();
        let good = rect_beam("Beam1", 100.0, 1.0, &[0.0, 1.0]);
        let plan = Plan::new("P", vec![good, bad]).unwrap();

        let err = ComplexityEngine::default().compute(&plan).unwrap_err();
        assert_eq!(
            err,
            CalcError::Geometry {
                beam: "Beam2".into(),
                control_point: 1,
                source: GeometryError::ZeroSpan,
            }
        );
        assert_eq!(err.beam(), Some("Beam2"));
    }

    #[test]
    fn test_missing_field_is_tolerated() {
        init_logger();
        let jaw = JawWindow::new(-50.0, 50.0);
        let beam = Beam::new(
            "Beam1",
            100.0,
            1.0,
            vec![
                ControlPoint::new(0.0, jaw, uniform_banks(40, -20.0, 20.0)),
                ControlPoint::without_collimator(0.5),
                ControlPoint::new(1.0, jaw, uniform_banks(40, -20.0, 20.0)),
            ],
        )
        .unwrap();
        let res = ComplexityEngine::default()
            .compute(&Plan::new("P", vec![beam]).unwrap())
            .unwrap();
        assert!(res.beams[0].sequence[1].is_none());
        assert_eq!(res.plan.n_cp, 2);
    }

    #[test]
    fn test_leaf_pitch_config() {
        let engine = ComplexityEngine::new(MetricConfig::with_leaf_pitch(2.5).unwrap());
        let jaw = JawWindow::new(-50.0, 50.0);
        let beam = Beam::new(
            "B",
            100.0,
            1.0,
            vec![
                ControlPoint::new(0.0, jaw, uniform_banks(80, -20.0, 20.0)),
                ControlPoint::new(1.0, jaw, uniform_banks(80, -20.0, 20.0)),
            ],
        )
        .unwrap();
        let bm = engine.analyze_beam(&beam).unwrap();
        let cp = bm.sequence[0].as_ref().unwrap();
        assert_eq!(cp.aperture.active_mlc, 40);
        assert!(f64_eq(cp.aperture.area, 4000.0));
    }

    struct FixedLibrary;

    impl MetricLibrary for FixedLibrary {
        fn for_plan(&self, metric: LibraryMetric, _plan: &Plan) -> Option<f64> {
            match metric {
                LibraryMetric::PyComplexity => Some(0.25),
                LibraryMetric::AreaEstimator => Some(1200.0),
                _ => None,
            }
        }
    }

    #[test]
    fn test_library_metrics() {
        let engine = ComplexityEngine::default();
        let readings = engine.library_metrics(
            &FixedLibrary,
            &two_beam_plan(),
            &crate::library::DEFAULT_LIBRARY_METRICS,
        );
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].metric, LibraryMetric::PyComplexity);
        assert_eq!(readings[0].unit, "CI [mm^-1]");
        assert_eq!(readings[1].metric, LibraryMetric::AreaEstimator);
        assert!(f64_eq(readings[1].value, 1200.0));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_to_json_layout() {
        let res = ComplexityEngine::default().compute(&two_beam_plan()).unwrap();
        let v = res.to_json();
        let obj = v.as_object().unwrap();

        let keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        assert_eq!(keys, ["Beam1", "Beam2", "plan"]);

        let seq = obj["Beam1"]["Sequence"].as_array().unwrap();
        assert_eq!(seq.len(), 3);
        assert_eq!(seq[0]["index"], 0);
        assert!(f64_eq(seq[0]["area"].as_f64().unwrap(), 4000.0));
        assert!(seq[0].get("nAperturesLeq2").is_some());
        assert!(obj["Beam1"].get("SAS20").is_some());
        assert_eq!(obj["plan"]["MUplan"], 200.0);
        assert_eq!(obj["plan"]["nCP"], 5);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialized_plan_beam_names_are_checked() {
        let engine = ComplexityEngine::default();
        let renamed = |names: [&str; 2]| -> Plan {
            let mut v = serde_json::to_value(two_beam_plan()).unwrap();
            for (beam, name) in v["beams"].as_array_mut().unwrap().iter_mut().zip(names) {
                beam["name"] = name.into();
            }
            serde_json::from_value(v).unwrap()
        };

        let err = engine.compute(&renamed(["A", "A"])).unwrap_err();
        assert_eq!(err, CalcError::DuplicateBeam { beam: "A".into() });

        let err = engine.compute(&renamed(["A", "plan"])).unwrap_err();
        assert_eq!(
            err,
            CalcError::ReservedBeamName {
                beam: "plan".into()
            }
        );

        let res = engine.compute(&renamed(["A", "B"])).unwrap();
        let v = res.to_json();
        assert_eq!(v.as_object().unwrap().len(), 3);
        assert_eq!(v["B"]["MUbeam"], 150.0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_plan_json_round_trip() {
        let plan = two_beam_plan();
        let text = serde_json::to_string(&plan).unwrap();
        let back: Plan = serde_json::from_str(&text).unwrap();
        assert_eq!(plan, back);
    }
}
