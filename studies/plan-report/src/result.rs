//! 计算结果.

use rtp_berry::metrics::BeamMetrics;
use rtp_berry::{CalcError, CalcResult, PlanComplexity};
use std::io::{self, Write};
use std::path::PathBuf;

/// 单个计划文件的处理结果.
pub enum Outcome {
    /// 计算成功.
    Computed(Box<PlanComplexity>),
    /// 文件无法加载.
    Unreadable(String),
    /// 计算失败.
    Failed(CalcError),
}

impl From<CalcResult<PlanComplexity>> for Outcome {
    fn from(r: CalcResult<PlanComplexity>) -> Self {
        match r {
            Ok(c) => Outcome::Computed(Box::new(c)),
            Err(e) => Outcome::Failed(e),
        }
    }
}

const S4: &str = "    ";

fn describe_beam_into<W: Write>(b: &BeamMetrics, w: &mut W) -> io::Result<()> {
    writeln!(
        w,
        "{S4}Beam `{}`: {} control points, MU {:.2}",
        b.name,
        b.n_control_points(),
        b.mu
    )?;
    writeln!(
        w,
        "{S4}{S4}M {:.6}, MCS {:.6}, MCSV {:.6}, MFC {:.6}, BI {:.6}",
        b.m, b.mcs, b.mcsv, b.mfc, b.bi
    )?;
    let sas: Vec<String> = b
        .thresholds
        .iter()
        .zip(b.sas)
        .map(|(t, v)| format!("SAS{t} {v:.6}"))
        .collect();
    writeln!(w, "{S4}{S4}{}", sas.join(", "))?;
    writeln!(
        w,
        "{S4}{S4}Small apertures: {}, small jaw windows: {}",
        b.avg_aperture_lt_1cm, b.y_diff_lt_1cm
    )
}

/// 将 `c` 的结果写进 `w` 中.
fn describe_into<W: Write>(c: &PlanComplexity, w: &mut W) -> io::Result<()> {
    writeln!(w, "Plan `{}`:", c.id)?;
    for b in &c.beams {
        describe_beam_into(b, w)?;
    }

    let p = &c.plan;
    writeln!(w, "{S4}Plan MU {:.2}, control points {}", p.mu, p.n_cp)?;
    writeln!(
        w,
        "{S4}M {:.6}, MCS {:.6}, MCSV {:.6}, MFC {:.6}, PI {:.6}",
        p.m, p.mcs, p.mcsv, p.mfc, p.pi
    )?;
    writeln!(
        w,
        "{S4}Small apertures: {}, small jaw windows: {}",
        p.avg_aperture_lt_1cm, p.y_diff_lt_1cm
    )?;

    match c.control_point_stats() {
        Some(stats) => {
            writeln!(w, "{S4}Control point statistics (avg / std / min / med / max):")?;
            for (name, s) in stats.iter() {
                writeln!(
                    w,
                    "{S4}{S4}{name}: {:.4} / {:.4} / {:.4} / {:.4} / {:.4}",
                    s.avg, s.std, s.min, s.med, s.max
                )?;
            }
        }
        None => writeln!(w, "{S4}No control point records")?,
    }
    Ok(())
}

/// 写出 `c` 的报告及其后的分隔线.
fn render_into<W: Write>(c: &PlanComplexity, w: &mut W) -> io::Result<()> {
    describe_into(c, w)?;
    utils::sep_to(w)
}

/// 批量计算最终结果.
pub struct ReportResult {
    data: Vec<(PathBuf, Outcome)>,
}

impl ReportResult {
    pub fn from_iter<I: IntoIterator<Item = (PathBuf, Outcome)>>(it: I) -> Self {
        Self {
            data: it.into_iter().collect(),
        }
    }

    /// 分析运行结果.
    pub fn analyze(&self) {
        utils::sep();
        let mut buf = Vec::with_capacity(2048);
        let mut failures = Vec::new();

        for (path, outcome) in self.data.iter() {
            match outcome {
                Outcome::Computed(c) => {
                    if let Err(e) = render_into(c, &mut buf) {
                        log::error!("{}: cannot render report: {e}", path.display());
                    }
                    print!("{}", String::from_utf8_lossy(&buf));
                    buf.clear();
                }
                Outcome::Unreadable(e) => failures.push(format!("{}: {e}", path.display())),
                Outcome::Failed(e) => failures.push(format!("{}: {e}", path.display())),
            }
        }

        println!(
            "{} plans computed, {} failed",
            self.data.len() - failures.len(),
            failures.len()
        );
        for f in failures {
            println!("{S4}{f}");
        }
    }
}
