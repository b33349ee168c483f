//! 程序运行函数.

use crate::result::{Outcome, ReportResult};
use rtp_berry::{ComplexityEngine, Plan};
use std::path::PathBuf;
use std::thread;
use utils::loader;

/// 实际运行.
pub fn run() -> ReportResult {
    let plan_dir = loader::plan_dir_from_env_or_home().expect("Cannot locate home directory");
    assert!(plan_dir.is_dir(), "{} is not a directory", plan_dir.display());

    let engine = ComplexityEngine::new(utils::config_from_env());
    log::info!(
        "plan directory: {}, leaf pitch: {}",
        plan_dir.display(),
        engine.config().leaf_pitch()
    );

    let mut plans: Vec<(PathBuf, Plan)> = Vec::new();
    let mut outcomes: Vec<(PathBuf, Outcome)> = Vec::new();
    for (path, plan) in loader::plan_loader(&plan_dir).expect("Reading plan directory error") {
        match plan {
            Ok(p) => plans.push((path, p)),
            Err(e) => {
                log::warn!("{}: {e}, skipped", path.display());
                outcomes.push((path, Outcome::Unreadable(e.to_string())));
            }
        }
    }

    println!("Computing {} plans...", plans.len());
    let chunk = plans.len().div_ceil(utils::cpus()).max(1);
    let computed = thread::scope(|s| {
        let handles: Vec<_> = plans
            .chunks(chunk)
            .map(|part| {
                s.spawn(move || {
                    part.iter()
                        .map(|(path, plan)| (path.clone(), Outcome::from(engine.compute(plan))))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|th| th.join().expect("Thread joining error"))
            .collect::<Vec<_>>()
    });
    outcomes.extend(computed);
    outcomes.sort_by(|a, b| a.0.cmp(&b.0));

    ReportResult::from_iter(outcomes)
}
