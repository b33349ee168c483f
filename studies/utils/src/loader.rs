//! 计划文件加载器.
//!
//! 计划以 JSON 格式存放在同一目录下, 每个文件一个计划, 按文件名顺序加载.

use rtp_berry::Plan;
use std::path::{Path, PathBuf};
use std::{env, fs, io};
use thiserror::Error;

/// 加载单个计划时可能出现的错误.
#[derive(Debug, Error)]
pub enum LoadError {
    /// 文件读取失败.
    #[error("cannot read plan file: {0}")]
    Io(#[from] io::Error),
    /// JSON 内容不是合法的计划.
    #[error("malformed plan: {0}")]
    Json(#[from] serde_json::Error),
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    ans.extend(it);
    Some(ans)
}

/// 获取计划目录.
///
/// 1. 若环境变量 `$RTP_PLAN_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/plans`.
pub fn plan_dir_from_env_or_home() -> Option<PathBuf> {
    match env::var("RTP_PLAN_DIR") {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => home_dataset_dir_with(["plans"]),
    }
}

/// 创建 `dir` 下所有 `*.json` 文件的计划加载器.
pub fn plan_loader<P: AsRef<Path>>(dir: P) -> io::Result<PlanLoader> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "json"))
        .collect();
    files.sort();
    files.reverse();
    Ok(PlanLoader { files_rev: files })
}

/// 计划加载器. 每次迭代读取并解析一个文件.
pub struct PlanLoader {
    files_rev: Vec<PathBuf>,
}

impl Iterator for PlanLoader {
    type Item = (PathBuf, Result<Plan, LoadError>);

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.files_rev.pop()?;
        let plan = load_plan(&path);
        Some((path, plan))
    }
}

impl ExactSizeIterator for PlanLoader {
    #[inline]
    fn len(&self) -> usize {
        self.files_rev.len()
    }
}

/// 读取并解析单个计划文件.
pub fn load_plan<P: AsRef<Path>>(path: P) -> Result<Plan, LoadError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}
