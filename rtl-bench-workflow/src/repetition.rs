use rtl_bench_core::{CoreError, RepetitionIndex, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where the number of repetitions comes from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RepetitionSource {
    /// Exactly this many, `test_0` through `test_{n-1}`.
    Explicit(usize),
    /// Probe `test_0`, `test_1`, ... until one is missing.
    Probe,
}

impl RepetitionSource {
    pub fn resolve(&self, root: &Path) -> Vec<RepetitionIndex> {
        let count = match self {
            RepetitionSource::Explicit(n) => *n,
            RepetitionSource::Probe => probe_repetitions(root),
        };
        (0..count).map(RepetitionIndex).collect()
    }
}

/// Count consecutive `test_<i>` directories under `root`, starting at 0.
pub fn probe_repetitions(root: &Path) -> usize {
    let mut count = 0;
    while root.join(RepetitionIndex(count).dir_name()).is_dir() {
        count += 1;
    }
    count
}

pub fn repetition_dir(root: &Path, index: RepetitionIndex) -> PathBuf {
    root.join(index.dir_name())
}

pub fn trial_dir(root: &Path, index: RepetitionIndex, task_id: &str) -> PathBuf {
    repetition_dir(root, index).join(task_id)
}

/// Task ids staged in the first repetition, sorted. Used when no corpus is
/// given to name the task set.
pub fn discover_task_ids(root: &Path) -> Result<Vec<String>> {
    let first = repetition_dir(root, RepetitionIndex(0));
    let entries = std::fs::read_dir(&first).map_err(|e| CoreError::io(&first, e))?;

    let mut ids = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CoreError::io(&first, e))?;
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            if let Some(name) = entry.file_name().to_str() {
                ids.push(name.to_string());
            }
        }
    }
    ids.sort();

    if ids.is_empty() {
        return Err(CoreError::NotFound(format!(
            "no task directories under {}",
            first.display()
        )));
    }
    Ok(ids)
}
