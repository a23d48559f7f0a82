//! Copies per-task fixtures (testbench, control file) next to each generated
//! candidate so every trial directory can be built independently.

use rtl_bench_core::{CoreError, RepetitionIndex, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::repetition::trial_dir;
use crate::toolchain::ToolchainConfig;

/// Locates the fixture directory for a task.
#[derive(Debug, Clone)]
pub enum DesignIndex {
    /// `<root>/<task_id>`
    Flat(PathBuf),
    /// Explicit task → directory map.
    Listed(HashMap<String, PathBuf>),
}

impl DesignIndex {
    /// Build from a `file_list.json` of the form
    /// `{category: {subcategory: [task_id, ...]}}`, resolving each task to
    /// `<root>/<category>/<subcategory>/<task_id>`.
    pub fn from_file_list(root: impl AsRef<Path>, file_list: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let file_list = file_list.as_ref();
        let content = fs::read_to_string(file_list).map_err(|e| CoreError::io(file_list, e))?;
        let tree: BTreeMap<String, BTreeMap<String, Vec<String>>> = serde_json::from_str(&content)?;

        let mut map = HashMap::new();
        for (category, subcategories) in tree {
            for (subcategory, tasks) in subcategories {
                for task in tasks {
                    let path = root.join(&category).join(&subcategory).join(&task);
                    map.insert(task, path);
                }
            }
        }
        Ok(DesignIndex::Listed(map))
    }

    pub fn locate(&self, task_id: &str) -> Option<PathBuf> {
        let path = match self {
            DesignIndex::Flat(root) => root.join(task_id),
            DesignIndex::Listed(map) => map.get(task_id)?.clone(),
        };
        path.is_dir().then_some(path)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StagingSummary {
    pub staged: usize,
    pub missing_candidate: usize,
    pub missing_fixture: usize,
}

#[derive(Debug, Clone)]
pub struct Stager {
    index: DesignIndex,
    toolchain: ToolchainConfig,
}

impl Stager {
    pub fn new(index: DesignIndex, toolchain: ToolchainConfig) -> Self {
        Self { index, toolchain }
    }

    /// Path of the candidate source inside a trial directory.
    pub fn candidate_path(trial_dir: &Path, task_id: &str) -> PathBuf {
        trial_dir.join(format!("{}.v", task_id))
    }

    /// Stage one trial: copy fixtures that are not already present and point
    /// the control file at the candidate.
    pub fn stage_trial(&self, task_id: &str, trial_dir: &Path) -> Result<()> {
        let fixture = self
            .index
            .locate(task_id)
            .ok_or_else(|| CoreError::NotFound(format!("fixture directory for task '{}'", task_id)))?;

        let candidate = Self::candidate_path(trial_dir, task_id);
        if !candidate.is_file() {
            return Err(CoreError::NotFound(format!("candidate {}", candidate.display())));
        }

        copy_missing(&fixture, trial_dir)?;
        self.render_control_file(trial_dir, &candidate)
    }

    pub fn stage_repetitions(
        &self,
        root: &Path,
        repetitions: &[RepetitionIndex],
        task_ids: &[String],
    ) -> Result<StagingSummary> {
        let mut summary = StagingSummary::default();

        for &repetition in repetitions {
            for task_id in task_ids {
                let dir = trial_dir(root, repetition, task_id);
                match self.stage_trial(task_id, &dir) {
                    Ok(()) => summary.staged += 1,
                    Err(CoreError::NotFound(what)) => {
                        tracing::warn!(repetition = %repetition, task = %task_id, "not staged, {} missing", what);
                        if what.starts_with("candidate") {
                            summary.missing_candidate += 1;
                        } else {
                            summary.missing_fixture += 1;
                        }
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        tracing::info!(
            staged = summary.staged,
            missing_candidate = summary.missing_candidate,
            missing_fixture = summary.missing_fixture,
            "staging finished"
        );
        Ok(summary)
    }

    fn render_control_file(&self, trial_dir: &Path, candidate: &Path) -> Result<()> {
        let control = self.toolchain.control_path(trial_dir);
        if !control.is_file() {
            return Err(CoreError::NotFound(format!("control file {}", control.display())));
        }

        let candidate = fs::canonicalize(candidate).map_err(|e| CoreError::io(candidate, e))?;
        let design = candidate.with_extension("");
        let content = fs::read_to_string(&control).map_err(|e| CoreError::io(&control, e))?;
        let rendered = content.replace(
            &self.toolchain.design_placeholder,
            &design.to_string_lossy(),
        );
        fs::write(&control, rendered).map_err(|e| CoreError::io(&control, e))
    }
}

fn copy_missing(from: &Path, to: &Path) -> Result<()> {
    fs::create_dir_all(to).map_err(|e| CoreError::io(to, e))?;
    let entries = fs::read_dir(from).map_err(|e| CoreError::io(from, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| CoreError::io(from, e))?;
        let source = entry.path();
        let target = to.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| CoreError::io(&source, e))?;

        if file_type.is_dir() {
            copy_missing(&source, &target)?;
        } else if !target.exists() {
            fs::copy(&source, &target).map_err(|e| CoreError::io(&source, e))?;
        }
    }
    Ok(())
}
