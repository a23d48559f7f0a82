use rtl_bench_core::{CoreError, ResultTally, Result, RunId, ScoreRecord};
use rtl_bench_metrics::{LiveReport, ScoreInterval};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Everything one evaluation run produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BenchmarkReport {
    pub run_id: RunId,
    pub model: Option<String>,
    pub repetitions: usize,
    pub tallies: BTreeMap<String, ResultTally>,
    /// One entry per requested k.
    pub pass_at_k: Vec<LiveReport>,
    /// Interval over per-task functional pass@k at the smallest k.
    pub func_interval: Option<ScoreInterval>,
}

impl BenchmarkReport {
    pub fn to_score_record(&self) -> ScoreRecord {
        let mut record = ScoreRecord::new(self.run_id, self.model.clone(), self.repetitions);
        for live in &self.pass_at_k {
            record = record
                .with_score(format!("syntax pass@{}", live.k), live.syntax.average)
                .with_score(format!("func pass@{}", live.k), live.functional.average);
        }
        record
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "run: {}", self.run_id);
        if let Some(model) = &self.model {
            let _ = writeln!(out, "model: {}", model);
        }
        let _ = writeln!(out, "repetitions: {}", self.repetitions);
        out.push('\n');

        for (task_id, tally) in &self.tallies {
            let _ = writeln!(
                out,
                "{}: syntax_success={} func_success={} trials={}",
                task_id, tally.syntax_success, tally.func_success, tally.trials
            );
        }
        out.push('\n');

        for live in &self.pass_at_k {
            let _ = writeln!(
                out,
                "syntax pass@{}: {:.4},   func pass@{}: {:.4}",
                live.k, live.syntax.average, live.k, live.functional.average
            );
        }

        if let Some(first) = self.pass_at_k.first() {
            let _ = writeln!(out, "total_syntax_success: {}/{}", first.tasks_syntax_solved, first.tasks_total);
            let _ = writeln!(out, "total_func_success: {}/{}", first.tasks_func_solved, first.tasks_total);
        }

        if let Some(interval) = &self.func_interval {
            let _ = writeln!(
                out,
                "func pass@k {:.0}% CI: [{:.4}, {:.4}] over {} tasks",
                interval.confidence * 100.0,
                interval.lower,
                interval.upper,
                interval.samples
            );
        }
        out
    }
}

/// Persists reports: JSONL score lines are appended, the text summary is replaced.
#[derive(Debug, Clone, Default)]
pub struct ReportWriter {
    score_file: Option<PathBuf>,
    summary_file: Option<PathBuf>,
}

impl ReportWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_score_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.score_file = Some(path.into());
        self
    }

    pub fn with_summary_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.summary_file = Some(path.into());
        self
    }

    pub fn write(&self, report: &BenchmarkReport) -> Result<()> {
        if let Some(path) = &self.score_file {
            append_score(path, &report.to_score_record())?;
            tracing::info!("Appended score to {}", path.display());
        }
        if let Some(path) = &self.summary_file {
            ensure_parent(path)?;
            std::fs::write(path, report.render_text()).map_err(|e| CoreError::io(path, e))?;
            tracing::info!("Wrote summary to {}", path.display());
        }
        Ok(())
    }
}

pub fn append_score(path: &Path, record: &ScoreRecord) -> Result<()> {
    ensure_parent(path)?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| CoreError::io(path, e))?;
    let line = serde_json::to_string(record)?;
    writeln!(file, "{}", line).map_err(|e| CoreError::io(path, e))
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))
        }
        _ => Ok(()),
    }
}
