//! Log-replay variant: pass@k straight from a results log instead of live execution.

use regex::Regex;
use rtl_bench_core::{CoreError, ReplayRecord, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::OnceLock;

use crate::pass_at_k::{pass_at_k, round4};

/// Trials each task is expected to have in a results log.
pub const DEFAULT_EXPECTED_TRIALS: usize = 20;

/// Non-fatal data-quality findings from a replay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplayWarning {
    MalformedLine { line: usize, reason: String },
    TrialCountMismatch { task_id: String, observed: usize, expected: usize },
}

impl fmt::Display for ReplayWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayWarning::MalformedLine { line, reason } => {
                write!(f, "line {}: {}, skipped", line, reason)
            }
            ReplayWarning::TrialCountMismatch { task_id, observed, expected } => write!(
                f,
                "task {} has {} trials (expected {}), result may be inaccurate",
                task_id, observed, expected
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplayReport {
    pub k: u32,
    /// Per-task pass@k, rounded to four decimals.
    pub task_pass: BTreeMap<String, f64>,
    /// Unweighted mean of `task_pass`, rounded to four decimals.
    pub average: f64,
    pub warnings: Vec<ReplayWarning>,
}

#[derive(Debug, Clone)]
pub struct ReplayEstimator {
    k: u32,
    expected_trials: usize,
}

impl ReplayEstimator {
    pub fn new(k: u32) -> Self {
        Self {
            k,
            expected_trials: DEFAULT_EXPECTED_TRIALS,
        }
    }

    pub fn with_expected_trials(mut self, expected_trials: usize) -> Self {
        self.expected_trials = expected_trials;
        self
    }

    /// Replay a JSONL results file. A missing or unreadable file is fatal;
    /// bad lines are not.
    pub fn from_path(&self, path: impl AsRef<Path>) -> Result<ReplayReport> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| CoreError::io(path, e))?;
        self.replay_lines(BufReader::new(file), path)
    }

    pub fn from_reader<R: BufRead>(&self, reader: R) -> Result<ReplayReport> {
        self.replay_lines(reader, Path::new("<reader>"))
    }

    fn replay_lines<R: BufRead>(&self, reader: R, source: &Path) -> Result<ReplayReport> {
        let mut records = Vec::new();
        let mut warnings = Vec::new();

        for (idx, line) in reader.split(b'\n').enumerate() {
            let line_no = idx + 1;
            let bytes = line.map_err(|e| CoreError::io(source, e))?;
            let parsed = match std::str::from_utf8(&bytes) {
                Ok(text) if text.trim().is_empty() => continue,
                Ok(text) => parse_record(text.trim()),
                Err(e) => Err(format!("not valid UTF-8 ({})", e)),
            };

            match parsed {
                Ok(record) => records.push(record),
                Err(reason) => {
                    let warning = ReplayWarning::MalformedLine { line: line_no, reason };
                    tracing::warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        let mut report = self.from_records(records)?;
        warnings.append(&mut report.warnings);
        report.warnings = warnings;
        Ok(report)
    }

    pub fn from_records<I>(&self, records: I) -> Result<ReplayReport>
    where
        I: IntoIterator<Item = ReplayRecord>,
    {
        // task_id -> (trials, passes)
        let mut grouped: BTreeMap<String, (u32, u32)> = BTreeMap::new();
        for record in records {
            let entry = grouped.entry(record.task_id.clone()).or_default();
            entry.0 += 1;
            if record.is_pass() {
                entry.1 += 1;
            }
        }

        let mut warnings = Vec::new();
        let mut task_pass = BTreeMap::new();
        for (task_id, (m, s)) in grouped {
            if m as usize != self.expected_trials {
                let warning = ReplayWarning::TrialCountMismatch {
                    task_id: task_id.clone(),
                    observed: m as usize,
                    expected: self.expected_trials,
                };
                tracing::warn!("{}", warning);
                warnings.push(warning);
            }
            task_pass.insert(task_id, round4(pass_at_k(m, s, self.k)?));
        }

        let average = if task_pass.is_empty() {
            0.0
        } else {
            round4(task_pass.values().sum::<f64>() / task_pass.len() as f64)
        };

        Ok(ReplayReport {
            k: self.k,
            task_pass,
            average,
            warnings,
        })
    }
}

fn parse_record(line: &str) -> std::result::Result<ReplayRecord, String> {
    let value: serde_json::Value =
        serde_json::from_str(line).map_err(|e| format!("invalid JSON ({})", e))?;
    ReplayRecord::from_value(&value).map_err(|e| e.to_string())
}

fn pass_rate_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"'pass@(\d+)':\s*([0-9]*\.?[0-9]+(?:[eE][-+]?[0-9]+)?)").expect("static regex")
    })
}

/// Pull `{'pass@1': x, 'pass@5': y, ...}` out of an external evaluator's
/// stdout. Returns `None` when no pass rate is present.
pub fn parse_pass_rates(text: &str) -> Option<BTreeMap<u32, f64>> {
    let start = text.find("{'pass@")?;
    let end = start + text[start..].find('}')?;
    let block = &text[start..=end];

    let rates: BTreeMap<u32, f64> = pass_rate_pattern()
        .captures_iter(block)
        .filter_map(|caps| {
            let k = caps.get(1)?.as_str().parse().ok()?;
            let value = caps.get(2)?.as_str().parse().ok()?;
            Some((k, value))
        })
        .collect();

    if rates.is_empty() {
        None
    } else {
        Some(rates)
    }
}
