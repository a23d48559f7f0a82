use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::ids::RunId;
use crate::error::{CoreError, Result};

/// One line of a results log consumed by the log-replay estimator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplayRecord {
    pub task_id: String,
    pub score: f64,
}

impl ReplayRecord {
    /// Scores are thresholded at exactly 1.0.
    pub fn is_pass(&self) -> bool {
        self.score == 1.0
    }

    /// Build a record from an already-parsed JSON object.
    ///
    /// `score` may be a number, a boolean, or a numeric string; `task_id`
    /// may be a string or a number.
    pub fn from_value(value: &Value) -> Result<Self> {
        let task_id = match value.get("task_id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Null) | None => {
                return Err(CoreError::Validation("missing 'task_id' field".to_string()))
            }
            Some(other) => {
                return Err(CoreError::Validation(format!(
                    "unsupported 'task_id' value: {}",
                    other
                )))
            }
        };

        let score = match value.get("score") {
            Some(Value::Number(n)) => n.as_f64().ok_or_else(|| {
                CoreError::Validation(format!("score {} is not representable as f64", n))
            })?,
            Some(Value::Bool(b)) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Some(Value::String(s)) => s.trim().parse::<f64>().map_err(|_| {
                CoreError::Validation(format!("score '{}' is not numeric", s))
            })?,
            Some(Value::Null) | None => {
                return Err(CoreError::Validation("missing 'score' field".to_string()))
            }
            Some(other) => {
                return Err(CoreError::Validation(format!(
                    "unsupported 'score' value: {}",
                    other
                )))
            }
        };

        Ok(Self { task_id, score })
    }
}

/// One generated sample as written to the completion log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionRecord {
    pub task_id: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
    pub completion: String,
    pub full_code: String,
    pub code_header: String,
    /// Raw model output before extraction.
    pub redes: String,
    /// Whether the model echoed the task description verbatim.
    pub maintain: bool,
}

/// Line appended to a score file after an evaluation or replay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreRecord {
    pub run_id: RunId,
    pub model: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub repetitions: usize,
    /// Keyed `syntax pass@k` / `func pass@k`.
    pub scores: BTreeMap<String, f64>,
}

impl ScoreRecord {
    pub fn new(run_id: RunId, model: Option<String>, repetitions: usize) -> Self {
        Self {
            run_id,
            model,
            generated_at: Utc::now(),
            repetitions,
            scores: BTreeMap::new(),
        }
    }

    pub fn with_score(mut self, key: impl Into<String>, value: f64) -> Self {
        self.scores.insert(key.into(), value);
        self
    }
}
