use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::Validate;

use crate::error::CoreError;

/// Sampling parameters for one repetition sweep.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct SamplingConfig {
    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub top_p: Option<f64>,
    #[validate(range(min = 1))]
    pub batch_size: usize,
    #[validate(range(min = 1))]
    pub max_tokens: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            top_p: None,
            batch_size: 20,
            max_tokens: 4096,
        }
    }
}

impl SamplingConfig {
    pub fn from_preset(preset: SamplingPreset) -> Self {
        match preset {
            SamplingPreset::High => Self {
                temperature: 0.85,
                top_p: Some(0.95),
                batch_size: 20,
                ..Self::default()
            },
            SamplingPreset::Low => Self {
                temperature: 0.0,
                top_p: Some(0.01),
                batch_size: 1,
                ..Self::default()
            },
        }
    }

    /// Number of samples actually drawn per task. Greedy decoding makes every
    /// sample identical, so a zero temperature always draws one.
    pub fn effective_batch_size(&self) -> usize {
        if self.temperature == 0.0 {
            1
        } else {
            self.batch_size
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SamplingPreset {
    /// n=20 at temperature 0.85, top_p 0.95
    High,
    /// greedy, n=1
    Low,
}

impl FromStr for SamplingPreset {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Ok(SamplingPreset::High),
            "low" => Ok(SamplingPreset::Low),
            other => Err(CoreError::Validation(format!(
                "unknown sampling preset '{}', expected 'high' or 'low'",
                other
            ))),
        }
    }
}
