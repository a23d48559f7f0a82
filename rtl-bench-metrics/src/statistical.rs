use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use statrs::statistics::Statistics;

/// Mean of per-task scores with a two-sided Student-t interval.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoreInterval {
    pub mean: f64,
    pub lower: f64,
    pub upper: f64,
    pub confidence: f64,
    pub samples: usize,
}

pub struct StatisticalAnalyzer;

impl StatisticalAnalyzer {
    /// Interval for the mean of `values` at the given confidence level.
    ///
    /// Fewer than two values, or zero spread, collapse the interval onto the
    /// mean. Bounds are clamped to [0, 1] since every input is a probability.
    pub fn score_interval(values: &[f64], confidence: f64) -> Option<ScoreInterval> {
        if values.is_empty() {
            return None;
        }

        let mean = values.iter().copied().mean();
        let collapsed = ScoreInterval {
            mean,
            lower: mean,
            upper: mean,
            confidence,
            samples: values.len(),
        };
        if values.len() < 2 {
            return Some(collapsed);
        }

        let std_dev = values.iter().copied().std_dev();
        if std_dev == 0.0 || !std_dev.is_finite() {
            return Some(collapsed);
        }

        let n = values.len() as f64;
        let t_dist = StudentsT::new(0.0, 1.0, n - 1.0).ok()?;
        let t_value = t_dist.inverse_cdf((1.0 + confidence) / 2.0);
        let margin = t_value * (std_dev / n.sqrt());

        Some(ScoreInterval {
            mean,
            lower: (mean - margin).max(0.0),
            upper: (mean + margin).min(1.0),
            confidence,
            samples: values.len(),
        })
    }
}
