use serde::{Deserialize, Serialize};
use std::fmt;

use super::trial::TrialOutcome;

/// The two independent success criteria a trial is scored on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Syntax,
    Functional,
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criterion::Syntax => f.write_str("syntax"),
            Criterion::Functional => f.write_str("func"),
        }
    }
}

/// Per-task success counters across all repetitions.
///
/// `func_success <= syntax_success <= trials` holds for every value built
/// through [`ResultTally::record`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultTally {
    pub syntax_success: u32,
    pub func_success: u32,
    pub trials: u32,
}

impl ResultTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one trial outcome into the tally.
    pub fn record(&mut self, outcome: TrialOutcome) {
        self.trials += 1;
        if outcome.built() {
            self.syntax_success += 1;
        }
        if outcome.passed() {
            self.func_success += 1;
        }
    }

    pub fn successes(&self, criterion: Criterion) -> u32 {
        match criterion {
            Criterion::Syntax => self.syntax_success,
            Criterion::Functional => self.func_success,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.func_success <= self.syntax_success && self.syntax_success <= self.trials
    }
}
