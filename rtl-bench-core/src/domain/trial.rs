use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::RepetitionIndex;

/// Classified result of running one candidate through the toolchain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TrialOutcome {
    /// The build step did not leave a simulation artifact behind, or the
    /// toolchain could not be started at all.
    BuildFailed,
    /// The build step exceeded its optional budget.
    BuildTimedOut,
    /// Built, but the simulation did not finish within the run budget.
    RunTimedOut,
    /// Built and ran, but the output carried no success marker.
    SimFailed,
    /// Built and ran, and the output carried a success marker.
    SimPassed,
}

impl TrialOutcome {
    /// Whether the candidate built (the syntax criterion).
    pub fn built(&self) -> bool {
        matches!(
            self,
            TrialOutcome::RunTimedOut | TrialOutcome::SimFailed | TrialOutcome::SimPassed
        )
    }

    /// Whether the candidate built and passed simulation in time (the functional criterion).
    pub fn passed(&self) -> bool {
        matches!(self, TrialOutcome::SimPassed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrialOutcome::BuildFailed => "build_failed",
            TrialOutcome::BuildTimedOut => "build_timed_out",
            TrialOutcome::RunTimedOut => "run_timed_out",
            TrialOutcome::SimFailed => "sim_failed",
            TrialOutcome::SimPassed => "sim_passed",
        }
    }
}

impl fmt::Display for TrialOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the simulation step finished within its budget.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    TimedOut,
}

/// One model sample after code extraction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Candidate {
    pub task_id: String,
    pub sample_index: usize,
    pub raw_output: String,
    pub full_code: String,
    pub header: String,
    pub body: String,
}

impl Candidate {
    /// Repetition this sample is staged into; sample `i` of a batch lands in `test_i`.
    pub fn repetition(&self) -> RepetitionIndex {
        RepetitionIndex(self.sample_index)
    }
}

/// Outcome of one (task, repetition) attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrialReport {
    pub task_id: String,
    pub repetition: RepetitionIndex,
    pub outcome: TrialOutcome,
}
