use dashmap::DashMap;
use rtl_bench_core::{ResultTally, TrialOutcome};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug, Default)]
struct AtomicTally {
    trials: AtomicU32,
    syntax_success: AtomicU32,
    func_success: AtomicU32,
}

impl AtomicTally {
    // Increments go trials -> syntax -> func and loads go the other way, so a
    // concurrent snapshot never sees func_success > syntax_success.
    fn record(&self, outcome: TrialOutcome) {
        self.trials.fetch_add(1, Ordering::SeqCst);
        if outcome.built() {
            self.syntax_success.fetch_add(1, Ordering::SeqCst);
        }
        if outcome.passed() {
            self.func_success.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn load(&self) -> ResultTally {
        let func_success = self.func_success.load(Ordering::SeqCst);
        let syntax_success = self.syntax_success.load(Ordering::SeqCst);
        let trials = self.trials.load(Ordering::SeqCst);
        ResultTally {
            syntax_success,
            func_success,
            trials,
        }
    }
}

/// Per-task result tallies, safe to update from concurrent trials.
///
/// Every update is a commutative increment, so the final tallies depend only
/// on the multiset of recorded outcomes.
#[derive(Debug, Default)]
pub struct ResultAccumulator {
    tallies: DashMap<String, AtomicTally>,
}

impl ResultAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a zeroed tally for each task so tasks that never succeed
    /// still count in the average.
    pub fn with_tasks<I, S>(task_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let accumulator = Self::new();
        for id in task_ids {
            accumulator.tallies.entry(id.into()).or_default();
        }
        accumulator
    }

    pub fn record(&self, task_id: &str, outcome: TrialOutcome) {
        if let Some(tally) = self.tallies.get(task_id) {
            tally.record(outcome);
            return;
        }
        self.tallies
            .entry(task_id.to_string())
            .or_default()
            .record(outcome);
    }

    pub fn tally(&self, task_id: &str) -> Option<ResultTally> {
        self.tallies.get(task_id).map(|t| t.load())
    }

    pub fn snapshot(&self) -> BTreeMap<String, ResultTally> {
        self.tallies
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().load()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tallies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tallies.is_empty()
    }
}
