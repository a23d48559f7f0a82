use futures::stream::{self, StreamExt};
use rtl_bench_core::{CoreError, Criterion, RepetitionIndex, Result, RunId, TrialReport};
use rtl_bench_metrics::{PassAtKAggregator, StatisticalAnalyzer, DEFAULT_PLACEHOLDER_TASKS};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use validator::Validate;

use crate::accumulator::ResultAccumulator;
use crate::executor::TrialExecutor;
use crate::repetition::{repetition_dir, trial_dir, RepetitionSource};
use crate::stages::reporting::BenchmarkReport;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(default)]
pub struct DriverConfig {
    /// Sample budgets to report pass@k at.
    #[validate(length(min = 1))]
    pub ks: Vec<u32>,
    /// Zero-score entries appended to every live average.
    pub placeholder_tasks: usize,
    /// Trials of distinct tasks run at once within a repetition.
    #[validate(range(min = 1))]
    pub max_parallel_trials: usize,
    #[validate(range(min = 0.5, max = 0.999))]
    pub confidence: f64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            ks: vec![1],
            placeholder_tasks: DEFAULT_PLACEHOLDER_TASKS,
            max_parallel_trials: 1,
            confidence: 0.95,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DriverEvent {
    RepetitionStarted { repetition: RepetitionIndex, tasks: usize },
    TrialFinished(TrialReport),
    RepetitionFinished { repetition: RepetitionIndex },
}

/// Drives repetitions of the benchmark through the trial executor.
///
/// Repetitions run strictly one after another. Within a repetition each task
/// has its own trial directory, so up to `max_parallel_trials` of them run
/// together; their tally updates commute.
pub struct BenchmarkDriver {
    executor: TrialExecutor,
    config: DriverConfig,
    run_id: RunId,
    progress_tx: Option<broadcast::Sender<DriverEvent>>,
    cancel: CancellationToken,
}

impl BenchmarkDriver {
    pub fn new(executor: TrialExecutor, config: DriverConfig) -> Result<Self> {
        config.validate()?;
        if config.ks.contains(&0) {
            return Err(CoreError::Validation("k must be at least 1".to_string()));
        }
        Ok(Self {
            executor,
            config,
            run_id: RunId::new(),
            progress_tx: None,
            cancel: CancellationToken::new(),
        })
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Enable progress events.
    pub fn subscribe(&mut self) -> broadcast::Receiver<DriverEvent> {
        match &self.progress_tx {
            Some(tx) => tx.subscribe(),
            None => {
                let (tx, rx) = broadcast::channel(256);
                self.progress_tx = Some(tx);
                rx
            }
        }
    }

    /// Cancelling stops new trials from being scheduled; the run then fails
    /// with [`CoreError::Cancelled`].
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn report_progress(&self, event: DriverEvent) {
        if let Some(tx) = &self.progress_tx {
            let _ = tx.send(event);
        }
    }

    /// Execute every repetition under `root`, folding outcomes into
    /// `accumulator`. Returns the number of repetitions executed.
    pub async fn run(
        &self,
        root: &Path,
        task_ids: &[String],
        source: RepetitionSource,
        accumulator: &ResultAccumulator,
    ) -> Result<usize> {
        let repetitions = source.resolve(root);
        let span = tracing::info_span!("benchmark", run_id = %self.run_id);

        async {
            tracing::info!(
                repetitions = repetitions.len(),
                tasks = task_ids.len(),
                root = %root.display(),
                "Starting evaluation"
            );

            for &repetition in &repetitions {
                if !repetition_dir(root, repetition).is_dir() {
                    tracing::warn!("{} missing, every trial counts as a build failure", repetition);
                }
                self.run_repetition(root, repetition, task_ids, accumulator).await?;
            }

            Ok(repetitions.len())
        }
        .instrument(span)
        .await
    }

    async fn run_repetition(
        &self,
        root: &Path,
        repetition: RepetitionIndex,
        task_ids: &[String],
        accumulator: &ResultAccumulator,
    ) -> Result<()> {
        tracing::info!("{}", repetition);
        self.report_progress(DriverEvent::RepetitionStarted {
            repetition,
            tasks: task_ids.len(),
        });

        let executor = &self.executor;
        let cancel = &self.cancel;
        let mut trials = stream::iter(task_ids)
            .map(|task_id| async move {
                if cancel.is_cancelled() {
                    return None;
                }
                let dir = trial_dir(root, repetition, task_id);
                tracing::debug!("test {} in {}", task_id, repetition);
                Some((task_id, executor.execute(&dir).await))
            })
            .buffer_unordered(self.config.max_parallel_trials);

        while let Some(finished) = trials.next().await {
            if let Some((task_id, outcome)) = finished {
                accumulator.record(task_id, outcome);
                self.report_progress(DriverEvent::TrialFinished(TrialReport {
                    task_id: task_id.clone(),
                    repetition,
                    outcome,
                }));
            }
        }

        if self.cancel.is_cancelled() {
            tracing::warn!("{} interrupted", repetition);
            return Err(CoreError::Cancelled);
        }

        self.report_progress(DriverEvent::RepetitionFinished { repetition });
        Ok(())
    }

    /// Run all repetitions and aggregate the result into a report.
    pub async fn evaluate(
        &self,
        root: &Path,
        task_ids: &[String],
        source: RepetitionSource,
        model: Option<String>,
    ) -> Result<BenchmarkReport> {
        let accumulator = ResultAccumulator::with_tasks(task_ids.iter().cloned());
        let repetitions = self.run(root, task_ids, source, &accumulator).await?;
        let tallies = accumulator.snapshot();

        for (task_id, tally) in &tallies {
            tracing::info!(
                task = %task_id,
                syntax_success = tally.syntax_success,
                func_success = tally.func_success,
                "tally"
            );
        }

        let aggregator = PassAtKAggregator::new(self.config.placeholder_tasks);
        let n = repetitions as u32;
        let mut pass_at_k = Vec::with_capacity(self.config.ks.len());
        for &k in &self.config.ks {
            if n > 0 && k > n {
                tracing::warn!(k, n, "k exceeds repetitions, pass@k degenerates to any-success");
            }
            let live = aggregator.report(&tallies, n, k)?;
            tracing::info!(
                "syntax pass@{}: {:.4},   func pass@{}: {:.4}",
                k,
                live.syntax.average,
                k,
                live.functional.average
            );
            pass_at_k.push(live);
        }

        let smallest_k = self.config.ks.iter().copied().min().unwrap_or(1);
        let func_values: Vec<f64> = aggregator
            .aggregate(&tallies, n, smallest_k, Criterion::Functional)?
            .per_task
            .into_values()
            .collect();
        let func_interval = StatisticalAnalyzer::score_interval(&func_values, self.config.confidence);

        Ok(BenchmarkReport {
            run_id: self.run_id,
            model,
            repetitions,
            tallies,
            pass_at_k,
            func_interval,
        })
    }
}
