use futures::stream::{self, StreamExt};
use rtl_bench_core::{
    BenchTask, Candidate, CompletionRecord, CoreError, GenerationRequest, ModelBackend, RepetitionIndex,
    Result, SamplingConfig,
};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::time::Instant;

use crate::extraction::CodeExtractor;
use crate::repetition::{repetition_dir, trial_dir};
use crate::stages::staging::Stager;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationConfig {
    pub output_root: PathBuf,
    pub completion_log: Option<PathBuf>,
    pub strip_comments: bool,
    pub max_concurrent_requests: usize,
}

impl GenerationConfig {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            completion_log: None,
            strip_comments: true,
            max_concurrent_requests: 4,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationSummary {
    pub tasks: usize,
    pub repetitions: usize,
    pub candidates_written: usize,
    pub failed_tasks: Vec<String>,
    pub duration_ms: u128,
}

/// Fans each task prompt out into `batch_size` samples and writes sample `i`
/// to `test_i/<task_id>/<task_id>.v`.
pub struct GenerationStage {
    backend: Arc<dyn ModelBackend>,
    sampling: SamplingConfig,
    config: GenerationConfig,
    extractor: CodeExtractor,
}

impl GenerationStage {
    pub fn new(backend: Arc<dyn ModelBackend>, sampling: SamplingConfig, config: GenerationConfig) -> Self {
        let extractor = CodeExtractor::new(config.strip_comments);
        Self {
            backend,
            sampling,
            config,
            extractor,
        }
    }

    pub async fn run(&self, tasks: &[BenchTask]) -> Result<GenerationSummary> {
        let start = Instant::now();
        let batch = self.sampling.effective_batch_size();
        tracing::info!(
            model = self.backend.model_name(),
            tasks = tasks.len(),
            batch,
            temperature = self.sampling.temperature,
            "Generating candidates"
        );

        for i in 0..batch {
            let dir = repetition_dir(&self.config.output_root, RepetitionIndex(i));
            std::fs::create_dir_all(&dir).map_err(|e| CoreError::io(&dir, e))?;
        }

        let concurrency = self.config.max_concurrent_requests.max(1);
        let results: Vec<(&BenchTask, Result<Vec<String>>)> = stream::iter(tasks)
            .map(|task| async move {
                let request = GenerationRequest::new(task.prompt(), &self.sampling);
                (task, self.backend.generate(&request).await)
            })
            .buffered(concurrency)
            .collect()
            .await;

        let mut summary = GenerationSummary {
            tasks: tasks.len(),
            repetitions: batch,
            ..Default::default()
        };
        let mut records = Vec::new();

        for (task, result) in results {
            let outputs = match result {
                Ok(outputs) => outputs,
                Err(e) => {
                    tracing::error!(task = %task.task_id, error = %e, "generation failed");
                    summary.failed_tasks.push(task.task_id.clone());
                    continue;
                }
            };

            for (sample_index, raw_output) in outputs.into_iter().take(batch).enumerate() {
                let candidate = self.to_candidate(task, sample_index, raw_output);
                self.write_candidate(&candidate)?;
                summary.candidates_written += 1;
                records.push(completion_record(task, &candidate));
            }
        }

        if let Some(log) = &self.config.completion_log {
            write_completion_log(log, &records)?;
        }

        summary.duration_ms = start.elapsed().as_millis();
        tracing::info!(
            written = summary.candidates_written,
            failed = summary.failed_tasks.len(),
            duration_ms = summary.duration_ms as u64,
            "Generation finished"
        );
        Ok(summary)
    }

    fn to_candidate(&self, task: &BenchTask, sample_index: usize, raw_output: String) -> Candidate {
        let extracted = self.extractor.extract(&raw_output);
        Candidate {
            task_id: task.task_id.clone(),
            sample_index,
            raw_output,
            full_code: extracted.full_code,
            header: extracted.header,
            body: extracted.body,
        }
    }

    fn write_candidate(&self, candidate: &Candidate) -> Result<()> {
        let dir = trial_dir(&self.config.output_root, candidate.repetition(), &candidate.task_id);
        std::fs::create_dir_all(&dir).map_err(|e| CoreError::io(&dir, e))?;
        let path = Stager::candidate_path(&dir, &candidate.task_id);
        std::fs::write(&path, &candidate.full_code).map_err(|e| CoreError::io(&path, e))
    }
}

fn completion_record(task: &BenchTask, candidate: &Candidate) -> CompletionRecord {
    CompletionRecord {
        task_id: task.task_id.clone(),
        description: task.description.clone(),
        interface: task.interface.clone(),
        completion: candidate.body.clone(),
        full_code: candidate.full_code.clone(),
        code_header: candidate.header.clone(),
        redes: candidate.raw_output.clone(),
        maintain: candidate.raw_output.contains(&task.description),
    }
}

/// The log is replaced, not appended to, so reruns never mix samples.
fn write_completion_log(path: &Path, records: &[CompletionRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
    }
    let file = std::fs::File::create(path).map_err(|e| CoreError::io(path, e))?;
    let mut writer = std::io::BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n").map_err(|e| CoreError::io(path, e))?;
    }
    writer.flush().map_err(|e| CoreError::io(path, e))
}
