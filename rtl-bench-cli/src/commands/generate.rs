//! Generate command

use anyhow::{Context as _, Result};
use clap::Args;
use rtl_bench_core::{ModelBackend, SamplingConfig, SamplingPreset};
use rtl_bench_workflow::{GenerationConfig, GenerationStage, GenerationSummary, OpenAiCompatibleBackend};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use validator::Validate;

use crate::commands::load_corpus;
use crate::context::Context;
use crate::output::{print_field, print_section, TableDisplay};

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Task corpus (line-delimited JSON)
    #[arg(long)]
    pub corpus: PathBuf,

    /// Root directory that receives test_0, test_1, ...
    #[arg(short = 'd', long)]
    pub output_dir: PathBuf,

    /// Completion log (JSONL), replaced on every run
    #[arg(long)]
    pub completion_log: Option<PathBuf>,

    /// Sampling preset (high, low); individual flags below override it
    #[arg(long)]
    pub preset: Option<SamplingPreset>,

    #[arg(long)]
    pub temperature: Option<f64>,

    #[arg(long)]
    pub top_p: Option<f64>,

    /// Samples per task, one per repetition
    #[arg(short = 'n', long)]
    pub batch_size: Option<usize>,

    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Model name sent to the server
    #[arg(short, long)]
    pub model: Option<String>,

    /// Server API root, e.g. http://localhost:8000/v1
    #[arg(long)]
    pub base_url: Option<String>,

    /// Send raw prompts to /completions instead of chat messages
    #[arg(long)]
    pub no_chat_template: bool,

    /// Keep comments in extracted code
    #[arg(long)]
    pub keep_comments: bool,

    /// Requests in flight at once
    #[arg(short = 'j', long, default_value = "4")]
    pub concurrency: usize,

    /// Restrict to these task ids (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub roster: Option<Vec<String>>,
}

impl GenerateArgs {
    fn sampling(&self, base: &SamplingConfig) -> SamplingConfig {
        let mut sampling = match self.preset {
            Some(preset) => SamplingConfig {
                max_tokens: base.max_tokens,
                ..SamplingConfig::from_preset(preset)
            },
            None => base.clone(),
        };
        if let Some(temperature) = self.temperature {
            sampling.temperature = temperature;
        }
        if let Some(top_p) = self.top_p {
            sampling.top_p = Some(top_p);
        }
        if let Some(batch_size) = self.batch_size {
            sampling.batch_size = batch_size;
        }
        if let Some(max_tokens) = self.max_tokens {
            sampling.max_tokens = max_tokens;
        }
        sampling
    }
}

#[derive(Debug, Serialize)]
struct GenerateDisplay {
    model: String,
    output_dir: PathBuf,
    #[serde(flatten)]
    summary: GenerationSummary,
}

impl TableDisplay for GenerateDisplay {
    fn display(&self) {
        print_section("Generation");
        print_field("Model", &self.model);
        print_field("Output", &self.output_dir.display().to_string());
        print_field("Tasks", &self.summary.tasks.to_string());
        print_field("Repetitions", &self.summary.repetitions.to_string());
        print_field("Candidates", &self.summary.candidates_written.to_string());
        print_field("Duration", &format!("{:.1}s", self.summary.duration_ms as f64 / 1000.0));
        if !self.summary.failed_tasks.is_empty() {
            print_field("Failed", &self.summary.failed_tasks.join(", "));
        }
    }
}

pub async fn execute(ctx: &Context, args: GenerateArgs) -> Result<()> {
    let corpus = load_corpus(ctx, &args.corpus, args.roster.clone())?;

    let sampling = args.sampling(&ctx.config.sampling);
    sampling.validate().context("Invalid sampling parameters")?;

    let mut inference = ctx.config.model.clone();
    if let Some(model) = &args.model {
        inference.model = model.clone();
    }
    if let Some(base_url) = &args.base_url {
        inference.base_url = base_url.clone();
    }
    if args.no_chat_template {
        inference.use_chat_template = false;
    }

    let backend = OpenAiCompatibleBackend::new(inference).context("Failed to create model client")?;
    let model = backend.model_name().to_string();

    let mut config = GenerationConfig::new(&args.output_dir);
    config.completion_log = args.completion_log.clone();
    config.strip_comments = !args.keep_comments;
    config.max_concurrent_requests = args.concurrency;

    let spinner = ctx.output.spinner(&format!(
        "Sampling {} task(s) x {} from {}...",
        corpus.len(),
        sampling.effective_batch_size(),
        model
    ));
    let stage = GenerationStage::new(Arc::new(backend), sampling, config);
    let result = stage.run(&corpus.tasks).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let summary = result.context("Generation failed")?;

    if !summary.failed_tasks.is_empty() {
        ctx.output.warning(&format!(
            "{} task(s) produced no candidates",
            summary.failed_tasks.len()
        ));
    }
    ctx.output
        .success(&format!("Wrote {} candidate(s)", summary.candidates_written));

    ctx.output.write(&GenerateDisplay {
        model,
        output_dir: args.output_dir,
        summary,
    })
}
