//! Evaluate command

use anyhow::{Context as _, Result};
use clap::Args;
use colored::Colorize;
use comfy_table::Cell;
use rtl_bench_workflow::{
    discover_task_ids, BenchmarkDriver, BenchmarkReport, DriverEvent, RepetitionSource, ReportWriter,
    SuccessMarker, TrialExecutor,
};
use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::broadcast::error::RecvError;
use validator::Validate;

use crate::commands::load_corpus;
use crate::context::Context;
use crate::output::{new_table, print_field, print_section, score_cell, TableDisplay};

#[derive(Debug, Args)]
pub struct EvaluateArgs {
    /// Root holding the staged test_0, test_1, ...
    pub root: PathBuf,

    /// Number of repetitions; probed from disk when omitted
    #[arg(short = 'r', long)]
    pub repetitions: Option<usize>,

    /// Corpus naming the tasks; defaults to the tasks found in test_0
    #[arg(long)]
    pub corpus: Option<PathBuf>,

    /// pass@k values to report (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub k: Option<Vec<u32>>,

    /// Zero-score entries added to every average
    #[arg(long)]
    pub placeholder_tasks: Option<usize>,

    /// Trials of distinct tasks run at once
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,

    /// Simulation timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Model label recorded with the scores
    #[arg(short, long)]
    pub model: Option<String>,

    /// Append a JSON score line here
    #[arg(long)]
    pub score_file: Option<PathBuf>,

    /// Write the plain-text summary here
    #[arg(long)]
    pub summary_file: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
struct ReportDisplay(BenchmarkReport);

impl TableDisplay for ReportDisplay {
    fn display(&self) {
        let report = &self.0;

        print_section("Evaluation");
        print_field("Run", &report.run_id.to_string());
        if let Some(model) = &report.model {
            print_field("Model", model);
        }
        print_field("Repetitions", &report.repetitions.to_string());

        let mut tallies = new_table(&["Task", "Syntax", "Functional", "Trials"]);
        for (task_id, tally) in &report.tallies {
            let func = if tally.func_success > 0 {
                Cell::new(tally.func_success).fg(comfy_table::Color::Green)
            } else {
                Cell::new(tally.func_success)
            };
            tallies.add_row(vec![
                Cell::new(task_id),
                Cell::new(tally.syntax_success),
                func,
                Cell::new(tally.trials),
            ]);
        }
        println!("\n{tallies}");

        let mut scores = new_table(&["k", "syntax pass@k", "func pass@k"]);
        for live in &report.pass_at_k {
            scores.add_row(vec![
                Cell::new(live.k),
                score_cell(live.syntax.average),
                score_cell(live.functional.average),
            ]);
        }
        println!("\n{scores}");

        if let Some(first) = report.pass_at_k.first() {
            println!(
                "\n{} {}/{}   {} {}/{}",
                "syntax solved:".bold(),
                first.tasks_syntax_solved,
                first.tasks_total,
                "func solved:".bold(),
                first.tasks_func_solved,
                first.tasks_total
            );
        }
        if let Some(interval) = &report.func_interval {
            println!(
                "{} [{:.4}, {:.4}] at {:.0}%",
                "func pass@k interval:".bold(),
                interval.lower,
                interval.upper,
                interval.confidence * 100.0
            );
        }
    }
}

pub async fn execute(ctx: &Context, args: EvaluateArgs) -> Result<()> {
    let task_ids = match &args.corpus {
        Some(path) => load_corpus(ctx, path, None)?.task_ids(),
        None => discover_task_ids(&args.root)?,
    };

    let mut toolchain = ctx.config.toolchain.clone();
    if let Some(timeout) = args.timeout {
        toolchain.run_timeout_secs = timeout;
    }
    toolchain.validate().context("Invalid toolchain settings")?;
    let marker = SuccessMarker::from_config(&ctx.config.marker)?;

    let mut driver_config = ctx.config.evaluation.driver_config();
    if let Some(ks) = args.k.clone() {
        driver_config.ks = ks;
    }
    if let Some(placeholders) = args.placeholder_tasks {
        driver_config.placeholder_tasks = placeholders;
    }
    if let Some(jobs) = args.jobs {
        driver_config.max_parallel_trials = jobs;
    }

    // Resolve once so the progress total and the driver agree.
    let repetitions = match args.repetitions {
        Some(n) => n,
        None => RepetitionSource::Probe.resolve(&args.root).len(),
    };
    if repetitions == 0 {
        ctx.output
            .warning(&format!("No repetitions found under {}", args.root.display()));
    } else {
        ctx.output.info(&format!(
            "Evaluating {} task(s) over {} repetition(s)",
            task_ids.len(),
            repetitions
        ));
    }

    let mut driver = BenchmarkDriver::new(TrialExecutor::new(toolchain, marker), driver_config)?;
    let progress = ctx
        .output
        .progress_bar((repetitions * task_ids.len()) as u64, "Simulating");
    let progress_task = progress.map(|pb| {
        let mut rx = driver.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(DriverEvent::TrialFinished(trial)) => {
                        pb.set_message(format!("{} {}", trial.repetition, trial.task_id));
                        pb.inc(1);
                    }
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                }
            }
            pb.finish_and_clear();
        })
    });

    let cancel = driver.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after running trials finish");
            cancel.cancel();
        }
    });

    let result = driver
        .evaluate(
            &args.root,
            &task_ids,
            RepetitionSource::Explicit(repetitions),
            Some(args.model.clone().unwrap_or_else(|| ctx.config.model.model.clone())),
        )
        .await;

    interrupt.abort();
    drop(driver);
    if let Some(handle) = progress_task {
        let _ = handle.await;
    }

    let report = result.context("Evaluation failed")?;

    let mut writer = ReportWriter::new();
    if let Some(path) = &args.score_file {
        writer = writer.with_score_file(path);
    }
    if let Some(path) = &args.summary_file {
        writer = writer.with_summary_file(path);
    }
    writer.write(&report).context("Failed to save report")?;

    ctx.output.write(&ReportDisplay(report))
}
