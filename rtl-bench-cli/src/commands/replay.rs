//! Replay command

use anyhow::{Context as _, Result};
use clap::{ArgGroup, Args};
use colored::Colorize;
use comfy_table::Cell;
use rtl_bench_core::{RunId, ScoreRecord};
use rtl_bench_metrics::{parse_pass_rates, ReplayEstimator, ReplayReport};
use rtl_bench_workflow::append_score;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::context::Context;
use crate::output::{new_table, print_field, print_section, score_cell, TableDisplay};

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("input").required(true).args(["results", "evaluator_output"])))]
pub struct ReplayArgs {
    /// Results log, one `{"task_id": ..., "score": ...}` object per line
    pub results: Option<PathBuf>,

    /// Captured stdout of an external evaluator printing `{'pass@1': ...}`
    #[arg(long)]
    pub evaluator_output: Option<PathBuf>,

    /// pass@k values to report (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub k: Option<Vec<u32>>,

    /// Trials each task is expected to have
    #[arg(long)]
    pub expected_trials: Option<usize>,

    /// Model label recorded with the scores
    #[arg(short, long)]
    pub model: Option<String>,

    /// Append a JSON score line here
    #[arg(long)]
    pub score_file: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct ReplayDisplay {
    source: PathBuf,
    reports: Vec<ReplayReport>,
}

impl TableDisplay for ReplayDisplay {
    fn display(&self) {
        print_section("Replay");
        print_field("Results", &self.source.display().to_string());

        let ks: Vec<String> = self.reports.iter().map(|r| format!("pass@{}", r.k)).collect();
        let mut headers = vec!["Task"];
        headers.extend(ks.iter().map(String::as_str));
        let mut table = new_table(&headers);

        if let Some(first) = self.reports.first() {
            for task_id in first.task_pass.keys() {
                let mut row = vec![Cell::new(task_id)];
                for report in &self.reports {
                    row.push(score_cell(report.task_pass.get(task_id).copied().unwrap_or(0.0)));
                }
                table.add_row(row);
            }
        }
        let mut average = vec![Cell::new("average".bold())];
        average.extend(self.reports.iter().map(|r| score_cell(r.average)));
        table.add_row(average);

        println!("\n{table}");
    }
}

#[derive(Debug, Serialize)]
struct EvaluatorDisplay {
    source: PathBuf,
    pass_rates: BTreeMap<u32, f64>,
}

impl TableDisplay for EvaluatorDisplay {
    fn display(&self) {
        print_section("Evaluator output");
        print_field("Source", &self.source.display().to_string());
        let mut table = new_table(&["k", "pass@k"]);
        for (k, rate) in &self.pass_rates {
            table.add_row(vec![Cell::new(k), score_cell(*rate)]);
        }
        println!("\n{table}");
    }
}

pub fn execute(ctx: &Context, args: ReplayArgs) -> Result<()> {
    let record = match (&args.results, &args.evaluator_output) {
        (Some(results), _) => replay_results(ctx, &args, results)?,
        (None, Some(output)) => parse_evaluator(ctx, &args, output)?,
        (None, None) => anyhow::bail!("Either a results log or --evaluator-output is required"),
    };

    if let Some(path) = &args.score_file {
        append_score(path, &record).with_context(|| format!("Failed to append to {}", path.display()))?;
        ctx.output.success(&format!("Appended scores to {}", path.display()));
    }
    Ok(())
}

fn score_record(ctx: &Context, args: &ReplayArgs) -> ScoreRecord {
    let model = Some(args.model.clone().unwrap_or_else(|| ctx.config.model.model.clone()));
    ScoreRecord::new(RunId::new(), model, 0)
}

fn replay_results(
    ctx: &Context,
    args: &ReplayArgs,
    results: &Path,
) -> Result<ScoreRecord> {
    let ks = args.k.clone().unwrap_or_else(|| ctx.config.evaluation.ks.clone());
    let expected = args
        .expected_trials
        .unwrap_or(ctx.config.evaluation.expected_trials);

    let mut reports = Vec::with_capacity(ks.len());
    for k in ks {
        let report = ReplayEstimator::new(k)
            .with_expected_trials(expected)
            .from_path(results)
            .with_context(|| format!("Failed to replay {}", results.display()))?;
        reports.push(report);
    }

    // Every k reads the same log, so the warnings are identical.
    if let Some(first) = reports.first() {
        for warning in &first.warnings {
            ctx.output.warning(&warning.to_string());
        }
    }

    let mut record = score_record(ctx, args);
    for report in &reports {
        record = record.with_score(format!("pass@{}", report.k), report.average);
    }

    ctx.output.write(&ReplayDisplay {
        source: results.to_path_buf(),
        reports,
    })?;
    Ok(record)
}

fn parse_evaluator(
    ctx: &Context,
    args: &ReplayArgs,
    output: &Path,
) -> Result<ScoreRecord> {
    let text = std::fs::read_to_string(output)
        .with_context(|| format!("Failed to read {}", output.display()))?;
    let pass_rates = parse_pass_rates(&text)
        .with_context(|| format!("No pass@k figures found in {}", output.display()))?;

    let mut record = score_record(ctx, args);
    for (k, rate) in &pass_rates {
        record = record.with_score(format!("pass@{}", k), *rate);
    }

    ctx.output.write(&EvaluatorDisplay {
        source: output.to_path_buf(),
        pass_rates,
    })?;
    Ok(record)
}
