//! Stage command

use anyhow::{Context as _, Result};
use clap::Args;
use rtl_bench_workflow::{discover_task_ids, DesignIndex, RepetitionSource, Stager, StagingSummary};
use serde::Serialize;
use std::path::PathBuf;

use crate::commands::load_corpus;
use crate::context::Context;
use crate::output::{print_field, print_section, TableDisplay};

#[derive(Debug, Args)]
pub struct StageArgs {
    /// Root holding test_0, test_1, ...
    pub root: PathBuf,

    /// Directory of per-task fixtures (testbench, makefile)
    #[arg(long)]
    pub designs: PathBuf,

    /// file_list.json mapping category/subcategory to task ids
    #[arg(long)]
    pub file_list: Option<PathBuf>,

    /// Number of repetitions; probed from disk when omitted
    #[arg(short = 'r', long)]
    pub repetitions: Option<usize>,

    /// Corpus naming the tasks; defaults to the tasks found in test_0
    #[arg(long)]
    pub corpus: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct StageDisplay {
    repetitions: usize,
    tasks: usize,
    #[serde(flatten)]
    summary: StagingSummary,
}

impl TableDisplay for StageDisplay {
    fn display(&self) {
        print_section("Staging");
        print_field("Repetitions", &self.repetitions.to_string());
        print_field("Tasks", &self.tasks.to_string());
        print_field("Staged", &self.summary.staged.to_string());
        print_field("Missing candidate", &self.summary.missing_candidate.to_string());
        print_field("Missing fixture", &self.summary.missing_fixture.to_string());
    }
}

pub fn execute(ctx: &Context, args: StageArgs) -> Result<()> {
    let index = match &args.file_list {
        Some(list) => DesignIndex::from_file_list(&args.designs, list)
            .with_context(|| format!("Failed to read {}", list.display()))?,
        None => DesignIndex::Flat(args.designs.clone()),
    };

    let task_ids = match &args.corpus {
        Some(path) => load_corpus(ctx, path, None)?.task_ids(),
        None => discover_task_ids(&args.root)?,
    };

    let source = args
        .repetitions
        .map(RepetitionSource::Explicit)
        .unwrap_or(RepetitionSource::Probe);
    let repetitions = source.resolve(&args.root);
    if repetitions.is_empty() {
        anyhow::bail!("No repetitions found under {}", args.root.display());
    }

    let stager = Stager::new(index, ctx.config.toolchain.clone());
    let summary = stager
        .stage_repetitions(&args.root, &repetitions, &task_ids)
        .context("Staging failed")?;

    ctx.output
        .success(&format!("Staged {} trial directories", summary.staged));
    ctx.output.write(&StageDisplay {
        repetitions: repetitions.len(),
        tasks: task_ids.len(),
        summary,
    })
}
