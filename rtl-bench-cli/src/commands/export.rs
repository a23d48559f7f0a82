//! Export command

use anyhow::{Context as _, Result};
use clap::Args;
use comfy_table::Cell;
use rtl_bench_workflow::export_listings;
use serde::Serialize;
use std::path::PathBuf;

use crate::commands::load_corpus;
use crate::context::Context;
use crate::output::{new_table, TableDisplay};

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Task corpus (line-delimited JSON)
    pub corpus: PathBuf,

    /// Directory receiving one `<task_id>.v` per task
    #[arg(short = 'd', long)]
    pub output_dir: PathBuf,

    /// Restrict to these task ids (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub roster: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct ExportDisplay {
    files: Vec<PathBuf>,
}

impl TableDisplay for ExportDisplay {
    fn display(&self) {
        let mut table = new_table(&["File"]);
        for file in &self.files {
            table.add_row(vec![Cell::new(file.display())]);
        }
        println!("{table}");
    }
}

pub fn execute(ctx: &Context, args: ExportArgs) -> Result<()> {
    let corpus = load_corpus(ctx, &args.corpus, args.roster)?;
    let files = export_listings(&corpus.tasks, &args.output_dir)
        .with_context(|| format!("Failed to export to {}", args.output_dir.display()))?;

    ctx.output.success(&format!(
        "Exported {} task(s) to {}",
        files.len(),
        args.output_dir.display()
    ));
    ctx.output.write(&ExportDisplay { files })
}
