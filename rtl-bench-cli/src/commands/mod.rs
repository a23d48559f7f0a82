//! Subcommand implementations

use anyhow::{Context as _, Result};
use rtl_bench_workflow::{Corpus, CorpusLoader};
use std::path::Path;

use crate::cli::Commands;
use crate::context::Context;

pub mod evaluate;
pub mod export;
pub mod generate;
pub mod replay;
pub mod stage;

pub async fn execute(ctx: &Context, command: Commands) -> Result<()> {
    match command {
        Commands::Generate(args) => generate::execute(ctx, args).await,
        Commands::Stage(args) => stage::execute(ctx, args),
        Commands::Evaluate(args) => evaluate::execute(ctx, args).await,
        Commands::Replay(args) => replay::execute(ctx, args),
        Commands::Export(args) => export::execute(ctx, args),
    }
}

/// Load a corpus, restricted to `roster` when given on the command line or
/// in the configuration. Skipped lines are surfaced as warnings.
pub(crate) fn load_corpus(ctx: &Context, path: &Path, roster: Option<Vec<String>>) -> Result<Corpus> {
    let mut loader = CorpusLoader::new();
    if let Some(roster) = roster.or_else(|| ctx.config.evaluation.roster.clone()) {
        loader = loader.with_roster(roster);
    }

    let corpus = loader
        .load(path)
        .with_context(|| format!("Failed to load corpus {}", path.display()))?;

    for warning in &corpus.warnings {
        ctx.output
            .warning(&format!("corpus line {}: {}", warning.line, warning.reason));
    }
    if corpus.is_empty() {
        anyhow::bail!("Corpus {} contains no usable tasks", path.display());
    }
    Ok(corpus)
}
