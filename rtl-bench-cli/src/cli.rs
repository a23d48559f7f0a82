//! Command-line definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::evaluate::EvaluateArgs;
use crate::commands::export::ExportArgs;
use crate::commands::generate::GenerateArgs;
use crate::commands::replay::ReplayArgs;
use crate::commands::stage::StageArgs;
use crate::output::OutputFormat;

/// Evaluate LLM-generated Verilog against simulation testbenches
#[derive(Debug, Parser)]
#[command(name = "rtl-bench", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter level, overrides the configured level and RUST_LOG
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sample candidate designs from a model for every corpus task
    Generate(GenerateArgs),

    /// Copy testbench fixtures into every trial directory
    Stage(StageArgs),

    /// Build and simulate staged candidates and report pass@k
    Evaluate(EvaluateArgs),

    /// Compute pass@k from a results log or evaluator output
    Replay(ReplayArgs),

    /// Dump corpus tasks to per-task Verilog listings
    Export(ExportArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "rtl-bench",
            "replay",
            "results.jsonl",
            "--output",
            "json",
            "--no-color",
        ])
        .unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
        assert!(cli.no_color);
        assert!(matches!(cli.command, Commands::Replay(_)));
    }
}
