//! CLI execution context

use crate::cli::Cli;
use crate::config::AppConfig;
use crate::output::OutputWriter;

/// Execution context for CLI commands
pub struct Context {
    /// Effective configuration after all layers
    pub config: AppConfig,

    pub output: OutputWriter,
}

impl Context {
    pub fn new(cli: &Cli, config: AppConfig) -> Self {
        Self {
            config,
            output: OutputWriter::new(cli.output, cli.no_color),
        }
    }
}
