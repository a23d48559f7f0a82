use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod commands;
mod config;
mod context;
mod output;

use cli::Cli;
use config::{AppConfig, LogFormat};
use context::Context;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "✗".red(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;
    init_tracing(cli.log_level.as_deref(), &config);
    tracing::debug!("Configuration loaded");

    let ctx = Context::new(&cli, config);
    commands::execute(&ctx, cli.command).await
}

/// `--log-level` beats `RUST_LOG`, which beats the configured level.
fn init_tracing(cli_level: Option<&str>, config: &AppConfig) {
    // Target directives match by prefix, so this covers every workspace crate.
    let directives = |level: &str| format!("rtl_bench={}", level);

    let filter = match cli_level {
        Some(level) => EnvFilter::new(directives(level)),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(directives(&config.log_level))),
    };

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}
