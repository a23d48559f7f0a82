//! Layered harness configuration

use anyhow::{Context as _, Result};
use config::{Config, Environment, File};
use directories::ProjectDirs;
use rtl_bench_core::SamplingConfig;
use rtl_bench_metrics::{DEFAULT_EXPECTED_TRIALS, DEFAULT_PLACEHOLDER_TASKS};
use rtl_bench_workflow::{DriverConfig, InferenceConfig, MarkerConfig, ToolchainConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

/// Prefix for environment overrides, e.g. `RTL_BENCH_TOOLCHAIN__RUN_TIMEOUT_SECS=20`.
pub const ENV_PREFIX: &str = "RTL_BENCH";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Full harness configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AppConfig {
    #[validate(nested)]
    pub model: InferenceConfig,
    #[validate(nested)]
    pub sampling: SamplingConfig,
    #[validate(nested)]
    pub toolchain: ToolchainConfig,
    pub marker: MarkerConfig,
    #[validate(nested)]
    pub evaluation: EvaluationSettings,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: InferenceConfig::default(),
            sampling: SamplingConfig::default(),
            toolchain: ToolchainConfig::default(),
            marker: MarkerConfig::default(),
            evaluation: EvaluationSettings::default(),
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(default)]
pub struct EvaluationSettings {
    #[validate(length(min = 1))]
    pub ks: Vec<u32>,
    pub placeholder_tasks: usize,
    /// Trials per task a results log is expected to hold.
    pub expected_trials: usize,
    #[validate(range(min = 1))]
    pub max_parallel_trials: usize,
    #[validate(range(min = 0.5, max = 0.999))]
    pub confidence: f64,
    /// Restrict the corpus to these task ids.
    pub roster: Option<Vec<String>>,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            ks: vec![1],
            placeholder_tasks: DEFAULT_PLACEHOLDER_TASKS,
            expected_trials: DEFAULT_EXPECTED_TRIALS,
            max_parallel_trials: 1,
            confidence: 0.95,
            roster: None,
        }
    }
}

impl EvaluationSettings {
    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            ks: self.ks.clone(),
            placeholder_tasks: self.placeholder_tasks,
            max_parallel_trials: self.max_parallel_trials,
            confidence: self.confidence,
        }
    }
}

impl AppConfig {
    /// Load defaults, then the user config file, then `explicit`, then the
    /// environment. Later sources win.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(&AppConfig::default()).context("Failed to seed defaults")?);

        if let Some(path) = Self::user_config_path() {
            builder = builder.add_source(File::from(path).required(false));
        }
        if let Some(path) = explicit {
            if !path.is_file() {
                anyhow::bail!("Config file {} does not exist", path.display());
            }
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("evaluation.ks")
                .with_list_parse_key("evaluation.roster"),
        );

        let config: AppConfig = builder
            .build()
            .context("Failed to assemble configuration")?
            .try_deserialize()
            .context("Failed to parse configuration")?;

        config.validate().context("Invalid configuration")?;
        if config.evaluation.ks.contains(&0) {
            anyhow::bail!("Invalid configuration: evaluation.ks must not contain 0");
        }
        Ok(config)
    }

    /// `<platform config dir>/config.toml`
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "rtl-bench", "rtl-bench").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
