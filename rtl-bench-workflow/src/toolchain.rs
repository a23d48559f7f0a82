use regex::{Regex, RegexBuilder};
use rtl_bench_core::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use validator::Validate;

/// How the external build/simulate toolchain is driven inside a trial directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
#[serde(default)]
pub struct ToolchainConfig {
    #[validate(length(min = 1))]
    pub build_command: String,
    #[validate(length(min = 1))]
    pub run_command: String,
    #[validate(length(min = 1))]
    pub clean_command: String,
    /// File whose existence after the build step means the build succeeded.
    #[validate(length(min = 1))]
    pub artifact: String,
    /// Simulation stdout is captured here.
    #[validate(length(min = 1))]
    pub output_file: String,
    /// Toolchain control file rendered during staging.
    #[validate(length(min = 1))]
    pub control_file: String,
    pub design_placeholder: String,
    #[validate(range(min = 1))]
    pub run_timeout_secs: u64,
    pub build_timeout_secs: Option<u64>,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            build_command: "make vcs".to_string(),
            run_command: "make sim".to_string(),
            clean_command: "make clean".to_string(),
            artifact: "simv".to_string(),
            output_file: "output.txt".to_string(),
            control_file: "makefile".to_string(),
            design_placeholder: "${TEST_DESIGN}".to_string(),
            run_timeout_secs: 8,
            build_timeout_secs: None,
        }
    }
}

impl ToolchainConfig {
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    pub fn build_timeout(&self) -> Option<Duration> {
        self.build_timeout_secs.map(Duration::from_secs)
    }

    pub fn artifact_path(&self, workdir: &Path) -> PathBuf {
        workdir.join(&self.artifact)
    }

    pub fn output_path(&self, workdir: &Path) -> PathBuf {
        workdir.join(&self.output_file)
    }

    pub fn control_path(&self, workdir: &Path) -> PathBuf {
        workdir.join(&self.control_file)
    }
}

/// Settings for recognising a passing simulation in captured output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MarkerConfig {
    /// Plain substring accepted as a pass. `None` disables the fallback.
    pub substring: Option<String>,
    pub case_insensitive: bool,
    /// Regex checked before the substring fallback.
    pub structured_pattern: Option<String>,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            substring: Some("pass".to_string()),
            case_insensitive: true,
            structured_pattern: None,
        }
    }
}

/// Compiled form of [`MarkerConfig`].
#[derive(Debug, Clone)]
pub struct SuccessMarker {
    structured: Option<Regex>,
    substring: Option<String>,
    case_insensitive: bool,
}

impl Default for SuccessMarker {
    fn default() -> Self {
        Self {
            structured: None,
            substring: Some("pass".to_string()),
            case_insensitive: true,
        }
    }
}

impl SuccessMarker {
    pub fn from_config(config: &MarkerConfig) -> Result<Self> {
        let structured = config
            .structured_pattern
            .as_deref()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(config.case_insensitive)
                    .multi_line(true)
                    .build()
                    .map_err(|e| {
                        CoreError::Configuration(format!("invalid success pattern '{}': {}", pattern, e))
                    })
            })
            .transpose()?;

        let substring = config.substring.as_ref().filter(|s| !s.is_empty()).map(|s| {
            if config.case_insensitive {
                s.to_lowercase()
            } else {
                s.clone()
            }
        });

        if structured.is_none() && substring.is_none() {
            return Err(CoreError::Configuration(
                "success marker needs a substring or a structured pattern".to_string(),
            ));
        }

        Ok(Self {
            structured,
            substring,
            case_insensitive: config.case_insensitive,
        })
    }

    pub fn matches(&self, output: &str) -> bool {
        if let Some(pattern) = &self.structured {
            if pattern.is_match(output) {
                return true;
            }
        }

        match &self.substring {
            Some(needle) if self.case_insensitive => output.to_lowercase().contains(needle.as_str()),
            Some(needle) => output.contains(needle.as_str()),
            None => false,
        }
    }
}
