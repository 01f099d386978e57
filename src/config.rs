//! Configuration management with validation and defaults
//!
//! Settings come from built-in defaults, an optional TOML file and
//! `GRIDFALL_*` environment variables, applied in that order.

use crate::errors::{ConfigurationError, GridfallResult};
use crate::settlement::{EconomicsConfig, RemainderPolicy};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GridfallConfig {
    #[serde(default)]
    pub economics: EconomicsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub host: HostConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Confidential-execution host file layout
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostConfig {
    /// Request file name inside the input directory
    pub input_file: String,
    /// Pretty-print JSON result files
    pub pretty_output: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            input_file: "input.json".to_string(),
            pretty_output: true,
        }
    }
}

impl GridfallConfig {
    /// On-chain deployment values
    pub fn production() -> Self {
        Self {
            logging: LoggingConfig {
                level: "warn".to_string(),
            },
            ..Self::default()
        }
    }

    /// Small round amounts and verbose logs for local runs
    pub fn local_testing() -> Self {
        Self {
            economics: EconomicsConfig {
                deposit_amount: 1_000,
                remainder_policy: RemainderPolicy::FirstWinner,
                ..EconomicsConfig::default()
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
            },
            host: HostConfig {
                pretty_output: false,
                ..HostConfig::default()
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.economics.deposit_amount == 0 {
            return Err(invalid("economics.deposit_amount", "deposit must be positive"));
        }
        if self.economics.protocol_fee_percent > 100 {
            return Err(invalid(
                "economics.protocol_fee_percent",
                "percentage cannot exceed 100",
            ));
        }
        if self.economics.exit_refund_percent > 100 {
            return Err(invalid(
                "economics.exit_refund_percent",
                "percentage cannot exceed 100",
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(invalid("logging.level", "level cannot be empty"));
        }
        if self.host.input_file.trim().is_empty() {
            return Err(invalid("host.input_file", "file name cannot be empty"));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigurationError {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Configuration loader with environment variable support
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Load from file (if any), apply environment overrides, then validate
    pub fn load(&self) -> GridfallResult<GridfallConfig> {
        self.load_with(|key| env::var(key).ok())
    }

    /// Same as [`load`](Self::load) with an explicit variable lookup
    pub fn load_with<F>(&self, lookup: F) -> GridfallResult<GridfallConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match self.config_path {
            Some(ref path) => Self::load_from_file(path)?,
            None => GridfallConfig::default(),
        };

        apply_overrides(&mut config, lookup)?;
        config.validate()?;

        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }

    fn load_from_file(path: &Path) -> Result<GridfallConfig, ConfigurationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Ok(toml::from_str(&content)?)
    }

    /// Save configuration as TOML
    pub fn save(&self, config: &GridfallConfig, path: &Path) -> Result<(), ConfigurationError> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string).map_err(|e| {
            ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path.display(), e))
        })
    }
}

fn apply_overrides<F>(config: &mut GridfallConfig, lookup: F) -> Result<(), ConfigurationError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("GRIDFALL_DEPOSIT_AMOUNT") {
        config.economics.deposit_amount = parse_var("GRIDFALL_DEPOSIT_AMOUNT", &value)?;
    }
    if let Some(value) = lookup("GRIDFALL_PROTOCOL_FEE_PERCENT") {
        config.economics.protocol_fee_percent = parse_var("GRIDFALL_PROTOCOL_FEE_PERCENT", &value)?;
    }
    if let Some(value) = lookup("GRIDFALL_EXIT_REFUND_PERCENT") {
        config.economics.exit_refund_percent = parse_var("GRIDFALL_EXIT_REFUND_PERCENT", &value)?;
    }
    if let Some(value) = lookup("GRIDFALL_REMAINDER_POLICY") {
        config.economics.remainder_policy = value
            .parse()
            .map_err(|reason: String| invalid("GRIDFALL_REMAINDER_POLICY", &reason))?;
    }
    if let Some(value) = lookup("GRIDFALL_LOG_LEVEL") {
        config.logging.level = value;
    }
    Ok(())
}

fn parse_var<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, ConfigurationError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(field, &format!("cannot parse '{value}'")))
}
