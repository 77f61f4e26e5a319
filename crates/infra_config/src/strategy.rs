//! Top-level strategy settings and their loader.

use std::path::Path;

use config::{Config, Environment, File, FileFormat, Map};
use pricer_models::calibration::CalibrationConfig;
use serde::{Deserialize, Serialize};
use strategy_signals::SignalConfig;
use tracing::debug;

use crate::error::ConfigError;

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "HESTON";
/// Separator between the prefix and nested keys in environment overrides.
pub const ENV_SEPARATOR: &str = "__";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Everything one strategy instance needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Traded underlying; one calibrator and signal engine per underlying.
    pub underlying: String,
    /// Default log filter for binaries.
    pub log_level: String,
    /// Calibrator, pricer and QC settings.
    pub calibration: CalibrationConfig,
    /// Signal engine settings.
    pub signals: SignalConfig,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            underlying: "SPY".to_string(),
            log_level: "info".to_string(),
            calibration: CalibrationConfig::default(),
            signals: SignalConfig::default(),
        }
    }
}

impl StrategyConfig {
    /// Defaults, then `path` (if given), then the process environment.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Load`] for unreadable or malformed sources, otherwise
    /// whatever [`StrategyConfig::validate`] reports.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::build(path, None)
    }

    /// As [`StrategyConfig::load`], reading overrides from `env` instead of
    /// the process environment.
    ///
    /// # Errors
    ///
    /// As [`StrategyConfig::load`].
    pub fn load_with_env(path: Option<&Path>, env: Map<String, String>) -> Result<Self, ConfigError> {
        Self::build(path, Some(env))
    }

    /// Defaults overlaid with a TOML document.
    ///
    /// # Errors
    ///
    /// As [`StrategyConfig::load`].
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section.
    ///
    /// # Errors
    ///
    /// The first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.underlying.trim().is_empty() {
            return Err(ConfigError::Invalid("underlying must not be empty".to_string()));
        }
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "log_level '{}' is not one of {:?}",
                self.log_level, LOG_LEVELS
            )));
        }
        self.calibration.validate()?;
        self.signals.validate()?;
        Ok(())
    }

    fn build(path: Option<&Path>, env: Option<Map<String, String>>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            debug!(path = %path.display(), "loading strategy config file");
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator(ENV_SEPARATOR)
                .try_parsing(true)
                .source(env),
        );
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = StrategyConfig::default();
        assert_eq!(config.underlying, "SPY");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(StrategyConfig::from_toml_str("").unwrap(), StrategyConfig::default());
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let err = StrategyConfig::from_toml_str("log_level = \"loud\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_section_errors_surface() {
        let err = StrategyConfig::from_toml_str("[signals]\npercentile = 120.0").unwrap_err();
        assert!(matches!(err, ConfigError::Signals(_)));

        let err = StrategyConfig::from_toml_str("[calibration]\nliquid_bias = -1.0").unwrap_err();
        assert!(matches!(err, ConfigError::Calibration(_)));
    }

    #[test]
    fn test_malformed_document() {
        let err = StrategyConfig::from_toml_str("[signals\npercentile = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }
}
