//! File plus environment layering.

use std::io::Write;

use approx::assert_relative_eq;
use config::Map;
use infra_config::{ConfigError, StrategyConfig};

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn env(pairs: &[(&str, &str)]) -> Map<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

const FILE: &str = r#"
underlying = "IWM"

[calibration]
liquid_bias = 1.0
time_budget_secs = 2.5

[calibration.qc]
max_arbitrage_violations = 3

[calibration.bounds.kappa]
min = 1.0
max = 4.0

[signals]
process_noise = 0.05
min_samples = 50

[signals.gate]
session_open = "09:30:00"
session_close = "16:00:00"
block_minutes = 30
"#;

#[test]
fn file_values_override_defaults() {
    let file = write_config(FILE);
    let config = StrategyConfig::load_with_env(Some(file.path()), Map::new()).unwrap();

    assert_eq!(config.underlying, "IWM");
    assert_eq!(config.calibration.liquid_bias, 1.0);
    assert_eq!(config.calibration.time_budget_secs, Some(2.5));
    assert_eq!(config.calibration.qc.max_arbitrage_violations, 3);
    assert_eq!(config.calibration.bounds.kappa.min, 1.0);
    assert_eq!(config.calibration.bounds.kappa.max, 4.0);
    assert_relative_eq!(config.signals.process_noise, 0.05);
    assert_eq!(config.signals.min_samples, 50);
    assert_eq!(config.signals.gate.block_minutes, 30);

    // untouched
    assert_eq!(config.calibration.qc.local_rmse_multiplier, 1.25);
    assert_eq!(config.signals.percentile, 98.0);
}

#[test]
fn environment_overrides_file() {
    let file = write_config(FILE);
    let overrides = env(&[
        ("HESTON__UNDERLYING", "SPX"),
        ("HESTON__SIGNALS__PERCENTILE", "95"),
        ("HESTON__SIGNALS__MIN_SAMPLES", "75"),
        ("HESTON__CALIBRATION__ALPHA0", "0.5"),
    ]);
    let config = StrategyConfig::load_with_env(Some(file.path()), overrides).unwrap();

    assert_eq!(config.underlying, "SPX");
    assert_eq!(config.signals.percentile, 95.0);
    assert_eq!(config.signals.min_samples, 75);
    assert_eq!(config.calibration.alpha0, 0.5);
    assert_eq!(config.calibration.liquid_bias, 1.0);
}

#[test]
fn environment_alone_is_enough() {
    let config = StrategyConfig::load_with_env(None, env(&[("HESTON__LOG_LEVEL", "debug")])).unwrap();
    assert_eq!(config.log_level, "debug");
    assert_eq!(config.calibration, StrategyConfig::default().calibration);
}

#[test]
fn invalid_override_is_rejected() {
    let err = StrategyConfig::load_with_env(None, env(&[("HESTON__SIGNALS__PERCENTILE", "150")])).unwrap_err();
    assert!(matches!(err, ConfigError::Signals(_)), "{err}");
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let err = StrategyConfig::load_with_env(Some(&path), Map::new()).unwrap_err();
    assert!(matches!(err, ConfigError::Load(_)));
}

#[test]
fn unusable_differential_evolution_is_rejected() {
    let file = write_config(
        r#"
[calibration.differential_evolution]
mutation = [1.5, 0.5]
"#,
    );
    let err = StrategyConfig::load_with_env(Some(file.path()), Map::new()).unwrap_err();
    assert!(matches!(err, ConfigError::Calibration(_)), "{err}");

    let overrides = env(&[("HESTON__CALIBRATION__DIFFERENTIAL_EVOLUTION__CROSSOVER_PROBABILITY", "1.5")]);
    let err = StrategyConfig::load_with_env(None, overrides).unwrap_err();
    assert!(matches!(err, ConfigError::Calibration(_)), "{err}");
}
