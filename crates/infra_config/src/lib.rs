//! # infra_config: Strategy Configuration
//!
//! Loads [`StrategyConfig`] from, in increasing priority:
//!
//! 1. built-in defaults
//! 2. an optional TOML file
//! 3. environment variables prefixed `HESTON__`, with `__` separating
//!    nested keys (`HESTON__SIGNALS__PERCENTILE=95`)
//!
//! and validates the result before handing it out.
//!
//! ```rust
//! use infra_config::StrategyConfig;
//!
//! let config = StrategyConfig::from_toml_str(
//!     r#"
//!     underlying = "QQQ"
//!
//!     [calibration]
//!     liquid_bias = 2.0
//!
//!     [signals]
//!     percentile = 95.0
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(config.underlying, "QQQ");
//! assert_eq!(config.calibration.liquid_bias, 2.0);
//! assert_eq!(config.signals.percentile, 95.0);
//! // untouched keys keep their defaults
//! assert_eq!(config.signals.min_samples, 100);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

mod error;
mod strategy;

pub use error::ConfigError;
pub use strategy::{StrategyConfig, ENV_PREFIX, ENV_SEPARATOR};
