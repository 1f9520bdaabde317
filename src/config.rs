//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - inspect.toml (default configuration)
//! - inspect.local.toml (git-ignored local overrides)
//! - Environment variables (DATAFLOW_INSPECT_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # inspect.toml
//! [instrument]
//! event_function = "debug_event"
//! join_event_function = "debug_event_join"
//!
//! [logging]
//! level = "debug"
//! format = "json"
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! DATAFLOW_INSPECT_LOGGING__LEVEL=trace
//! DATAFLOW_INSPECT_INSTRUMENT__WEIGHT_VAR=__w
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub instrument: InstrumentConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Names of the runtime entry points and ambient pseudo-variables that
/// instrumented rules refer to.
///
/// These must agree with the debugger runtime linked into the generated
/// program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// Single-input trace call: `(op_id, weight, timestamp, input, output)`
    #[serde(default = "default_event_function")]
    pub event_function: String,

    /// Two-input trace call used after joins
    #[serde(default = "default_join_event_function")]
    pub join_event_function: String,

    /// Splits a provenance-carrying group into provenance and original group
    #[serde(default = "default_split_group_function")]
    pub split_group_function: String,

    /// Pseudo-variable holding the weight of the record being derived
    #[serde(default = "default_weight_var")]
    pub weight_var: String,

    /// Pseudo-variable holding the logical timestamp of the derivation
    #[serde(default = "default_timestamp_var")]
    pub timestamp_var: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Append logs to this file instead of stderr
    #[serde(default)]
    pub file: Option<PathBuf>,
}

// Default value functions
fn default_event_function() -> String {
    "debug_event".to_string()
}
fn default_join_event_function() -> String {
    "debug_event_join".to_string()
}
fn default_split_group_function() -> String {
    "debug_split_group".to_string()
}
fn default_weight_var() -> String {
    "__weight".to_string()
}
fn default_timestamp_var() -> String {
    "__timestamp".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Merges in order:
    /// 1. inspect.toml (base configuration)
    /// 2. inspect.local.toml (local overrides, git-ignored)
    /// 3. Environment variables (DATAFLOW_INSPECT_* prefix)
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_in(Path::new("."))
    }

    /// Same as [`Config::load`], with both files looked up in `dir`
    pub fn load_in(dir: &Path) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(dir.join("inspect.toml")))
            .merge(Toml::file(dir.join("inspect.local.toml")))
            .merge(Env::prefixed("DATAFLOW_INSPECT_").split("__"))
            .extract()
    }

    /// Load configuration from specific file path
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("DATAFLOW_INSPECT_").split("__"))
            .extract()
    }
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        InstrumentConfig {
            event_function: default_event_function(),
            join_event_function: default_join_event_function(),
            split_group_function: default_split_group_function(),
            weight_var: default_weight_var(),
            timestamp_var: default_timestamp_var(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_instrument_config() {
        let config = Config::default();
        assert_eq!(config.instrument.event_function, "debug_event");
        assert_eq!(config.instrument.join_event_function, "debug_event_join");
        assert_eq!(config.instrument.split_group_function, "debug_split_group");
        assert_eq!(config.instrument.weight_var, "__weight");
        assert_eq!(config.instrument.timestamp_var, "__timestamp");
    }

    #[test]
    fn test_default_logging_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "text");
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();

        assert!(toml_str.contains("[instrument]"));
        assert!(toml_str.contains("[logging]"));
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let back: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(back.instrument, config.instrument);
        assert_eq!(back.logging.level, "info");
    }

    #[test]
    fn test_partial_section_uses_defaults() {
        let back: Config = toml::from_str("[instrument]\nweight_var = \"w\"\n").unwrap();
        assert_eq!(back.instrument.weight_var, "w");
        assert_eq!(back.instrument.event_function, "debug_event");
        assert_eq!(back.logging.format, "text");
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.instrument.timestamp_var, "__timestamp");
    }
}
