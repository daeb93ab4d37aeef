//! Service Configuration

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Log output format
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Scoring service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Socket address to listen on
    pub bind_addr: String,
    /// Artifact bundle file
    pub bundle_path: PathBuf,
    /// Labeled CSV history used to seed the running aggregate
    pub history_paths: Vec<PathBuf>,
    /// Expose `/metrics`
    pub metrics_enabled: bool,
    pub logging: LoggingConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            bundle_path: PathBuf::from("model/bundle.bin"),
            history_paths: Vec::new(),
            metrics_enabled: true,
            logging: LoggingConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load from an optional TOML file, then `FRAUD_API__*` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder
            .add_source(Environment::with_prefix("FRAUD_API").separator("__"))
            .build()?
            .try_deserialize()
    }
}
