//! Training Configuration

use crate::TrainingError;
use config::{Config, Environment, File};
use feature_engine::DEFAULT_HIGH_AMOUNT_QUANTILE;
use inference_engine::{ForestConfig, DEFAULT_DECISION_THRESHOLD};
use resampler::ImbalanceConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Training run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Share of the batch held out for evaluation
    pub test_ratio: f64,
    /// Seed for the train/test shuffle
    pub seed: u64,
    /// Quantile of historical amounts above which a transaction is "high amount"
    pub high_amount_quantile: f64,
    /// Fraud probability at or above which a transaction is flagged
    pub decision_threshold: f64,
    /// Random forest hyperparameters
    pub forest: ForestConfig,
    /// Minority oversampling
    pub resampling: ImbalanceConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_ratio: 0.2,
            seed: 42,
            high_amount_quantile: DEFAULT_HIGH_AMOUNT_QUANTILE,
            decision_threshold: DEFAULT_DECISION_THRESHOLD,
            forest: ForestConfig::default(),
            resampling: ImbalanceConfig::default(),
        }
    }
}

impl TrainingConfig {
    /// Load from an optional TOML file, then `FRAUD_TRAIN__*` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, TrainingError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config: Self = builder
            .add_source(Environment::with_prefix("FRAUD_TRAIN").separator("__"))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), TrainingError> {
        if !(0.0..1.0).contains(&self.test_ratio) {
            return Err(TrainingError::InvalidConfig(format!(
                "test_ratio {} outside [0, 1)",
                self.test_ratio
            )));
        }
        if !(0.0..=1.0).contains(&self.high_amount_quantile) {
            return Err(TrainingError::InvalidConfig(format!(
                "high_amount_quantile {} outside [0, 1]",
                self.high_amount_quantile
            )));
        }
        if !(0.0..=1.0).contains(&self.decision_threshold) {
            return Err(TrainingError::InvalidConfig(format!(
                "decision_threshold {} outside [0, 1]",
                self.decision_threshold
            )));
        }
        if self.resampling.target_ratio <= 0.0 {
            return Err(TrainingError::InvalidConfig(
                "resampling.target_ratio must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = TrainingConfig::default();
        assert_eq!(config.test_ratio, 0.2);
        assert_eq!(config.seed, 42);
        assert_eq!(config.high_amount_quantile, 0.95);
        assert_eq!(config.forest.n_trees, 150);
        assert_eq!(config.forest.max_depth, 12);
        assert_eq!(config.forest.min_samples_split, 5);
        assert_eq!(config.resampling.k_neighbors, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "test_ratio = 0.25\n\n[forest]\nn_trees = 20").unwrap();

        let config = TrainingConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.test_ratio, 0.25);
        assert_eq!(config.forest.n_trees, 20);
        assert_eq!(config.forest.max_depth, 12);
        assert_eq!(config.resampling.target_ratio, 1.0);
    }

    #[test]
    fn test_rejects_out_of_range_ratio() {
        let config = TrainingConfig {
            test_ratio: 1.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(TrainingError::InvalidConfig(_))));
    }
}
