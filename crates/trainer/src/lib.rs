//! Fraud Model Training
//!
//! Batch pipeline from labeled historical transactions to a published
//! [`ArtifactBundle`](inference_engine::ArtifactBundle).

mod config;
mod evaluation;
mod pipeline;

pub use config::TrainingConfig;
pub use evaluation::EvaluationMetrics;
pub use pipeline::{Trainer, TrainingReport, TrainingRun};

use data_validator::ValidationError;
use feature_engine::FeatureError;
use inference_engine::{BundleMismatchError, ClassifierError};
use resampler::ResampleError;
use thiserror::Error;

/// Errors that abort a training run
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("Training batch is empty")]
    EmptyBatch,
    #[error("Invalid record at row {row}: {source}")]
    InvalidRecord {
        row: usize,
        #[source]
        source: ValidationError,
    },
    #[error("Feature error: {0}")]
    Feature(#[from] FeatureError),
    #[error("Resampling error: {0}")]
    Resample(#[from] ResampleError),
    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),
    #[error("Produced bundle is inconsistent: {0}")]
    Bundle(#[from] BundleMismatchError),
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
