//! Feature Errors

use crate::spec::FeatureSpecVersion;
use data_validator::ValidationError;
use thiserror::Error;

/// Errors while building or scaling feature vectors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    /// Raw record failed boundary validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Vector length disagrees with the fitted scaler
    #[error("feature vector has {actual} values, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Zero variance at fit time (would divide by zero)
    #[error("feature '{feature}' has zero variance in the training population")]
    DegenerateFeature { feature: String },

    /// Vector built against another specification
    #[error("feature vector built for spec {actual}, expected {expected}")]
    SpecVersionMismatch {
        expected: FeatureSpecVersion,
        actual: FeatureSpecVersion,
    },

    /// Nothing to fit on
    #[error("cannot fit on an empty batch")]
    EmptyBatch,

    /// Stored training-time constant is unusable
    #[error("frozen statistic '{name}' has invalid value {value}")]
    InvalidStatistic { name: &'static str, value: f64 },

    /// Name not present in the specification
    #[error("unknown feature '{0}'")]
    UnknownFeature(String),
}
