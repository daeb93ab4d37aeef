//! Fraud Inference Engine
//!
//! Classifier models, version-checked artifact bundles and the online scoring
//! path that rebuilds training features for a single transaction.

mod bundle;
mod classifier;
mod engine;
mod forest;
mod handle;

pub use bundle::{ArtifactBundle, ValidatedBundle};
pub use classifier::{
    Classifier, ClassifierModel, ThresholdRule, TrainedClassifier, DEFAULT_DECISION_THRESHOLD,
};
pub use engine::{score, ScoreOutcome, Scorer};
pub use forest::{ForestConfig, RandomForest, TreeNode};
pub use handle::BundleHandle;

use data_validator::ValidationError;
use feature_engine::{FeatureError, FeatureSpecVersion};
use thiserror::Error;

/// Errors while fitting or evaluating a classifier
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClassifierError {
    #[error("Training set is empty")]
    EmptyTrainingSet,
    #[error("{rows} feature rows but {labels} labels")]
    LengthMismatch { rows: usize, labels: usize },
    #[error("Row {row} has {actual} features, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Invalid classifier configuration: {0}")]
    InvalidConfig(String),
    #[error("Classifier expects {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("Stored model is unusable: {0}")]
    InvalidModel(String),
}

/// Bundle components disagree with each other or with the feature specification
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BundleMismatchError {
    #[error("No feature specification is registered for {0}")]
    UnknownSpec(FeatureSpecVersion),
    #[error("{component} was built for {actual}, bundle declares {expected}")]
    SpecVersion {
        component: &'static str,
        expected: FeatureSpecVersion,
        actual: FeatureSpecVersion,
    },
    #[error("{component} declares {actual} features, specification {spec} has {expected}")]
    FeatureCount {
        component: &'static str,
        spec: FeatureSpecVersion,
        expected: usize,
        actual: usize,
    },
    #[error("Scaler feature names do not match specification: {0:?}")]
    FeatureNames(Vec<String>),
    #[error("Invalid frozen statistics: {0}")]
    FrozenStatistics(#[from] FeatureError),
}

/// Errors on the scoring path
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error(transparent)]
    Feature(#[from] FeatureError),
    #[error(transparent)]
    Bundle(#[from] BundleMismatchError),
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}

impl From<ValidationError> for ScoringError {
    fn from(err: ValidationError) -> Self {
        ScoringError::Feature(FeatureError::Validation(err))
    }
}

impl ScoringError {
    /// Validation details when the request itself was at fault
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            ScoringError::Feature(FeatureError::Validation(err)) => Some(err),
            _ => None,
        }
    }
}
