//! Imbalance Correction
//!
//! Training-only oversampling of the rare fraud class. Never part of the
//! scoring path.

mod smote;

pub use smote::{ImbalanceConfig, ImbalanceCorrector, Resampled, SkipReason};

use thiserror::Error;

/// Errors during resampling
#[derive(Debug, Error)]
pub enum ResampleError {
    #[error("{features} feature rows but {labels} labels")]
    LengthMismatch { features: usize, labels: usize },
}
