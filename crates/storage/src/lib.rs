//! Storage Layer
//!
//! Versioned on-disk artifact bundles and labeled historical transaction batches.

mod bundle_store;
pub mod history;

pub use bundle_store::{BundleStore, BUNDLE_FORMAT_VERSION};
pub use history::{read_labeled_csv, read_labeled_csvs, LabeledRecord};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Serialization error: {0}")]
    Serialization(#[from] postcard::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Row {row}: invalid fraud label {value:?}")]
    InvalidLabel { row: usize, value: String },
    #[error("Unsupported bundle format version {found} (expected {expected})")]
    UnsupportedFormat { found: u16, expected: u16 },
    #[error("Bundle training time {millis} ms is out of range")]
    InvalidTimestamp { millis: i64 },
}

impl StorageError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
