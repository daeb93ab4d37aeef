//! Bundle Store
//!
//! One bundle per file: a postcard envelope holding the version tag and the
//! serialized scaler and classifier blobs. Writes go through a temporary file and
//! a rename so a reader never sees a partially written bundle.

use crate::StorageError;
use chrono::{DateTime, Utc};
use feature_engine::{FeatureSpecVersion, FittedScaler};
use inference_engine::{ArtifactBundle, TrainedClassifier};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// Current envelope layout
pub const BUNDLE_FORMAT_VERSION: u16 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct BundleEnvelope {
    format_version: u16,
    spec_version: FeatureSpecVersion,
    bundle_id: Uuid,
    trained_at_ms: i64,
    scaler: Vec<u8>,
    classifier: Vec<u8>,
}

/// File-backed bundle persistence
#[derive(Debug, Clone)]
pub struct BundleStore {
    path: PathBuf,
}

impl BundleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist a bundle, replacing any previous one
    pub fn save(&self, bundle: &ArtifactBundle) -> Result<(), StorageError> {
        let envelope = BundleEnvelope {
            format_version: BUNDLE_FORMAT_VERSION,
            spec_version: bundle.spec_version,
            bundle_id: bundle.bundle_id,
            trained_at_ms: bundle.trained_at.timestamp_millis(),
            scaler: postcard::to_allocvec(&bundle.scaler)?,
            classifier: postcard::to_allocvec(&bundle.classifier)?,
        };
        let bytes = postcard::to_allocvec(&envelope)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &bytes).map_err(|e| StorageError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| StorageError::io(&self.path, e))?;

        info!(
            path = %self.path.display(),
            bundle_id = %bundle.bundle_id,
            spec = %bundle.spec_version,
            bytes = bytes.len(),
            "Bundle saved"
        );
        Ok(())
    }

    /// Read the stored bundle. The result still has to be validated before scoring.
    pub fn load(&self) -> Result<ArtifactBundle, StorageError> {
        let bytes = fs::read(&self.path).map_err(|e| StorageError::io(&self.path, e))?;
        let envelope: BundleEnvelope = postcard::from_bytes(&bytes)?;
        if envelope.format_version != BUNDLE_FORMAT_VERSION {
            return Err(StorageError::UnsupportedFormat {
                found: envelope.format_version,
                expected: BUNDLE_FORMAT_VERSION,
            });
        }

        let trained_at = DateTime::<Utc>::from_timestamp_millis(envelope.trained_at_ms).ok_or(
            StorageError::InvalidTimestamp {
                millis: envelope.trained_at_ms,
            },
        )?;
        // Both components re-run their parameter checks while deserializing
        let scaler: FittedScaler = postcard::from_bytes(&envelope.scaler)?;
        let classifier: TrainedClassifier = postcard::from_bytes(&envelope.classifier)?;
        debug!(
            path = %self.path.display(),
            bundle_id = %envelope.bundle_id,
            "Bundle loaded"
        );

        Ok(ArtifactBundle {
            bundle_id: envelope.bundle_id,
            trained_at,
            spec_version: envelope.spec_version,
            scaler,
            classifier,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feature_engine::{FeatureSpec, FeatureVector, FrozenStatistics};
    use inference_engine::{ClassifierModel, ThresholdRule};

    fn bundle() -> ArtifactBundle {
        let spec = FeatureSpec::current();
        let frozen = FrozenStatistics {
            spec_version: spec.version(),
            high_amount_quantile: 0.95,
            high_amount_threshold: 9_000.0,
            median_gap_seconds: 45.0,
        };
        let vectors: Vec<FeatureVector> = (0..8)
            .map(|i| {
                let x = i as f64;
                FeatureVector::new(
                    spec.version(),
                    vec![x, x * 3.0, x + 2.0, x * x, (i % 2) as f64, (i % 4 == 0) as u8 as f64],
                )
            })
            .collect();
        let scaler = FittedScaler::fit(spec, frozen, &vectors).unwrap();
        let rule = ThresholdRule::new(spec.len(), 0, 0.0).unwrap();
        let classifier =
            TrainedClassifier::new(spec.version(), 0.5, ClassifierModel::ThresholdRule(rule)).unwrap();
        ArtifactBundle::new(spec.version(), scaler, classifier)
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = BundleStore::new(dir.path().join("models").join("bundle.bin"));
        let original = bundle();

        store.save(&original).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded.bundle_id, original.bundle_id);
        assert_eq!(loaded.scaler, original.scaler);
        assert_eq!(loaded.classifier, original.classifier);
        assert_eq!(
            loaded.trained_at.timestamp_millis(),
            original.trained_at.timestamp_millis()
        );
        assert!(!store.path().with_extension("tmp").exists());
        assert!(loaded.validate_registered().is_ok());
    }

    #[test]
    fn test_save_replaces_previous_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let store = BundleStore::new(dir.path().join("bundle.bin"));
        store.save(&bundle()).unwrap();
        let second = bundle();
        store.save(&second).unwrap();
        assert_eq!(store.load().unwrap().bundle_id, second.bundle_id);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = BundleStore::new(dir.path().join("absent.bin"));
        assert!(matches!(store.load(), Err(StorageError::Io { .. })));
    }

    #[test]
    fn test_unsupported_format_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.bin");
        let envelope = BundleEnvelope {
            format_version: 99,
            spec_version: FeatureSpecVersion(1),
            bundle_id: Uuid::new_v4(),
            trained_at_ms: 0,
            scaler: Vec::new(),
            classifier: Vec::new(),
        };
        fs::write(&path, postcard::to_allocvec(&envelope).unwrap()).unwrap();

        assert!(matches!(
            BundleStore::new(&path).load(),
            Err(StorageError::UnsupportedFormat { found: 99, expected: 1 })
        ));
    }

    /// Same field layout as a serialized `FittedScaler`, without its checks
    #[derive(Serialize)]
    struct UncheckedScaler<'a> {
        spec_version: FeatureSpecVersion,
        frozen: &'a FrozenStatistics,
        feature_names: &'a [String],
        means: &'a [f64],
        std_devs: Vec<f64>,
    }

    fn write_envelope(path: &Path, bundle: &ArtifactBundle, scaler: Vec<u8>, trained_at_ms: i64) {
        let envelope = BundleEnvelope {
            format_version: BUNDLE_FORMAT_VERSION,
            spec_version: bundle.spec_version,
            bundle_id: bundle.bundle_id,
            trained_at_ms,
            scaler,
            classifier: postcard::to_allocvec(&bundle.classifier).unwrap(),
        };
        fs::write(path, postcard::to_allocvec(&envelope).unwrap()).unwrap();
    }

    fn unchecked_scaler(bundle: &ArtifactBundle, std_devs: Vec<f64>) -> Vec<u8> {
        let scaler = &bundle.scaler;
        postcard::to_allocvec(&UncheckedScaler {
            spec_version: scaler.spec_version(),
            frozen: scaler.frozen(),
            feature_names: scaler.feature_names(),
            means: scaler.means(),
            std_devs,
        })
        .unwrap()
    }

    #[test]
    fn test_stored_scaler_layout_matches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.bin");
        let original = bundle();
        let std_devs = original.scaler.std_devs().to_vec();
        write_envelope(&path, &original, unchecked_scaler(&original, std_devs), 0);

        let loaded = BundleStore::new(&path).load().unwrap();
        assert_eq!(loaded.scaler, original.scaler);
    }

    #[test]
    fn test_zero_deviation_scaler_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.bin");
        let original = bundle();
        let mut std_devs = original.scaler.std_devs().to_vec();
        std_devs[5] = 0.0;
        write_envelope(&path, &original, unchecked_scaler(&original, std_devs), 0);

        assert!(matches!(
            BundleStore::new(&path).load(),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn test_short_scaler_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.bin");
        let original = bundle();
        let std_devs = original.scaler.std_devs()[..5].to_vec();
        write_envelope(&path, &original, unchecked_scaler(&original, std_devs), 0);

        assert!(matches!(
            BundleStore::new(&path).load(),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn test_out_of_range_training_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.bin");
        let original = bundle();
        let scaler = postcard::to_allocvec(&original.scaler).unwrap();
        write_envelope(&path, &original, scaler, i64::MAX);

        assert!(matches!(
            BundleStore::new(&path).load(),
            Err(StorageError::InvalidTimestamp { millis: i64::MAX })
        ));
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.bin");
        fs::write(&path, [0xff, 0xff, 0xff]).unwrap();
        assert!(matches!(
            BundleStore::new(&path).load(),
            Err(StorageError::Serialization(_))
        ));
    }
}
