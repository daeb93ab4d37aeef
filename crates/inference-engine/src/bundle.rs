//! Artifact Bundles
//!
//! A fitted scaler and a trained classifier published together under one
//! feature specification version. Only a [`ValidatedBundle`] can score.

use crate::classifier::{Classifier, TrainedClassifier};
use crate::BundleMismatchError;
use chrono::{DateTime, Utc};
use feature_engine::{FeatureBuilder, FeatureSpec, FeatureSpecVersion, FittedScaler};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

/// Unvalidated (scaler, classifier) pair as produced by training or loaded from disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactBundle {
    pub bundle_id: Uuid,
    pub trained_at: DateTime<Utc>,
    pub spec_version: FeatureSpecVersion,
    pub scaler: FittedScaler,
    pub classifier: TrainedClassifier,
}

impl ArtifactBundle {
    /// Package a freshly trained pair under a new bundle id
    pub fn new(
        spec_version: FeatureSpecVersion,
        scaler: FittedScaler,
        classifier: TrainedClassifier,
    ) -> Self {
        Self {
            bundle_id: Uuid::new_v4(),
            trained_at: Utc::now(),
            spec_version,
            scaler,
            classifier,
        }
    }

    /// Check the bundle against the registered specification of its declared version
    pub fn validate_registered(self) -> Result<ValidatedBundle, BundleMismatchError> {
        let spec = FeatureSpec::by_version(self.spec_version)
            .ok_or(BundleMismatchError::UnknownSpec(self.spec_version))?;
        self.validate(spec)
    }

    /// Check version and feature-count agreement with `spec`
    pub fn validate(self, spec: &'static FeatureSpec) -> Result<ValidatedBundle, BundleMismatchError> {
        if let Err(err) = self.check(spec) {
            warn!(bundle_id = %self.bundle_id, error = %err, "Bundle rejected");
            return Err(err);
        }

        let builder = FeatureBuilder::new(spec, self.scaler.frozen().clone())?;
        info!(
            bundle_id = %self.bundle_id,
            spec = %spec.version(),
            model = self.classifier.model().kind(),
            "Bundle validated"
        );
        Ok(ValidatedBundle {
            bundle: self,
            builder,
        })
    }

    fn check(&self, spec: &FeatureSpec) -> Result<(), BundleMismatchError> {
        let expected = spec.version();
        for (component, actual) in [
            ("bundle", self.spec_version),
            ("scaler", self.scaler.spec_version()),
            ("classifier", self.classifier.spec_version()),
        ] {
            if actual != expected {
                return Err(BundleMismatchError::SpecVersion {
                    component,
                    expected,
                    actual,
                });
            }
        }

        for (component, actual) in [
            ("scaler", self.scaler.feature_count()),
            ("scaler deviations", self.scaler.std_devs().len()),
            ("classifier", self.classifier.feature_count()),
            ("classifier model", self.classifier.model().feature_count()),
        ] {
            if actual != spec.len() {
                return Err(BundleMismatchError::FeatureCount {
                    component,
                    spec: expected,
                    expected: spec.len(),
                    actual,
                });
            }
        }

        let names = spec.names();
        if self.scaler.feature_names().iter().map(String::as_str).ne(names.iter().copied()) {
            return Err(BundleMismatchError::FeatureNames(
                self.scaler.feature_names().to_vec(),
            ));
        }
        self.scaler.frozen().check()?;
        Ok(())
    }
}

/// Bundle whose components are known to agree with its specification
#[derive(Debug, Clone)]
pub struct ValidatedBundle {
    bundle: ArtifactBundle,
    builder: FeatureBuilder,
}

impl ValidatedBundle {
    pub fn bundle_id(&self) -> Uuid {
        self.bundle.bundle_id
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.bundle.trained_at
    }

    pub fn spec_version(&self) -> FeatureSpecVersion {
        self.bundle.spec_version
    }

    pub fn spec(&self) -> &'static FeatureSpec {
        self.builder.spec()
    }

    pub fn scaler(&self) -> &FittedScaler {
        &self.bundle.scaler
    }

    pub fn classifier(&self) -> &TrainedClassifier {
        &self.bundle.classifier
    }

    /// Feature builder carrying the bundle's frozen statistics
    pub fn builder(&self) -> &FeatureBuilder {
        &self.builder
    }

    /// Underlying bundle, e.g. for persistence
    pub fn bundle(&self) -> &ArtifactBundle {
        &self.bundle
    }

    pub fn into_inner(self) -> ArtifactBundle {
        self.bundle
    }
}
