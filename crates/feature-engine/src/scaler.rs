//! Standard Scaling
//!
//! Per-feature `(x - mean) / std` fitted once over the training population.

use crate::error::FeatureError;
use crate::features::FeatureVector;
use crate::spec::{FeatureSpec, FeatureSpecVersion};
use crate::statistics::{FrozenStatistics, SummaryStatistics};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Relative standard deviation below which a feature counts as constant
const DEGENERATE_TOLERANCE: f64 = 1e-12;

/// Fitted scaler. Read-only after fitting.
///
/// Deserialization goes through the same parameter checks as [`FittedScaler::from_parts`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredScaler")]
pub struct FittedScaler {
    spec_version: FeatureSpecVersion,
    frozen: FrozenStatistics,
    feature_names: Vec<String>,
    means: Vec<f64>,
    std_devs: Vec<f64>,
}

/// Scaler parameters exactly as serialized
#[derive(Deserialize)]
struct StoredScaler {
    spec_version: FeatureSpecVersion,
    frozen: FrozenStatistics,
    feature_names: Vec<String>,
    means: Vec<f64>,
    std_devs: Vec<f64>,
}

impl TryFrom<StoredScaler> for FittedScaler {
    type Error = FeatureError;

    fn try_from(stored: StoredScaler) -> Result<Self, FeatureError> {
        let scaler = Self {
            spec_version: stored.spec_version,
            frozen: stored.frozen,
            feature_names: stored.feature_names,
            means: stored.means,
            std_devs: stored.std_devs,
        };
        scaler.check()?;
        Ok(scaler)
    }
}

impl FittedScaler {
    /// Fit per-feature mean and standard deviation
    pub fn fit(
        spec: &FeatureSpec,
        frozen: FrozenStatistics,
        vectors: &[FeatureVector],
    ) -> Result<Self, FeatureError> {
        if vectors.is_empty() {
            return Err(FeatureError::EmptyBatch);
        }
        for vector in vectors {
            check_vector(spec.version(), spec.len(), vector)?;
        }

        let mut means = Vec::with_capacity(spec.len());
        let mut std_devs = Vec::with_capacity(spec.len());
        for (idx, feature) in spec.features().iter().enumerate() {
            let column: Vec<f64> = vectors.iter().map(|v| v.values[idx]).collect();
            let stats = SummaryStatistics::compute(&column);
            if stats.std_dev <= DEGENERATE_TOLERANCE * stats.mean.abs().max(1.0) {
                return Err(FeatureError::DegenerateFeature {
                    feature: feature.name.to_string(),
                });
            }
            means.push(stats.mean);
            std_devs.push(stats.std_dev);
        }

        info!(
            spec = %spec.version(),
            samples = vectors.len(),
            features = spec.len(),
            "Scaler fitted"
        );

        Self::from_parts(spec, frozen, means, std_devs)
    }

    /// Assemble a scaler from stored parameters
    pub fn from_parts(
        spec: &FeatureSpec,
        frozen: FrozenStatistics,
        means: Vec<f64>,
        std_devs: Vec<f64>,
    ) -> Result<Self, FeatureError> {
        if frozen.spec_version != spec.version() {
            return Err(FeatureError::SpecVersionMismatch {
                expected: spec.version(),
                actual: frozen.spec_version,
            });
        }
        for len in [means.len(), std_devs.len()] {
            if len != spec.len() {
                return Err(FeatureError::DimensionMismatch {
                    expected: spec.len(),
                    actual: len,
                });
            }
        }
        let scaler = Self {
            spec_version: spec.version(),
            frozen,
            feature_names: spec.names().into_iter().map(String::from).collect(),
            means,
            std_devs,
        };
        scaler.check()?;
        Ok(scaler)
    }

    /// Internal consistency of the stored parameters
    fn check(&self) -> Result<(), FeatureError> {
        if self.frozen.spec_version != self.spec_version {
            return Err(FeatureError::SpecVersionMismatch {
                expected: self.spec_version,
                actual: self.frozen.spec_version,
            });
        }
        self.frozen.check()?;

        let expected = self.feature_names.len();
        for len in [self.means.len(), self.std_devs.len()] {
            if len != expected {
                return Err(FeatureError::DimensionMismatch {
                    expected,
                    actual: len,
                });
            }
        }
        if let Some(idx) = self.means.iter().position(|m| !m.is_finite()) {
            return Err(FeatureError::InvalidStatistic {
                name: "mean",
                value: self.means[idx],
            });
        }
        if let Some(idx) = self.std_devs.iter().position(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(FeatureError::DegenerateFeature {
                feature: self.feature_names[idx].clone(),
            });
        }
        Ok(())
    }

    /// Scale a vector in specification order
    pub fn transform(&self, vector: &FeatureVector) -> Result<FeatureVector, FeatureError> {
        check_vector(self.spec_version, self.feature_count(), vector)?;
        let values = vector
            .values
            .iter()
            .zip(self.means.iter().zip(&self.std_devs))
            .map(|(x, (mean, std))| (x - mean) / std)
            .collect();
        Ok(FeatureVector::new(self.spec_version, values))
    }

    pub fn spec_version(&self) -> FeatureSpecVersion {
        self.spec_version
    }

    /// Number of features the scaler was fitted on
    pub fn feature_count(&self) -> usize {
        self.means.len()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Training-time constants published with this scaler
    pub fn frozen(&self) -> &FrozenStatistics {
        &self.frozen
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn std_devs(&self) -> &[f64] {
        &self.std_devs
    }
}

fn check_vector(
    expected_version: FeatureSpecVersion,
    expected_len: usize,
    vector: &FeatureVector,
) -> Result<(), FeatureError> {
    if vector.spec_version != expected_version {
        return Err(FeatureError::SpecVersionMismatch {
            expected: expected_version,
            actual: vector.spec_version,
        });
    }
    if vector.len() != expected_len {
        return Err(FeatureError::DimensionMismatch {
            expected: expected_len,
            actual: vector.len(),
        });
    }
    Ok(())
}
