//! SMOTE Oversampling
//!
//! Synthesizes minority-class samples on the segment between a minority sample
//! and one of its nearest same-class neighbours.

use crate::ResampleError;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Oversampling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImbalanceConfig {
    /// Nearest same-class neighbours to interpolate towards
    pub k_neighbors: usize,
    /// Target minority/majority ratio after correction (1.0 = balanced)
    pub target_ratio: f64,
    /// Random seed for reproducibility
    pub seed: u64,
}

impl Default for ImbalanceConfig {
    fn default() -> Self {
        Self {
            k_neighbors: 5,
            target_ratio: 1.0,
            seed: 42,
        }
    }
}

/// Why correction left the data untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Only one class present
    SingleClass,
    /// Fewer than two minority samples, so no neighbour exists
    TooFewMinority { count: usize },
    /// Minority already at or above the target ratio
    AlreadyBalanced,
}

/// Output of a correction pass
#[derive(Debug, Clone)]
pub struct Resampled {
    /// Original samples followed by synthesized ones
    pub features: Vec<Vec<f64>>,
    /// Labels aligned with `features`
    pub labels: Vec<bool>,
    /// Number of synthesized samples appended
    pub synthesized: usize,
    /// Set when the input was returned unmodified
    pub skipped: Option<SkipReason>,
}

impl Resampled {
    fn unchanged(features: &[Vec<f64>], labels: &[bool], reason: SkipReason) -> Self {
        Self {
            features: features.to_vec(),
            labels: labels.to_vec(),
            synthesized: 0,
            skipped: Some(reason),
        }
    }

    /// Count of samples carrying the given label
    pub fn count(&self, label: bool) -> usize {
        self.labels.iter().filter(|&&l| l == label).count()
    }
}

/// Training-only minority oversampler
#[derive(Debug, Clone, Default)]
pub struct ImbalanceCorrector {
    config: ImbalanceConfig,
}

impl ImbalanceCorrector {
    pub fn new(config: ImbalanceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ImbalanceConfig {
        &self.config
    }

    /// Oversample the minority class up to the target ratio.
    ///
    /// Small or single-class inputs come back unmodified with a [`SkipReason`];
    /// only mismatched input lengths are an error.
    pub fn resample(
        &self,
        features: &[Vec<f64>],
        labels: &[bool],
    ) -> Result<Resampled, ResampleError> {
        if features.len() != labels.len() {
            return Err(ResampleError::LengthMismatch {
                features: features.len(),
                labels: labels.len(),
            });
        }

        let positives = labels.iter().filter(|&&l| l).count();
        let negatives = labels.len() - positives;
        if positives == 0 || negatives == 0 {
            warn!(samples = labels.len(), "Single class present, skipping oversampling");
            return Ok(Resampled::unchanged(features, labels, SkipReason::SingleClass));
        }

        let minority_label = positives < negatives;
        let (n_minority, n_majority) = if minority_label {
            (positives, negatives)
        } else {
            (negatives, positives)
        };

        let target = (self.config.target_ratio * n_majority as f64).round() as usize;
        if n_minority >= target {
            return Ok(Resampled::unchanged(features, labels, SkipReason::AlreadyBalanced));
        }
        if n_minority < 2 {
            warn!(
                minority = n_minority,
                "Too few minority samples to find neighbours, skipping oversampling"
            );
            return Ok(Resampled::unchanged(
                features,
                labels,
                SkipReason::TooFewMinority { count: n_minority },
            ));
        }

        let minority: Vec<&[f64]> = features
            .iter()
            .zip(labels)
            .filter(|(_, &l)| l == minority_label)
            .map(|(f, _)| f.as_slice())
            .collect();
        let k = self.config.k_neighbors.clamp(1, n_minority - 1);
        let neighbours = nearest_neighbours(&minority, k);

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let to_generate = target - n_minority;
        let mut out_features = features.to_vec();
        let mut out_labels = labels.to_vec();
        out_features.reserve(to_generate);
        out_labels.reserve(to_generate);

        for _ in 0..to_generate {
            let i = rng.gen_range(0..n_minority);
            let j = neighbours[i][rng.gen_range(0..k)];
            let gap: f64 = rng.gen();
            out_features.push(interpolate(minority[i], minority[j], gap));
            out_labels.push(minority_label);
        }

        info!(
            minority = n_minority,
            majority = n_majority,
            synthesized = to_generate,
            k_neighbors = k,
            "Minority class oversampled"
        );

        Ok(Resampled {
            features: out_features,
            labels: out_labels,
            synthesized: to_generate,
            skipped: None,
        })
    }
}

/// Indices of the `k` nearest other samples, ties broken by index
fn nearest_neighbours(samples: &[&[f64]], k: usize) -> Vec<Vec<usize>> {
    samples
        .iter()
        .enumerate()
        .map(|(i, a)| {
            let mut distances: Vec<(f64, usize)> = samples
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(j, b)| (squared_distance(a, b), j))
                .collect();
            distances.sort_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)));
            distances.into_iter().take(k).map(|(_, j)| j).collect()
        })
        .collect()
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Point at `gap` along the segment from `a` to `b`, kept inside the segment's box
fn interpolate(a: &[f64], b: &[f64], gap: f64) -> Vec<f64> {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| (x + gap * (y - x)).clamp(x.min(y), x.max(y)))
        .collect()
}
