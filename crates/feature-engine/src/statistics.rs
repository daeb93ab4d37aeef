//! Population Statistics
//!
//! Summary statistics over training columns and the constants frozen into a
//! bundle at training time.

use crate::error::FeatureError;
use crate::population::HistoricalPopulation;
use crate::spec::{FeatureSpec, FeatureSpecVersion};
use data_validator::RawTransaction;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default quantile for the high-amount flag
pub const DEFAULT_HIGH_AMOUNT_QUANTILE: f64 = 0.95;

/// Summary statistics for one column
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryStatistics {
    /// Mean value
    pub mean: f64,
    /// Population standard deviation (ddof = 0)
    pub std_dev: f64,
    /// Minimum value
    pub min: f64,
    /// Maximum value
    pub max: f64,
}

impl SummaryStatistics {
    /// Compute summary statistics from a slice of values
    pub fn compute(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let min = values.iter().cloned().fold(f64::MAX, f64::min);
        let max = values.iter().cloned().fold(f64::MIN, f64::max);

        let m2: f64 = values.iter().map(|&v| (v - mean) * (v - mean)).sum();
        let std_dev = (m2 / n).sqrt();

        Self {
            mean,
            std_dev,
            min,
            max,
        }
    }
}

/// Quantile with linear interpolation between order statistics.
///
/// Returns `None` for an empty slice.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let q = q.clamp(0.0, 1.0);
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Median (mean of the two middle values for even lengths)
pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Training-time constants consumed by threshold and gap features.
///
/// Computed once over the historical batch and never recomputed per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrozenStatistics {
    /// Specification these constants were fitted for
    pub spec_version: FeatureSpecVersion,
    /// Quantile used for the high-amount threshold
    pub high_amount_quantile: f64,
    /// Amount strictly above which `Is High Amount` is 1
    pub high_amount_threshold: f64,
    /// Gap used for a sender's first observed transaction (seconds)
    pub median_gap_seconds: f64,
}

impl FrozenStatistics {
    /// Fit the frozen constants over a historical batch
    pub fn fit(
        spec: &FeatureSpec,
        transactions: &[RawTransaction],
        population: &HistoricalPopulation,
        high_amount_quantile: f64,
    ) -> Result<Self, FeatureError> {
        let amounts: Vec<f64> = transactions.iter().map(|tx| tx.amount()).collect();
        let high_amount_threshold =
            quantile(&amounts, high_amount_quantile).ok_or(FeatureError::EmptyBatch)?;

        let gaps: Vec<f64> = transactions
            .iter()
            .zip(population.contexts())
            .filter_map(|(tx, ctx)| ctx.gap_seconds(tx.timestamp()))
            .collect();
        // No sender repeats at all: nothing to take a median of.
        let median_gap_seconds = median(&gaps).unwrap_or(0.0);

        debug!(
            spec = %spec.version(),
            high_amount_threshold,
            median_gap_seconds,
            observed_gaps = gaps.len(),
            "Frozen statistics fitted"
        );

        let frozen = Self {
            spec_version: spec.version(),
            high_amount_quantile,
            high_amount_threshold,
            median_gap_seconds,
        };
        frozen.check()?;
        Ok(frozen)
    }

    /// Reject non-finite or out-of-range constants
    pub fn check(&self) -> Result<(), FeatureError> {
        let checks = [
            (
                "high_amount_quantile",
                self.high_amount_quantile,
                (0.0..=1.0).contains(&self.high_amount_quantile),
            ),
            (
                "high_amount_threshold",
                self.high_amount_threshold,
                self.high_amount_threshold.is_finite(),
            ),
            (
                "median_gap_seconds",
                self.median_gap_seconds,
                self.median_gap_seconds.is_finite() && self.median_gap_seconds >= 0.0,
            ),
        ];
        match checks.into_iter().find(|(_, _, ok)| !ok) {
            Some((name, value, _)) => Err(FeatureError::InvalidStatistic { name, value }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std_dev() {
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let stats = SummaryStatistics::compute(&values);
        assert!((stats.mean - 5.0).abs() < 1e-12);
        assert!((stats.std_dev - 2.0).abs() < 1e-12);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 9.0);
    }

    #[test]
    fn test_empty_values() {
        let stats = SummaryStatistics::compute(&[]);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn test_quantile_interpolates() {
        let values: Vec<f64> = (1..=100).map(f64::from).collect();
        // position 0.95 * 99 = 94.05 -> 95 + 0.05
        assert!((quantile(&values, 0.95).unwrap() - 95.05).abs() < 1e-9);
        assert_eq!(quantile(&values, 0.0), Some(1.0));
        assert_eq!(quantile(&values, 1.0), Some(100.0));
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }

    #[test]
    fn test_frozen_check_rejects_unusable_constants() {
        let frozen = FrozenStatistics {
            spec_version: FeatureSpec::current().version(),
            high_amount_quantile: 0.95,
            high_amount_threshold: 50_000.0,
            median_gap_seconds: 300.0,
        };
        assert!(frozen.check().is_ok());

        let nan_threshold = FrozenStatistics {
            high_amount_threshold: f64::NAN,
            ..frozen.clone()
        };
        assert!(matches!(
            nan_threshold.check(),
            Err(FeatureError::InvalidStatistic {
                name: "high_amount_threshold",
                ..
            })
        ));

        let negative_gap = FrozenStatistics {
            median_gap_seconds: -1.0,
            ..frozen
        };
        assert_eq!(
            negative_gap.check(),
            Err(FeatureError::InvalidStatistic {
                name: "median_gap_seconds",
                value: -1.0
            })
        );
    }
}
