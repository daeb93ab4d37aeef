//! Training Pipeline
//!
//! validate → population → frozen statistics → features → scaler → split →
//! oversample (training split only) → forest → hold-out evaluation → bundle.

use crate::config::TrainingConfig;
use crate::evaluation::EvaluationMetrics;
use crate::TrainingError;
use data_validator::{RawTransaction, Validator};
use feature_engine::{
    FeatureBuilder, FeatureSpec, FeatureSpecVersion, FeatureVector, FittedScaler,
    FrozenStatistics, HistoricalPopulation,
};
use inference_engine::{ArtifactBundle, ClassifierModel, RandomForest, TrainedClassifier};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use resampler::{ImbalanceCorrector, SkipReason};
use serde::Serialize;
use std::time::Instant;
use storage::LabeledRecord;
use tracing::{info, warn};

/// Summary of one training run. Informational only; it never gates publication.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub bundle_id: String,
    pub spec_version: FeatureSpecVersion,
    pub samples: usize,
    pub fraud_samples: usize,
    pub train_samples: usize,
    pub test_samples: usize,
    /// Synthetic minority samples added to the training split
    pub synthesized: usize,
    /// Set when oversampling was skipped
    pub correction_skipped: Option<SkipReason>,
    pub frozen: FrozenStatistics,
    /// Hold-out metrics, absent when the test split is empty
    pub metrics: Option<EvaluationMetrics>,
    pub duration_ms: u64,
}

/// Output of a successful run
#[derive(Debug, Clone)]
pub struct TrainingRun {
    pub bundle: ArtifactBundle,
    pub report: TrainingReport,
}

/// Offline trainer for one feature specification
#[derive(Debug, Clone)]
pub struct Trainer {
    spec: &'static FeatureSpec,
    config: TrainingConfig,
    validator: Validator,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self::with_spec(FeatureSpec::current(), config)
    }

    pub fn with_spec(spec: &'static FeatureSpec, config: TrainingConfig) -> Self {
        Self {
            spec,
            config,
            validator: Validator::default(),
        }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Run the full pipeline over a labeled batch
    pub fn train(&self, batch: &[LabeledRecord]) -> Result<TrainingRun, TrainingError> {
        let start = Instant::now();
        self.config.validate()?;
        if batch.is_empty() {
            return Err(TrainingError::EmptyBatch);
        }

        let transactions = self.validate_batch(batch)?;
        let labels: Vec<bool> = batch.iter().map(|r| r.is_fraud).collect();
        let fraud_samples = labels.iter().filter(|&&l| l).count();
        info!(
            samples = transactions.len(),
            fraud = fraud_samples,
            spec = %self.spec.version(),
            "Training batch validated"
        );

        let population = HistoricalPopulation::from_batch(&transactions);
        let frozen = FrozenStatistics::fit(
            self.spec,
            &transactions,
            &population,
            self.config.high_amount_quantile,
        )?;
        let builder = FeatureBuilder::new(self.spec, frozen.clone())?
            .with_validator(self.validator.clone());
        let vectors = builder.build_batch(&transactions, &population)?;
        let scaler = FittedScaler::fit(self.spec, frozen.clone(), &vectors)?;
        let scaled = scale_all(&scaler, &vectors)?;

        let (train_idx, test_idx) = self.split(scaled.len());
        let train_x: Vec<Vec<f64>> = train_idx.iter().map(|&i| scaled[i].clone()).collect();
        let train_y: Vec<bool> = train_idx.iter().map(|&i| labels[i]).collect();

        let corrector = ImbalanceCorrector::new(self.config.resampling.clone());
        let resampled = corrector.resample(&train_x, &train_y)?;
        if let Some(reason) = resampled.skipped {
            warn!(?reason, "Imbalance correction skipped");
        }

        let forest = RandomForest::fit(
            self.config.forest.clone(),
            &resampled.features,
            &resampled.labels,
        )?;
        let classifier = TrainedClassifier::new(
            self.spec.version(),
            self.config.decision_threshold,
            ClassifierModel::RandomForest(forest),
        )?;

        let metrics = if test_idx.is_empty() {
            None
        } else {
            let mut predicted = Vec::with_capacity(test_idx.len());
            for &i in &test_idx {
                let vector = FeatureVector::new(self.spec.version(), scaled[i].clone());
                predicted.push(classifier.predict(&vector)?.0);
            }
            let actual: Vec<bool> = test_idx.iter().map(|&i| labels[i]).collect();
            Some(EvaluationMetrics::compute(&predicted, &actual))
        };

        let bundle = ArtifactBundle::new(self.spec.version(), scaler, classifier);
        // The pair must be publishable as produced
        let bundle = bundle.validate(self.spec)?.into_inner();

        let report = TrainingReport {
            bundle_id: bundle.bundle_id.to_string(),
            spec_version: self.spec.version(),
            samples: transactions.len(),
            fraud_samples,
            train_samples: train_idx.len(),
            test_samples: test_idx.len(),
            synthesized: resampled.synthesized,
            correction_skipped: resampled.skipped,
            frozen,
            metrics,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        match &report.metrics {
            Some(m) => info!(
                bundle_id = %report.bundle_id,
                accuracy = m.accuracy,
                precision = m.precision,
                recall = m.recall,
                f1 = m.f1,
                "Training complete"
            ),
            None => info!(bundle_id = %report.bundle_id, "Training complete without hold-out set"),
        }

        Ok(TrainingRun { bundle, report })
    }

    fn validate_batch(&self, batch: &[LabeledRecord]) -> Result<Vec<RawTransaction>, TrainingError> {
        batch
            .iter()
            .map(|labeled| {
                self.validator
                    .validate(&labeled.record)
                    .map_err(|source| TrainingError::InvalidRecord {
                        row: labeled.row,
                        source,
                    })
            })
            .collect()
    }

    /// Shuffled train/test index split; the training side is never empty
    fn split(&self, n: usize) -> (Vec<usize>, Vec<usize>) {
        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        indices.shuffle(&mut rng);

        let test_len = ((n as f64) * self.config.test_ratio).round() as usize;
        let test_len = test_len.min(n.saturating_sub(1));
        let train = indices.split_off(test_len);
        (train, indices)
    }
}

fn scale_all(scaler: &FittedScaler, vectors: &[FeatureVector]) -> Result<Vec<Vec<f64>>, TrainingError> {
    vectors
        .iter()
        .map(|v| {
            scaler
                .transform(v)
                .map(|scaled| scaled.values)
                .map_err(TrainingError::from)
        })
        .collect()
}
