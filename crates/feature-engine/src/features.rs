//! Feature Vector Assembly

use crate::error::FeatureError;
use crate::population::{HistoricalPopulation, PopulationStats, TransactionContext};
use crate::spec::{
    AggregateKind, DerivationRule, FeatureDefinition, FeatureSpec, FeatureSpecVersion,
    ScalarTransform, ThresholdStatistic,
};
use crate::statistics::FrozenStatistics;
use data_validator::{RawTransaction, TransactionRecord, ValidationError, Validator};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Feature vector for ML inference, in specification order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Specification the values were built against
    pub spec_version: FeatureSpecVersion,
    /// Raw feature values
    pub values: Vec<f64>,
}

impl FeatureVector {
    pub fn new(spec_version: FeatureSpecVersion, values: Vec<f64>) -> Self {
        Self {
            spec_version,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a named feature
    pub fn get(&self, spec: &FeatureSpec, name: &str) -> Result<f64, FeatureError> {
        spec.index_of(name)
            .and_then(|idx| self.values.get(idx).copied())
            .ok_or_else(|| FeatureError::UnknownFeature(name.to_string()))
    }
}

/// Builds feature vectors from raw transactions.
///
/// One instance serves both the training batch and online requests; the frozen
/// statistics it carries are never refitted from a request.
#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    spec: &'static FeatureSpec,
    frozen: FrozenStatistics,
    validator: Validator,
}

impl FeatureBuilder {
    /// Create a builder for a specification and its frozen statistics
    pub fn new(spec: &'static FeatureSpec, frozen: FrozenStatistics) -> Result<Self, FeatureError> {
        if frozen.spec_version != spec.version() {
            return Err(FeatureError::SpecVersionMismatch {
                expected: spec.version(),
                actual: frozen.spec_version,
            });
        }
        frozen.check()?;
        Ok(Self {
            spec,
            frozen,
            validator: Validator::default(),
        })
    }

    /// Use a non-default boundary validator
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn spec(&self) -> &'static FeatureSpec {
        self.spec
    }

    pub fn frozen(&self) -> &FrozenStatistics {
        &self.frozen
    }

    /// Check a boundary record against the fields this specification reads
    pub fn validate(&self, record: &TransactionRecord) -> Result<RawTransaction, ValidationError> {
        self.validator.validate(record)
    }

    /// Validate a boundary record and build its feature vector
    pub fn build(
        &self,
        record: &TransactionRecord,
        population: &impl PopulationStats,
    ) -> Result<FeatureVector, FeatureError> {
        let tx = self.validate(record)?;
        let context = population.context_for(&tx);
        Ok(self.build_raw(&tx, &context))
    }

    /// Build the feature vector of an already validated transaction
    pub fn build_raw(&self, tx: &RawTransaction, context: &TransactionContext) -> FeatureVector {
        let values = self
            .spec
            .features()
            .iter()
            .map(|feature| self.evaluate(feature, tx, context))
            .collect();
        FeatureVector::new(self.spec.version(), values)
    }

    /// Build vectors for a whole historical batch, aligned with the input
    pub fn build_batch(
        &self,
        transactions: &[RawTransaction],
        population: &HistoricalPopulation,
    ) -> Result<Vec<FeatureVector>, FeatureError> {
        if transactions.len() != population.contexts().len() {
            return Err(FeatureError::DimensionMismatch {
                expected: population.contexts().len(),
                actual: transactions.len(),
            });
        }
        let vectors: Vec<FeatureVector> = transactions
            .iter()
            .zip(population.contexts())
            .map(|(tx, ctx)| self.build_raw(tx, ctx))
            .collect();
        debug!(
            vectors = vectors.len(),
            features = self.spec.len(),
            spec = %self.spec.version(),
            "Built training feature vectors"
        );
        Ok(vectors)
    }

    fn evaluate(
        &self,
        feature: &FeatureDefinition,
        tx: &RawTransaction,
        context: &TransactionContext,
    ) -> f64 {
        match feature.rule {
            DerivationRule::Direct => f64::from(tx.status().code()),
            DerivationRule::DerivedScalar(ScalarTransform::Log1p) => tx.amount().ln_1p(),
            DerivationRule::DerivedThreshold(ThresholdStatistic::AmountQuantile) => {
                if tx.amount() > self.frozen.high_amount_threshold {
                    1.0
                } else {
                    0.0
                }
            }
            DerivationRule::DerivedAggregate(AggregateKind::SenderCount) => {
                context.sender_count as f64
            }
            DerivationRule::DerivedAggregate(AggregateKind::ReceiverCount) => {
                context.receiver_count as f64
            }
            DerivationRule::DerivedAggregate(AggregateKind::SenderGapSeconds) => context
                .gap_seconds(tx.timestamp())
                .unwrap_or(self.frozen.median_gap_seconds),
        }
    }
}
