//! Scoring Engine
//!
//! Rebuilds the training-time feature vector for one transaction, scales it and
//! applies the bundle's classifier. Every failure is returned as an error; there is
//! no fallback prediction.

use crate::bundle::ValidatedBundle;
use crate::handle::BundleHandle;
use crate::ScoringError;
use data_validator::{RawTransaction, TransactionRecord};
use feature_engine::{FeatureSpecVersion, PopulationStats, RunningAggregate, TransactionContext};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;
use uuid::Uuid;

/// Result of scoring one transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreOutcome {
    pub is_fraud: bool,
    pub fraud_probability: f64,
    pub spec_version: FeatureSpecVersion,
    pub bundle_id: Uuid,
}

/// Score a boundary record against a validated bundle
pub fn score(
    record: &TransactionRecord,
    bundle: &ValidatedBundle,
    population: &impl PopulationStats,
) -> Result<ScoreOutcome, ScoringError> {
    let tx = bundle.builder().validate(record)?;
    let context = population.context_for(&tx);
    score_raw(&tx, &context, bundle)
}

fn score_raw(
    tx: &RawTransaction,
    context: &TransactionContext,
    bundle: &ValidatedBundle,
) -> Result<ScoreOutcome, ScoringError> {
    let start = Instant::now();
    let vector = bundle.builder().build_raw(tx, context);
    let scaled = bundle.scaler().transform(&vector)?;
    let (is_fraud, fraud_probability) = bundle.classifier().predict(&scaled)?;

    debug!(
        bundle_id = %bundle.bundle_id(),
        is_fraud,
        fraud_probability,
        latency_us = start.elapsed().as_micros() as u64,
        "Transaction scored"
    );

    Ok(ScoreOutcome {
        is_fraud,
        fraud_probability,
        spec_version: bundle.spec_version(),
        bundle_id: bundle.bundle_id(),
    })
}

/// Online scorer bound to the live bundle
#[derive(Debug, Clone)]
pub struct Scorer {
    handle: BundleHandle,
}

impl Scorer {
    pub fn new(handle: BundleHandle) -> Self {
        Self { handle }
    }

    pub fn from_bundle(bundle: ValidatedBundle) -> Self {
        Self::new(BundleHandle::new(bundle))
    }

    pub fn handle(&self) -> &BundleHandle {
        &self.handle
    }

    /// Score against whichever bundle is live when the call starts
    pub fn score(
        &self,
        record: &TransactionRecord,
        population: &impl PopulationStats,
    ) -> Result<ScoreOutcome, ScoringError> {
        let bundle = self.handle.current();
        score(record, &bundle, population)
    }

    /// Score, then record the transaction in the running aggregate.
    ///
    /// Rejected transactions are not recorded. Context lookup, scoring and the update
    /// are atomic with respect to other calls on the same aggregate.
    pub fn score_and_observe(
        &self,
        record: &TransactionRecord,
        aggregate: &RunningAggregate,
    ) -> Result<ScoreOutcome, ScoringError> {
        let bundle = self.handle.current();
        let tx = bundle.builder().validate(record)?;
        aggregate.observe_with(&tx, |context| score_raw(&tx, context, &bundle))
    }
}
