//! Feature Engineering Engine
//!
//! Versioned feature specification, feature building for training batches and
//! single requests, and the fitted standard scaler shared by both paths.

mod error;
mod features;
mod population;
mod scaler;
mod spec;
mod statistics;

pub use error::FeatureError;
pub use features::{FeatureBuilder, FeatureVector};
pub use population::{HistoricalPopulation, PopulationStats, RunningAggregate, TransactionContext};
pub use scaler::FittedScaler;
pub use spec::{
    AggregateKind, DerivationRule, FeatureDefinition, FeatureSpec, FeatureSpecVersion,
    ScalarTransform, ThresholdStatistic, FEATURE_SPEC_V1,
};
pub use statistics::{
    median, quantile, FrozenStatistics, SummaryStatistics, DEFAULT_HIGH_AMOUNT_QUANTILE,
};
