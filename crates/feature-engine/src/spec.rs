//! Feature Specification
//!
//! The versioned, ordered definition of the feature vector. Training and scoring
//! both iterate this list; nothing else decides names or order.

use data_validator::RawField;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Version identifier of a feature specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSpecVersion(pub u32);

impl fmt::Display for FeatureSpecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// One-argument transform of a raw field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarTransform {
    /// ln(1 + x); finite at zero, compresses heavy tails
    Log1p,
}

/// Training-time statistic a threshold flag compares against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdStatistic {
    /// Frozen upper quantile of historical amounts
    AmountQuantile,
}

/// Aggregate over the transaction population, grouped by an identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    /// Transactions sent by the same sender
    SenderCount,
    /// Transactions received by the same receiver
    ReceiverCount,
    /// Seconds since the same sender's previous transaction
    SenderGapSeconds,
}

/// How a feature is derived from the raw record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivationRule {
    /// Copy of a raw field (enums as their numeric code)
    Direct,
    /// Function of one raw field
    DerivedScalar(ScalarTransform),
    /// 1.0 when the raw field strictly exceeds the statistic, else 0.0
    DerivedThreshold(ThresholdStatistic),
    /// Function of the raw field and a population aggregate
    DerivedAggregate(AggregateKind),
}

impl DerivationRule {
    /// Rule tag
    pub fn kind(&self) -> &'static str {
        match self {
            DerivationRule::Direct => "direct",
            DerivationRule::DerivedScalar(_) => "derived-scalar",
            DerivationRule::DerivedThreshold(_) => "derived-threshold",
            DerivationRule::DerivedAggregate(_) => "derived-aggregate",
        }
    }
}

/// A single named feature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureDefinition {
    pub name: &'static str,
    pub rule: DerivationRule,
    pub sources: &'static [RawField],
}

/// Ordered, versioned feature specification
#[derive(Debug, PartialEq, Eq)]
pub struct FeatureSpec {
    version: FeatureSpecVersion,
    features: &'static [FeatureDefinition],
}

/// Version 1 of the fraud feature vector
pub static FEATURE_SPEC_V1: FeatureSpec = FeatureSpec {
    version: FeatureSpecVersion(1),
    features: &[
        FeatureDefinition {
            name: "Transaction Amount Log",
            rule: DerivationRule::DerivedScalar(ScalarTransform::Log1p),
            sources: &[RawField::Amount],
        },
        FeatureDefinition {
            name: "Sender Transaction Count",
            rule: DerivationRule::DerivedAggregate(AggregateKind::SenderCount),
            sources: &[RawField::SenderId],
        },
        FeatureDefinition {
            name: "Receiver Transaction Count",
            rule: DerivationRule::DerivedAggregate(AggregateKind::ReceiverCount),
            sources: &[RawField::ReceiverId],
        },
        FeatureDefinition {
            name: "Time Diff Between Transactions",
            rule: DerivationRule::DerivedAggregate(AggregateKind::SenderGapSeconds),
            sources: &[RawField::SenderId, RawField::Timestamp],
        },
        FeatureDefinition {
            name: "Is High Amount",
            rule: DerivationRule::DerivedThreshold(ThresholdStatistic::AmountQuantile),
            sources: &[RawField::Amount],
        },
        FeatureDefinition {
            name: "Status",
            rule: DerivationRule::Direct,
            sources: &[RawField::Status],
        },
    ],
};

static REGISTRY: [&FeatureSpec; 1] = [&FEATURE_SPEC_V1];

impl FeatureSpec {
    /// The specification new bundles are trained against
    pub fn current() -> &'static FeatureSpec {
        &FEATURE_SPEC_V1
    }

    /// Look up a published specification by version
    pub fn by_version(version: FeatureSpecVersion) -> Option<&'static FeatureSpec> {
        REGISTRY.iter().copied().find(|spec| spec.version == version)
    }

    pub fn version(&self) -> FeatureSpecVersion {
        self.version
    }

    /// Feature definitions in vector order
    pub fn features(&self) -> &'static [FeatureDefinition] {
        self.features
    }

    /// Feature names in vector order
    pub fn names(&self) -> Vec<&'static str> {
        self.features.iter().map(|f| f.name).collect()
    }

    /// Vector length
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Position of a feature in the vector
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.features.iter().position(|f| f.name == name)
    }

    /// Raw fields referenced by any feature, deduplicated in record order
    pub fn required_fields(&self) -> Vec<RawField> {
        RawField::ALL
            .into_iter()
            .filter(|field| self.features.iter().any(|f| f.sources.contains(field)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_v1_order() {
        let spec = FeatureSpec::current();
        assert_eq!(spec.version(), FeatureSpecVersion(1));
        assert_eq!(
            spec.names(),
            vec![
                "Transaction Amount Log",
                "Sender Transaction Count",
                "Receiver Transaction Count",
                "Time Diff Between Transactions",
                "Is High Amount",
                "Status",
            ]
        );
        assert_eq!(spec.len(), 6);
    }

    #[test]
    fn test_lookup() {
        assert!(FeatureSpec::by_version(FeatureSpecVersion(1)).is_some());
        assert!(FeatureSpec::by_version(FeatureSpecVersion(2)).is_none());
        assert_eq!(FeatureSpec::current().index_of("Is High Amount"), Some(4));
        assert_eq!(FeatureSpec::current().index_of("Amount_INR"), None);
    }

    #[test]
    fn test_required_fields_cover_record() {
        assert_eq!(FeatureSpec::current().required_fields(), RawField::ALL.to_vec());
    }

    #[test]
    fn test_names_are_unique() {
        let names = FeatureSpec::current().names();
        let mut deduped = names.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), names.len());
    }

    #[test]
    fn test_version_display() {
        assert_eq!(FeatureSpecVersion(1).to_string(), "v1");
    }
}
