//! Classifier Models

use crate::forest::RandomForest;
use crate::ClassifierError;
use feature_engine::{FeatureSpecVersion, FeatureVector};
use serde::{Deserialize, Serialize};

/// Probability at or above which a transaction is flagged
pub const DEFAULT_DECISION_THRESHOLD: f64 = 0.5;

/// Decision function over a scaled feature vector
pub trait Classifier {
    /// Number of features the model was fitted on
    fn feature_count(&self) -> usize;

    /// Estimated probability that the transaction is fraudulent
    fn fraud_probability(&self, features: &[f64]) -> Result<f64, ClassifierError>;
}

fn check_len(expected: usize, features: &[f64]) -> Result<(), ClassifierError> {
    if features.len() != expected {
        return Err(ClassifierError::DimensionMismatch {
            expected,
            actual: features.len(),
        });
    }
    Ok(())
}

impl Classifier for RandomForest {
    fn feature_count(&self) -> usize {
        self.n_features()
    }

    fn fraud_probability(&self, features: &[f64]) -> Result<f64, ClassifierError> {
        check_len(self.n_features(), features)?;
        Ok(RandomForest::fraud_probability(self, features))
    }
}

/// Single-feature cutoff on the scaled vector.
///
/// Useful as a baseline and for exercising the scoring path without fitting a forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredRule")]
pub struct ThresholdRule {
    feature_count: usize,
    feature_index: usize,
    cutoff: f64,
}

#[derive(Deserialize)]
struct StoredRule {
    feature_count: usize,
    feature_index: usize,
    cutoff: f64,
}

impl TryFrom<StoredRule> for ThresholdRule {
    type Error = ClassifierError;

    fn try_from(stored: StoredRule) -> Result<Self, ClassifierError> {
        Self::new(stored.feature_count, stored.feature_index, stored.cutoff)
    }
}

impl ThresholdRule {
    /// Flag vectors whose `feature_index` value exceeds `cutoff`
    pub fn new(feature_count: usize, feature_index: usize, cutoff: f64) -> Result<Self, ClassifierError> {
        if feature_index >= feature_count {
            return Err(ClassifierError::InvalidConfig(format!(
                "feature index {} outside {} features",
                feature_index, feature_count
            )));
        }
        if cutoff.is_nan() {
            return Err(ClassifierError::InvalidConfig("cutoff is NaN".into()));
        }
        Ok(Self {
            feature_count,
            feature_index,
            cutoff,
        })
    }
}

impl Classifier for ThresholdRule {
    fn feature_count(&self) -> usize {
        self.feature_count
    }

    fn fraud_probability(&self, features: &[f64]) -> Result<f64, ClassifierError> {
        check_len(self.feature_count, features)?;
        Ok(if features[self.feature_index] > self.cutoff {
            1.0
        } else {
            0.0
        })
    }
}

/// Serializable model family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClassifierModel {
    RandomForest(RandomForest),
    ThresholdRule(ThresholdRule),
}

impl ClassifierModel {
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifierModel::RandomForest(_) => "random_forest",
            ClassifierModel::ThresholdRule(_) => "threshold_rule",
        }
    }
}

impl Classifier for ClassifierModel {
    fn feature_count(&self) -> usize {
        match self {
            ClassifierModel::RandomForest(m) => Classifier::feature_count(m),
            ClassifierModel::ThresholdRule(m) => m.feature_count(),
        }
    }

    fn fraud_probability(&self, features: &[f64]) -> Result<f64, ClassifierError> {
        match self {
            ClassifierModel::RandomForest(m) => Classifier::fraud_probability(m, features),
            ClassifierModel::ThresholdRule(m) => m.fraud_probability(features),
        }
    }
}

/// Trained classifier as published in a bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredClassifier")]
pub struct TrainedClassifier {
    spec_version: FeatureSpecVersion,
    feature_count: usize,
    decision_threshold: f64,
    model: ClassifierModel,
}

#[derive(Deserialize)]
struct StoredClassifier {
    spec_version: FeatureSpecVersion,
    feature_count: usize,
    decision_threshold: f64,
    model: ClassifierModel,
}

impl TryFrom<StoredClassifier> for TrainedClassifier {
    type Error = ClassifierError;

    fn try_from(stored: StoredClassifier) -> Result<Self, ClassifierError> {
        let classifier = Self::new(stored.spec_version, stored.decision_threshold, stored.model)?;
        if classifier.feature_count != stored.feature_count {
            return Err(ClassifierError::DimensionMismatch {
                expected: stored.feature_count,
                actual: classifier.feature_count,
            });
        }
        Ok(classifier)
    }
}

impl TrainedClassifier {
    pub fn new(
        spec_version: FeatureSpecVersion,
        decision_threshold: f64,
        model: ClassifierModel,
    ) -> Result<Self, ClassifierError> {
        if !(0.0..=1.0).contains(&decision_threshold) {
            return Err(ClassifierError::InvalidConfig(format!(
                "decision threshold {} outside [0, 1]",
                decision_threshold
            )));
        }
        Ok(Self {
            spec_version,
            feature_count: model.feature_count(),
            decision_threshold,
            model,
        })
    }

    /// Wrap a fitted forest with the default decision threshold
    pub fn from_forest(spec_version: FeatureSpecVersion, forest: RandomForest) -> Self {
        Self {
            spec_version,
            feature_count: Classifier::feature_count(&forest),
            decision_threshold: DEFAULT_DECISION_THRESHOLD,
            model: ClassifierModel::RandomForest(forest),
        }
    }

    pub fn spec_version(&self) -> FeatureSpecVersion {
        self.spec_version
    }

    /// Feature count declared by the classifier
    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    pub fn decision_threshold(&self) -> f64 {
        self.decision_threshold
    }

    pub fn model(&self) -> &ClassifierModel {
        &self.model
    }

    /// Fraud probability of a scaled vector
    pub fn fraud_probability(&self, scaled: &FeatureVector) -> Result<f64, ClassifierError> {
        check_len(self.feature_count, &scaled.values)?;
        self.model.fraud_probability(&scaled.values)
    }

    /// Decision and probability for a scaled vector
    pub fn predict(&self, scaled: &FeatureVector) -> Result<(bool, f64), ClassifierError> {
        let probability = self.fraud_probability(scaled)?;
        Ok((probability >= self.decision_threshold, probability))
    }
}
