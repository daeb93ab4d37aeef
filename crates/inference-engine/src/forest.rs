//! Random Forest Classifier
//!
//! Gini-split binary decision trees on bootstrap samples, averaged leaf
//! probabilities at prediction time. Trees are fitted in parallel with per-tree
//! seeds, so a given seed always yields the same forest.

use crate::ClassifierError;
use rand::seq::SliceRandom;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Random forest configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of trees in the forest
    pub n_trees: usize,
    /// Maximum depth of each tree
    pub max_depth: usize,
    /// Minimum samples to split a node
    pub min_samples_split: usize,
    /// Minimum samples in a leaf
    pub min_samples_leaf: usize,
    /// Features considered per split (ceil(sqrt(n)) if None)
    pub max_features: Option<usize>,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Random seed
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 150,
            max_depth: 12,
            min_samples_split: 5,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            seed: 42,
        }
    }
}

/// Tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        fraud_probability: f64,
        samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    fn fraud_probability(&self, features: &[f64]) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf {
                    fraud_probability, ..
                } => return *fraud_probability,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if features[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

struct TreeBuilder<'a> {
    features: &'a [Vec<f64>],
    labels: &'a [bool],
    config: &'a ForestConfig,
    max_features: usize,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

fn gini(positives: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p = positives as f64 / total as f64;
    2.0 * p * (1.0 - p)
}

impl TreeBuilder<'_> {
    fn build(&self, indices: &mut [usize], depth: usize, rng: &mut ChaCha8Rng) -> TreeNode {
        let n = indices.len();
        let positives = indices.iter().filter(|&&i| self.labels[i]).count();
        let impurity = gini(positives, n);

        let leaf = TreeNode::Leaf {
            fraud_probability: if n == 0 { 0.0 } else { positives as f64 / n as f64 },
            samples: n,
        };

        if depth >= self.config.max_depth
            || n < self.config.min_samples_split
            || impurity < 1e-12
        {
            return leaf;
        }

        let Some(split) = self.best_split(indices, positives, impurity, rng) else {
            return leaf;
        };

        let (left, right) = partition(indices, |i| self.features[i][split.feature] <= split.threshold);
        let left = self.build(left, depth + 1, rng);
        let right = self.build(right, depth + 1, rng);

        TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn best_split(
        &self,
        indices: &[usize],
        positives: usize,
        parent_impurity: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<SplitCandidate> {
        let n_features = self.features[0].len();
        let mut candidates: Vec<usize> = (0..n_features).collect();
        candidates.shuffle(rng);
        candidates.truncate(self.max_features);

        let n = indices.len();
        let min_leaf = self.config.min_samples_leaf.max(1);
        let mut best: Option<SplitCandidate> = None;
        let mut sorted = indices.to_vec();

        for feature in candidates {
            sorted.sort_by(|&a, &b| self.features[a][feature].total_cmp(&self.features[b][feature]));

            let mut left_positives = 0;
            for pos in 0..n - 1 {
                if self.labels[sorted[pos]] {
                    left_positives += 1;
                }
                let current = self.features[sorted[pos]][feature];
                let next = self.features[sorted[pos + 1]][feature];
                if current == next {
                    continue;
                }
                let left_n = pos + 1;
                let right_n = n - left_n;
                if left_n < min_leaf || right_n < min_leaf {
                    continue;
                }

                let weighted = (left_n as f64 * gini(left_positives, left_n)
                    + right_n as f64 * gini(positives - left_positives, right_n))
                    / n as f64;
                if weighted < parent_impurity
                    && best.as_ref().map_or(true, |b| weighted < b.impurity)
                {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: (current + next) / 2.0,
                        impurity: weighted,
                    });
                }
            }
        }
        best
    }
}

/// Reorder `indices` so matching entries come first, and split there
fn partition(indices: &mut [usize], goes_left: impl Fn(usize) -> bool) -> (&mut [usize], &mut [usize]) {
    let mut boundary = 0;
    for i in 0..indices.len() {
        if goes_left(indices[i]) {
            indices.swap(boundary, i);
            boundary += 1;
        }
    }
    indices.split_at_mut(boundary)
}

/// Fitted random forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredForest")]
pub struct RandomForest {
    config: ForestConfig,
    n_features: usize,
    trees: Vec<TreeNode>,
}

#[derive(Deserialize)]
struct StoredForest {
    config: ForestConfig,
    n_features: usize,
    trees: Vec<TreeNode>,
}

impl TryFrom<StoredForest> for RandomForest {
    type Error = ClassifierError;

    fn try_from(stored: StoredForest) -> Result<Self, ClassifierError> {
        if stored.n_features == 0 || stored.trees.is_empty() {
            return Err(ClassifierError::InvalidModel(format!(
                "forest with {} trees over {} features",
                stored.trees.len(),
                stored.n_features
            )));
        }
        for (idx, tree) in stored.trees.iter().enumerate() {
            check_tree(tree, stored.n_features)
                .map_err(|reason| ClassifierError::InvalidModel(format!("tree {}: {}", idx, reason)))?;
        }
        Ok(Self {
            config: stored.config,
            n_features: stored.n_features,
            trees: stored.trees,
        })
    }
}

/// Every split reads an existing feature and every leaf holds a probability
fn check_tree(root: &TreeNode, n_features: usize) -> Result<(), String> {
    let mut pending = vec![root];
    while let Some(node) = pending.pop() {
        match node {
            TreeNode::Leaf {
                fraud_probability, ..
            } => {
                if !(0.0..=1.0).contains(fraud_probability) {
                    return Err(format!("leaf probability {}", fraud_probability));
                }
            }
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if *feature >= n_features {
                    return Err(format!("split on feature {} of {}", feature, n_features));
                }
                if threshold.is_nan() {
                    return Err(format!("split on feature {} has no threshold", feature));
                }
                pending.push(left.as_ref());
                pending.push(right.as_ref());
            }
        }
    }
    Ok(())
}

impl RandomForest {
    /// Fit a forest on feature rows and binary labels
    pub fn fit(
        config: ForestConfig,
        features: &[Vec<f64>],
        labels: &[bool],
    ) -> Result<Self, ClassifierError> {
        if features.is_empty() {
            return Err(ClassifierError::EmptyTrainingSet);
        }
        if features.len() != labels.len() {
            return Err(ClassifierError::LengthMismatch {
                rows: features.len(),
                labels: labels.len(),
            });
        }
        let n_features = features[0].len();
        if let Some(row) = features.iter().position(|f| f.len() != n_features) {
            return Err(ClassifierError::RaggedRow {
                row,
                expected: n_features,
                actual: features[row].len(),
            });
        }
        if config.n_trees == 0 {
            return Err(ClassifierError::InvalidConfig("n_trees must be at least 1".into()));
        }

        let max_features = config
            .max_features
            .unwrap_or_else(|| (n_features as f64).sqrt().ceil() as usize)
            .clamp(1, n_features.max(1));

        let trees: Vec<TreeNode> = (0..config.n_trees)
            .into_par_iter()
            .map(|i| {
                let seed = config.seed.wrapping_add(i as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let n = features.len();
                let mut indices: Vec<usize> = if config.bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                let builder = TreeBuilder {
                    features,
                    labels,
                    config: &config,
                    max_features,
                };
                let tree = builder.build(&mut indices, 0, &mut rng);
                debug!(tree = i, depth = tree.depth(), "Tree fitted");
                tree
            })
            .collect();

        info!(
            trees = trees.len(),
            samples = features.len(),
            features = n_features,
            max_depth = config.max_depth,
            "Random forest fitted"
        );

        Ok(Self {
            config,
            n_features,
            trees,
        })
    }

    /// Mean of the trees' leaf fraud probabilities
    pub fn fraud_probability(&self, features: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let total: f64 = self.trees.iter().map(|t| t.fraud_probability(features)).sum();
        total / self.trees.len() as f64
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }
}
