//! Multi-output random forest regressor
//!
//! Bagged CART trees that predict all three targets jointly. Splits
//! minimize the summed squared error over every target, each split
//! considers a random subset of features, and the forest averages its
//! trees' leaf values.

use super::RegressionModel;
use crate::error::{EstimatorError, Result};
use crate::features::{FeatureRow, FEATURE_COUNT, TARGET_COUNT};
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Target triple in model output order
pub type TargetRow = [f64; TARGET_COUNT];

/// Forest hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split; `None` means `floor(sqrt(27))`
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 150,
            max_depth: 15,
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: None,
            seed: 42,
        }
    }
}

impl ForestParams {
    pub fn features_per_split(&self) -> usize {
        self.max_features
            .unwrap_or_else(|| (FEATURE_COUNT as f64).sqrt() as usize)
            .clamp(1, FEATURE_COUNT)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Node {
    Leaf {
        value: TargetRow,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// One regression tree stored as a flat node arena, root at index 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn predict(&self, row: &FeatureRow) -> TargetRow {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

/// Running sums used to score candidate splits
#[derive(Debug, Clone, Copy, Default)]
struct Moments {
    count: usize,
    sum: TargetRow,
    sum_sq: TargetRow,
}

impl Moments {
    fn add(&mut self, y: &TargetRow) {
        self.count += 1;
        for t in 0..TARGET_COUNT {
            self.sum[t] += y[t];
            self.sum_sq[t] += y[t] * y[t];
        }
    }

    fn minus(&self, other: &Moments) -> Moments {
        let mut out = Moments {
            count: self.count - other.count,
            ..Moments::default()
        };
        for t in 0..TARGET_COUNT {
            out.sum[t] = self.sum[t] - other.sum[t];
            out.sum_sq[t] = self.sum_sq[t] - other.sum_sq[t];
        }
        out
    }

    /// Summed squared error around the mean, over all targets
    fn sse(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let n = self.count as f64;
        (0..TARGET_COUNT)
            .map(|t| (self.sum_sq[t] - self.sum[t] * self.sum[t] / n).max(0.0))
            .sum()
    }

    fn mean(&self) -> TargetRow {
        let n = self.count.max(1) as f64;
        let mut mean = [0.0; TARGET_COUNT];
        for t in 0..TARGET_COUNT {
            mean[t] = self.sum[t] / n;
        }
        mean
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    /// Position in the feature-sorted sample list where the right side starts
    pivot: usize,
    gain: f64,
}

struct TreeBuilder<'a> {
    x: &'a [FeatureRow],
    y: &'a [TargetRow],
    params: &'a ForestParams,
    importances: [f64; FEATURE_COUNT],
    nodes: Vec<Node>,
}

impl<'a> TreeBuilder<'a> {
    fn build<R: Rng>(mut self, rng: &mut R, samples: Vec<usize>) -> (Tree, [f64; FEATURE_COUNT]) {
        self.grow(rng, samples, 0);
        (Tree { nodes: self.nodes }, self.importances)
    }

    fn moments(&self, samples: &[usize]) -> Moments {
        let mut m = Moments::default();
        for &i in samples {
            m.add(&self.y[i]);
        }
        m
    }

    /// Grow the subtree for `samples` and return its node index
    fn grow<R: Rng>(&mut self, rng: &mut R, samples: Vec<usize>, depth: usize) -> usize {
        let node_moments = self.moments(&samples);
        let node_idx = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: node_moments.mean(),
        });

        let node_sse = node_moments.sse();
        if depth >= self.params.max_depth
            || samples.len() < self.params.min_samples_split
            || samples.len() < 2 * self.params.min_samples_leaf
            || node_sse <= f64::EPSILON
        {
            return node_idx;
        }

        let Some((split, sorted)) = self.best_split(rng, &samples, &node_moments) else {
            return node_idx;
        };

        self.importances[split.feature] += split.gain;
        let (left_samples, right_samples) = sorted.split_at(split.pivot);
        let left = self.grow(rng, left_samples.to_vec(), depth + 1);
        let right = self.grow(rng, right_samples.to_vec(), depth + 1);
        self.nodes[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_idx
    }

    fn best_split<R: Rng>(
        &self,
        rng: &mut R,
        samples: &[usize],
        total: &Moments,
    ) -> Option<(SplitCandidate, Vec<usize>)> {
        let min_leaf = self.params.min_samples_leaf.max(1);
        let parent_sse = total.sse();
        let mut best: Option<(SplitCandidate, Vec<usize>)> = None;

        let candidates = index::sample(rng, FEATURE_COUNT, self.params.features_per_split());
        for feature in candidates.into_iter() {
            let mut sorted = samples.to_vec();
            sorted.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

            let mut left = Moments::default();
            let mut found: Option<SplitCandidate> = None;
            for pos in 0..sorted.len() - 1 {
                left.add(&self.y[sorted[pos]]);
                let here = self.x[sorted[pos]][feature];
                let next = self.x[sorted[pos + 1]][feature];
                if here >= next || left.count < min_leaf || sorted.len() - left.count < min_leaf {
                    continue;
                }
                let right = total.minus(&left);
                let gain = parent_sse - left.sse() - right.sse();
                let best_gain = found
                    .as_ref()
                    .or(best.as_ref().map(|(c, _)| c))
                    .map_or(f64::NEG_INFINITY, |c| c.gain);
                if gain > best_gain {
                    found = Some(SplitCandidate {
                        feature,
                        threshold: (here + next) / 2.0,
                        pivot: pos + 1,
                        gain,
                    });
                }
            }
            if let Some(candidate) = found {
                best = Some((candidate, sorted));
            }
        }

        best.filter(|(c, _)| c.gain > 0.0)
    }
}

/// Trained forest; serializes to the `model.json` artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    trees: Vec<Tree>,
    /// Normalized impurity decrease per feature, in schema order
    feature_importances: Vec<f64>,
}

impl RandomForest {
    pub fn fit(x: &[FeatureRow], y: &[TargetRow], params: ForestParams) -> Result<Self> {
        if x.is_empty() {
            return Err(EstimatorError::model("cannot fit a forest on zero rows"));
        }
        if x.len() != y.len() {
            return Err(EstimatorError::model(format!(
                "feature rows ({}) and target rows ({}) differ",
                x.len(),
                y.len()
            )));
        }
        if params.n_estimators == 0 {
            return Err(EstimatorError::model("n_estimators must be at least 1"));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
        let mut importances = [0.0; FEATURE_COUNT];
        let mut trees = Vec::with_capacity(params.n_estimators);

        for _ in 0..params.n_estimators {
            let mut tree_rng = ChaCha8Rng::seed_from_u64(rng.gen());
            let bootstrap: Vec<usize> = (0..x.len()).map(|_| tree_rng.gen_range(0..x.len())).collect();
            let builder = TreeBuilder {
                x,
                y,
                params: &params,
                importances: [0.0; FEATURE_COUNT],
                nodes: Vec::new(),
            };
            let (tree, tree_importances) = builder.build(&mut tree_rng, bootstrap);
            let tree_total: f64 = tree_importances.iter().sum();
            if tree_total > 0.0 {
                for (acc, v) in importances.iter_mut().zip(tree_importances) {
                    *acc += v / tree_total;
                }
            }
            trees.push(tree);
        }

        let total: f64 = importances.iter().sum();
        let feature_importances = importances
            .iter()
            .map(|v| if total > 0.0 { v / total } else { 0.0 })
            .collect();

        let forest = Self {
            params,
            trees,
            feature_importances,
        };
        debug!(
            trees = forest.trees.len(),
            max_depth = forest.trees.iter().map(Tree::depth).max().unwrap_or(0),
            rows = x.len(),
            "Random forest fitted"
        );
        Ok(forest)
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn predict_row(&self, row: &FeatureRow) -> TargetRow {
        let mut acc = [0.0; TARGET_COUNT];
        for tree in &self.trees {
            let value = tree.predict(row);
            for t in 0..TARGET_COUNT {
                acc[t] += value[t];
            }
        }
        let n = self.trees.len().max(1) as f64;
        acc.map(|v| v / n)
    }

    pub fn to_json_vec(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        let forest: Self = serde_json::from_slice(bytes)
            .map_err(|e| EstimatorError::model(format!("invalid forest artifact: {}", e)))?;
        if forest.trees.is_empty() {
            return Err(EstimatorError::model("forest artifact has no trees"));
        }
        Ok(forest)
    }
}

impl RegressionModel for RandomForest {
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<TargetRow>> {
        Ok(rows.iter().map(|row| self.predict_row(row)).collect())
    }

    fn kind(&self) -> &'static str {
        "random_forest"
    }
}
