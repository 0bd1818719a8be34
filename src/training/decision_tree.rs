//! Decision tree implementation

use super::params::{
    expect_opt_usize, expect_str, expect_usize, invalid_param, unknown_param, ParamValue,
};
use crate::constants::DEFAULT_RANDOM_STATE;
use crate::error::{NetworkSecurityError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf { value: f64, n_samples: usize },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Criterion {
    /// Gini impurity (classification)
    Gini,
    /// Shannon entropy, also accepted as `log_loss` (classification)
    Entropy,
    /// Mean squared error (regression)
    MSE,
    /// MSE impurity, splits ranked by Friedman's improvement score (regression)
    FriedmanMSE,
}

impl Criterion {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "gini" => Some(Criterion::Gini),
            "entropy" | "log_loss" => Some(Criterion::Entropy),
            "squared_error" | "mse" => Some(Criterion::MSE),
            "friedman_mse" => Some(Criterion::FriedmanMSE),
            _ => None,
        }
    }

    pub fn is_regression(self) -> bool {
        matches!(self, Criterion::MSE | Criterion::FriedmanMSE)
    }
}

/// Split selection strategy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Splitter {
    /// Scan every threshold of every candidate feature
    Best,
    /// Draw one uniform threshold per candidate feature
    Random,
}

/// Number of features considered at each split
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum MaxFeatures {
    Sqrt,
    Log2,
    Fraction(f64),
    Fixed(usize),
    All,
}

impl MaxFeatures {
    pub fn resolve(&self, n_features: usize) -> usize {
        let k = match *self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().floor() as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).floor() as usize,
            MaxFeatures::Fixed(k) => k,
            MaxFeatures::All => n_features,
        };
        k.clamp(1, n_features.max(1))
    }

    /// Accepts "sqrt", "log2", None or "auto" (all), an integer count or a fraction
    pub fn from_param(name: &str, value: &ParamValue) -> Result<Self> {
        match value {
            ParamValue::None => Ok(MaxFeatures::All),
            ParamValue::Str(s) if s == "auto" => Ok(MaxFeatures::All),
            ParamValue::Str(s) if s == "sqrt" => Ok(MaxFeatures::Sqrt),
            ParamValue::Str(s) if s == "log2" => Ok(MaxFeatures::Log2),
            ParamValue::Int(k) if *k >= 1 => Ok(MaxFeatures::Fixed(*k as usize)),
            ParamValue::Float(f) if *f > 0.0 && *f <= 1.0 => Ok(MaxFeatures::Fraction(*f)),
            _ => Err(invalid_param(
                name,
                value,
                "expected sqrt, log2, auto, None, a positive count or a fraction in (0, 1]",
            )),
        }
    }
}

/// Running target statistics for one side of a split
#[derive(Debug, Clone)]
struct NodeStats {
    count: usize,
    sum: f64,
    sq_sum: f64,
    class_counts: Vec<usize>,
}

impl NodeStats {
    fn new(n_classes: usize) -> Self {
        Self {
            count: 0,
            sum: 0.0,
            sq_sum: 0.0,
            class_counts: vec![0; n_classes],
        }
    }

    fn add(&mut self, y: f64, class: Option<usize>) {
        self.count += 1;
        self.sum += y;
        self.sq_sum += y * y;
        if let Some(c) = class {
            self.class_counts[c] += 1;
        }
    }

    fn remove(&mut self, y: f64, class: Option<usize>) {
        self.count -= 1;
        self.sum -= y;
        self.sq_sum -= y * y;
        if let Some(c) = class {
            self.class_counts[c] -= 1;
        }
    }

    fn impurity(&self, criterion: Criterion) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let n = self.count as f64;
        match criterion {
            Criterion::Gini => {
                1.0 - self
                    .class_counts
                    .iter()
                    .map(|&c| (c as f64 / n).powi(2))
                    .sum::<f64>()
            }
            Criterion::Entropy => -self
                .class_counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / n;
                    p * p.ln()
                })
                .sum::<f64>(),
            // Var = E[X²] - E[X]²
            Criterion::MSE | Criterion::FriedmanMSE => (self.sq_sum / n - (self.sum / n).powi(2)).max(0.0),
        }
    }
}

/// Targets with their precomputed class positions
struct Targets<'a> {
    y: &'a Array1<f64>,
    class_idx: Vec<usize>,
}

impl Targets<'_> {
    fn class_of(&self, i: usize) -> Option<usize> {
        self.class_idx.get(i).copied()
    }
}

#[derive(Debug, Clone, Copy)]
struct BestSplit {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// Open leaf waiting for best-first expansion
struct Frontier {
    slot: usize,
    indices: Vec<usize>,
    depth: usize,
    impurity: f64,
    split: BestSplit,
}

/// Arena node of a best-first tree
enum Grown {
    Leaf(TreeNode),
    Split {
        feature_idx: usize,
        threshold: f64,
        n_samples: usize,
        impurity: f64,
        left: usize,
        right: usize,
    },
}

/// Decision tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    /// Grow best-first up to this many leaves; depth-first when `None`
    #[serde(default)]
    pub max_leaf_nodes: Option<usize>,
    pub criterion: Criterion,
    pub splitter: Splitter,
    pub random_state: Option<u64>,
    n_features: usize,
    feature_importances: Option<Array1<f64>>,
    is_classification: bool,
    classes: Vec<f64>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new_classifier()
    }
}

impl DecisionTree {
    /// Create a new classifier tree
    pub fn new_classifier() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            max_leaf_nodes: None,
            criterion: Criterion::Gini,
            splitter: Splitter::Best,
            random_state: None,
            n_features: 0,
            feature_importances: None,
            is_classification: true,
            classes: Vec::new(),
        }
    }

    /// Create a new regressor tree
    pub fn new_regressor() -> Self {
        Self {
            criterion: Criterion::MSE,
            is_classification: false,
            ..Self::new_classifier()
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_max_leaf_nodes(mut self, max_leaves: usize) -> Self {
        self.max_leaf_nodes = Some(max_leaves);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_splitter(mut self, splitter: Splitter) -> Self {
        self.splitter = splitter;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Apply one named hyperparameter
    pub fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match name {
            "criterion" => {
                let criterion = Criterion::parse(expect_str(name, value)?)
                    .filter(|c| c.is_regression() != self.is_classification)
                    .ok_or_else(|| invalid_param(name, value, "unsupported criterion for this tree"))?;
                self.criterion = criterion;
            }
            "splitter" => {
                self.splitter = match expect_str(name, value)? {
                    "best" => Splitter::Best,
                    "random" => Splitter::Random,
                    _ => return Err(invalid_param(name, value, "expected best or random")),
                };
            }
            "max_features" => self.max_features = MaxFeatures::from_param(name, value)?,
            "max_depth" => self.max_depth = expect_opt_usize(name, value, 1)?,
            "max_leaf_nodes" => self.max_leaf_nodes = expect_opt_usize(name, value, 2)?,
            "min_samples_split" => self.min_samples_split = expect_usize(name, value, 2)?,
            "min_samples_leaf" => self.min_samples_leaf = expect_usize(name, value, 1)?,
            _ => return Err(unknown_param("DecisionTreeClassifier", name)),
        }
        Ok(())
    }

    /// Fit the tree to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(NetworkSecurityError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 || n_features == 0 {
            return Err(NetworkSecurityError::ValidationError(
                "cannot fit a decision tree on an empty matrix".to_string(),
            ));
        }

        self.n_features = n_features;
        let class_idx = if self.is_classification {
            self.classes = unique_sorted(y);
            y.iter()
                .map(|v| class_position(&self.classes, *v))
                .collect()
        } else {
            Vec::new()
        };
        let targets = Targets { y, class_idx };

        let mut importances = vec![0.0; n_features];
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(DEFAULT_RANDOM_STATE));
        let indices: Vec<usize> = (0..n_samples).collect();
        let root = match self.max_leaf_nodes {
            Some(max_leaves) => self.build_best_first(x, &targets, indices, max_leaves, &mut importances, &mut rng),
            None => self.build_tree(x, &targets, &indices, 0, &mut importances, &mut rng),
        };

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.root = Some(root);
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn node_stats(&self, targets: &Targets, indices: &[usize]) -> NodeStats {
        let mut stats = NodeStats::new(self.classes.len());
        for &i in indices {
            stats.add(targets.y[i], targets.class_of(i));
        }
        stats
    }

    /// Stop checks and split search for one node
    fn plan_node(
        &self,
        x: &Array2<f64>,
        targets: &Targets,
        indices: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> (NodeStats, Option<BestSplit>) {
        let n_samples = indices.len();
        let stats = self.node_stats(targets, indices);

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || is_pure(targets.y, indices);

        if should_stop {
            return (stats, None);
        }

        let features = self.candidate_features(rng);
        let random_thresholds = match self.splitter {
            Splitter::Best => None,
            Splitter::Random => Some(
                features
                    .iter()
                    .map(|&f| random_threshold(x, indices, f, rng))
                    .collect::<Vec<_>>(),
            ),
        };

        let split = self.find_best_split(x, targets, indices, &features, random_thresholds.as_deref(), &stats);
        (stats, split)
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        targets: &Targets,
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let (stats, split) = self.plan_node(x, targets, indices, depth, rng);
        let Some(split) = split else {
            return self.leaf(&stats);
        };

        let (left_indices, right_indices) = partition(x, indices, &split);
        importances[split.feature_idx] += n_samples as f64 * split.gain;

        let left = Box::new(self.build_tree(x, targets, &left_indices, depth + 1, importances, rng));
        let right = Box::new(self.build_tree(x, targets, &right_indices, depth + 1, importances, rng));

        TreeNode::Split {
            feature_idx: split.feature_idx,
            threshold: split.threshold,
            left,
            right,
            n_samples,
            impurity: stats.impurity(self.criterion),
        }
    }

    /// Expand the open leaf with the largest weighted impurity decrease until
    /// `max_leaves` leaves exist or nothing can split
    fn build_best_first(
        &self,
        x: &Array2<f64>,
        targets: &Targets,
        indices: Vec<usize>,
        max_leaves: usize,
        importances: &mut [f64],
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let mut arena = Vec::new();
        let mut frontier = Vec::new();
        self.open_node(x, targets, indices, 0, &mut arena, &mut frontier, rng);

        let mut n_leaves = 1;
        while n_leaves < max_leaves {
            // Earliest opened leaf wins ties
            let mut next: Option<(usize, f64)> = None;
            for (pos, open) in frontier.iter().enumerate() {
                let improvement = open.indices.len() as f64 * open.split.gain;
                if next.map_or(true, |(_, best)| improvement > best) {
                    next = Some((pos, improvement));
                }
            }
            let Some((pos, improvement)) = next else {
                break;
            };

            let Frontier { slot, indices, depth, impurity, split } = frontier.remove(pos);
            importances[split.feature_idx] += improvement;
            let (left_indices, right_indices) = partition(x, &indices, &split);
            let left = self.open_node(x, targets, left_indices, depth + 1, &mut arena, &mut frontier, rng);
            let right = self.open_node(x, targets, right_indices, depth + 1, &mut arena, &mut frontier, rng);
            arena[slot] = Grown::Split {
                feature_idx: split.feature_idx,
                threshold: split.threshold,
                n_samples: indices.len(),
                impurity,
                left,
                right,
            };
            n_leaves += 1;
        }

        assemble(&arena, 0)
    }

    /// Add a leaf to the arena and queue it when it can split
    #[allow(clippy::too_many_arguments)]
    fn open_node(
        &self,
        x: &Array2<f64>,
        targets: &Targets,
        indices: Vec<usize>,
        depth: usize,
        arena: &mut Vec<Grown>,
        frontier: &mut Vec<Frontier>,
        rng: &mut ChaCha8Rng,
    ) -> usize {
        let (stats, split) = self.plan_node(x, targets, &indices, depth, rng);
        let slot = arena.len();
        arena.push(Grown::Leaf(self.leaf(&stats)));
        if let Some(split) = split {
            frontier.push(Frontier {
                slot,
                indices,
                depth,
                impurity: stats.impurity(self.criterion),
                split,
            });
        }
        slot
    }

    fn leaf(&self, stats: &NodeStats) -> TreeNode {
        let value = if self.is_classification {
            // Majority class; ties go to the smallest label
            let mut best = 0;
            for (c, &count) in stats.class_counts.iter().enumerate() {
                if count > stats.class_counts[best] {
                    best = c;
                }
            }
            self.classes.get(best).copied().unwrap_or(0.0)
        } else if stats.count > 0 {
            stats.sum / stats.count as f64
        } else {
            0.0
        };
        TreeNode::Leaf {
            value,
            n_samples: stats.count,
        }
    }

    fn candidate_features(&self, rng: &mut ChaCha8Rng) -> Vec<usize> {
        let k = self.max_features.resolve(self.n_features);
        if k >= self.n_features {
            return (0..self.n_features).collect();
        }
        let mut features = sample(rng, self.n_features, k).into_vec();
        features.sort_unstable();
        features
    }

    fn find_best_split(
        &self,
        x: &Array2<f64>,
        targets: &Targets,
        indices: &[usize],
        features: &[usize],
        random_thresholds: Option<&[Option<f64>]>,
        parent: &NodeStats,
    ) -> Option<BestSplit> {
        let parent_impurity = parent.impurity(self.criterion);
        let n = indices.len() as f64;

        // Each feature finds its best split independently
        let per_feature: Vec<Option<BestSplit>> = features
            .par_iter()
            .enumerate()
            .map(|(pos, &feature_idx)| match random_thresholds {
                Some(thresholds) => thresholds[pos].and_then(|threshold| {
                    self.evaluate_threshold(x, targets, indices, feature_idx, threshold, parent_impurity, n)
                }),
                None => self.scan_feature(x, targets, indices, feature_idx, parent, parent_impurity, n),
            })
            .collect();

        let mut best: Option<BestSplit> = None;
        for split in per_feature.into_iter().flatten() {
            if best.map_or(true, |b| split.gain > b.gain) {
                best = Some(split);
            }
        }
        best
    }

    /// Sorted sweep over every distinct value of one feature
    #[allow(clippy::too_many_arguments)]
    fn scan_feature(
        &self,
        x: &Array2<f64>,
        targets: &Targets,
        indices: &[usize],
        feature_idx: usize,
        parent: &NodeStats,
        parent_impurity: f64,
        n: f64,
    ) -> Option<BestSplit> {
        let mut order = indices.to_vec();
        order.sort_by(|&a, &b| {
            x[[a, feature_idx]]
                .partial_cmp(&x[[b, feature_idx]])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut left = NodeStats::new(self.classes.len());
        let mut right = parent.clone();
        let mut best: Option<BestSplit> = None;

        for pos in 0..order.len().saturating_sub(1) {
            let i = order[pos];
            left.add(targets.y[i], targets.class_of(i));
            right.remove(targets.y[i], targets.class_of(i));

            let value = x[[i, feature_idx]];
            let next = x[[order[pos + 1], feature_idx]];
            if next <= value {
                continue;
            }
            if left.count < self.min_samples_leaf || right.count < self.min_samples_leaf {
                continue;
            }

            let gain = self.split_gain(&left, &right, parent_impurity, n);
            if gain > 0.0 && best.map_or(true, |b| gain > b.gain) {
                best = Some(BestSplit {
                    feature_idx,
                    threshold: (value + next) / 2.0,
                    gain,
                });
            }
        }
        best
    }

    #[allow(clippy::too_many_arguments)]
    fn evaluate_threshold(
        &self,
        x: &Array2<f64>,
        targets: &Targets,
        indices: &[usize],
        feature_idx: usize,
        threshold: f64,
        parent_impurity: f64,
        n: f64,
    ) -> Option<BestSplit> {
        let mut left = NodeStats::new(self.classes.len());
        let mut right = NodeStats::new(self.classes.len());
        for &i in indices {
            if x[[i, feature_idx]] <= threshold {
                left.add(targets.y[i], targets.class_of(i));
            } else {
                right.add(targets.y[i], targets.class_of(i));
            }
        }
        if left.count < self.min_samples_leaf || right.count < self.min_samples_leaf {
            return None;
        }
        let gain = self.split_gain(&left, &right, parent_impurity, n);
        (gain > 0.0).then_some(BestSplit {
            feature_idx,
            threshold,
            gain,
        })
    }

    /// Impurity decrease of a split, per sample of the node
    fn split_gain(&self, left: &NodeStats, right: &NodeStats, parent_impurity: f64, n: f64) -> f64 {
        let (n_left, n_right) = (left.count as f64, right.count as f64);
        match self.criterion {
            // n_l·n_r/n · (mean_l - mean_r)², scaled by 1/n like the weighted decrease
            Criterion::FriedmanMSE => {
                let diff = left.sum / n_left - right.sum / n_right;
                n_left * n_right * diff * diff / (n * n)
            }
            criterion => {
                parent_impurity
                    - (n_left * left.impurity(criterion) + n_right * right.impurity(criterion)) / n
            }
        }
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(NetworkSecurityError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(NetworkSecurityError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        Ok(x.outer_iter().map(|row| predict_row(root, row)).collect())
    }

    pub fn is_fitted(&self) -> bool {
        self.root.is_some()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Class labels seen during fit
    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }

    pub fn get_n_leaves(&self) -> usize {
        fn leaves(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => leaves(left) + leaves(right),
            }
        }
        self.root.as_ref().map_or(0, leaves)
    }
}

fn predict_row(node: &TreeNode, row: ArrayView1<f64>) -> f64 {
    match node {
        TreeNode::Leaf { value, .. } => *value,
        TreeNode::Split {
            feature_idx,
            threshold,
            left,
            right,
            ..
        } => {
            if row[*feature_idx] <= *threshold {
                predict_row(left, row)
            } else {
                predict_row(right, row)
            }
        }
    }
}

fn partition(x: &Array2<f64>, indices: &[usize], split: &BestSplit) -> (Vec<usize>, Vec<usize>) {
    indices
        .iter()
        .partition(|&&i| x[[i, split.feature_idx]] <= split.threshold)
}

fn assemble(arena: &[Grown], slot: usize) -> TreeNode {
    match &arena[slot] {
        Grown::Leaf(leaf) => leaf.clone(),
        Grown::Split {
            feature_idx,
            threshold,
            n_samples,
            impurity,
            left,
            right,
        } => TreeNode::Split {
            feature_idx: *feature_idx,
            threshold: *threshold,
            left: Box::new(assemble(arena, *left)),
            right: Box::new(assemble(arena, *right)),
            n_samples: *n_samples,
            impurity: *impurity,
        },
    }
}

fn is_pure(y: &Array1<f64>, indices: &[usize]) -> bool {
    match indices.first() {
        None => true,
        Some(&first) => indices.iter().all(|&i| (y[i] - y[first]).abs() < 1e-10),
    }
}

/// Uniform threshold strictly inside the node's value range, if it has one
fn random_threshold(x: &Array2<f64>, indices: &[usize], feature_idx: usize, rng: &mut ChaCha8Rng) -> Option<f64> {
    let (lo, hi) = indices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
        let v = x[[i, feature_idx]];
        (lo.min(v), hi.max(v))
    });
    if hi > lo {
        Some(rng.gen_range(lo..hi))
    } else {
        None
    }
}

/// Sorted distinct labels
pub(crate) fn unique_sorted(y: &Array1<f64>) -> Vec<f64> {
    let mut classes: Vec<f64> = y.iter().copied().collect();
    classes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    classes.dedup();
    classes
}

pub(crate) fn class_position(classes: &[f64], value: f64) -> usize {
    classes
        .iter()
        .position(|c| (*c - value).abs() < 1e-10)
        .unwrap_or(0)
}
