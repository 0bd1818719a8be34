//! Random Forest implementation

use super::decision_tree::{class_position, unique_sorted, Criterion, DecisionTree, MaxFeatures};
use super::params::{
    expect_bool, expect_opt_usize, expect_str, expect_usize, invalid_param, unknown_param, ParamValue,
};
use crate::constants::DEFAULT_RANDOM_STATE;
use crate::error::{NetworkSecurityError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Random Forest classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split (sqrt by default)
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub criterion: Criterion,
    pub random_state: Option<u64>,
    feature_importances: Option<Array1<f64>>,
    n_features: usize,
    classes: Vec<f64>,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new_classifier(100)
    }
}

impl RandomForest {
    pub fn new_classifier(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            criterion: Criterion::Gini,
            random_state: None,
            feature_importances: None,
            n_features: 0,
            classes: Vec::new(),
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Apply one named hyperparameter
    pub fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match name {
            "n_estimators" => self.n_estimators = expect_usize(name, value, 1)?,
            "criterion" => {
                self.criterion = Criterion::parse(expect_str(name, value)?)
                    .filter(|c| !c.is_regression())
                    .ok_or_else(|| invalid_param(name, value, "expected gini, entropy or log_loss"))?;
            }
            "max_features" => self.max_features = MaxFeatures::from_param(name, value)?,
            "max_depth" => self.max_depth = expect_opt_usize(name, value, 1)?,
            "min_samples_split" => self.min_samples_split = expect_usize(name, value, 2)?,
            "min_samples_leaf" => self.min_samples_leaf = expect_usize(name, value, 1)?,
            "bootstrap" => self.bootstrap = expect_bool(name, value)?,
            _ => return Err(unknown_param("RandomForestClassifier", name)),
        }
        Ok(())
    }

    /// Fit the forest to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(NetworkSecurityError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(NetworkSecurityError::ValidationError(
                "cannot fit a random forest on zero samples".to_string(),
            ));
        }

        self.n_features = n_features;
        self.classes = unique_sorted(y);

        let base_seed = self.random_state.unwrap_or(DEFAULT_RANDOM_STATE);

        // Trees are independent; each owns an RNG derived from its index
        let trees: Vec<DecisionTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(tree_idx as u64));

                let sample_indices: Vec<usize> = if self.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };
                let x_sample = x.select(Axis(0), &sample_indices);
                let y_sample = y.select(Axis(0), &sample_indices);

                let mut tree = DecisionTree::new_classifier()
                    .with_criterion(self.criterion)
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_max_features(self.max_features)
                    .with_random_state(rng.gen());
                tree.max_depth = self.max_depth;
                tree.fit(&x_sample, &y_sample)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut importances = Array1::<f64>::zeros(n_features);
        for tree in &trees {
            if let Some(imp) = tree.feature_importances() {
                importances += imp;
            }
        }
        let total = importances.sum();
        if total > 0.0 {
            importances /= total;
        }

        self.trees = trees;
        self.feature_importances = Some(importances);
        Ok(self)
    }

    /// Majority vote across trees; ties go to the smallest label
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(NetworkSecurityError::ModelNotFitted);
        }

        let all_predictions: Vec<Array1<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<Vec<_>>>()?;

        let n_classes = self.classes.len();
        Ok((0..x.nrows())
            .map(|i| {
                let mut votes = vec![0usize; n_classes];
                for preds in &all_predictions {
                    votes[class_position(&self.classes, preds[i])] += 1;
                }
                let mut best = 0;
                for (c, &count) in votes.iter().enumerate() {
                    if count > votes[best] {
                        best = c;
                    }
                }
                self.classes[best]
            })
            .collect())
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }
}
