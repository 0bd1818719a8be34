//! Gradient Boosting implementation
//!
//! Gradient boosted decision trees. Each round fits a regression tree to the
//! negative gradient of the loss and adds it, shrunk by the learning rate, to
//! the additive score. More than two classes boost one score per class.

use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use super::decision_tree::{Criterion, DecisionTree, MaxFeatures};
use super::labels::ClassEncoding;
use super::params::{
    expect_fraction, expect_opt_usize, expect_positive, expect_str, expect_usize, invalid_param,
    unknown_param, ParamValue,
};
use crate::constants::DEFAULT_RANDOM_STATE;
use crate::error::{NetworkSecurityError, Result};

/// Loss optimised by the boosting rounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoostingLoss {
    /// Binomial deviance
    LogLoss,
    /// AdaBoost-style exponential loss
    Exponential,
}

/// Gradient Boosting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingConfig {
    pub loss: BoostingLoss,
    /// Split criterion of the regression trees
    pub criterion: Criterion,
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Maximum tree depth, unlimited when `None`
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Row subsample ratio for each tree
    pub subsample: f64,
    /// Features considered per split
    pub max_features: MaxFeatures,
    pub random_state: Option<u64>,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            loss: BoostingLoss::LogLoss,
            criterion: Criterion::FriedmanMSE,
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: Some(3),
            min_samples_split: 2,
            min_samples_leaf: 1,
            subsample: 1.0,
            max_features: MaxFeatures::All,
            random_state: Some(DEFAULT_RANDOM_STATE),
        }
    }
}

/// Additive score of one binary target
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BoostedScore {
    trees: Vec<DecisionTree>,
    initial_score: f64,
}

/// Gradient Boosting Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    pub config: GradientBoostingConfig,
    encoding: ClassEncoding,
    scores: Vec<BoostedScore>,
    n_features: usize,
    feature_importances: Vec<f64>,
}

impl Default for GradientBoostingClassifier {
    fn default() -> Self {
        Self::new(GradientBoostingConfig::default())
    }
}

impl GradientBoostingClassifier {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            encoding: ClassEncoding::default(),
            scores: Vec::new(),
            n_features: 0,
            feature_importances: Vec::new(),
        }
    }

    /// Apply one named hyperparameter
    pub fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        let config = &mut self.config;
        match name {
            "loss" => {
                config.loss = match expect_str(name, value)? {
                    "log_loss" | "deviance" => BoostingLoss::LogLoss,
                    "exponential" => BoostingLoss::Exponential,
                    _ => return Err(invalid_param(name, value, "expected log_loss or exponential")),
                };
            }
            "criterion" => {
                config.criterion = match expect_str(name, value)? {
                    "friedman_mse" => Criterion::FriedmanMSE,
                    "squared_error" => Criterion::MSE,
                    _ => return Err(invalid_param(name, value, "expected friedman_mse or squared_error")),
                };
            }
            "n_estimators" => config.n_estimators = expect_usize(name, value, 1)?,
            "learning_rate" => config.learning_rate = expect_positive(name, value)?,
            "subsample" => config.subsample = expect_fraction(name, value)?,
            "max_depth" => config.max_depth = expect_opt_usize(name, value, 1)?,
            "min_samples_split" => config.min_samples_split = expect_usize(name, value, 2)?,
            "min_samples_leaf" => config.min_samples_leaf = expect_usize(name, value, 1)?,
            "max_features" => config.max_features = MaxFeatures::from_param(name, value)?,
            _ => return Err(unknown_param("GradientBoostingClassifier", name)),
        }
        Ok(())
    }

    /// Fit on any finite class labels
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
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
                "cannot fit gradient boosting on zero samples".to_string(),
            ));
        }

        let encoding = ClassEncoding::fit(y)?;
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(
            self.config.random_state.unwrap_or(DEFAULT_RANDOM_STATE),
        );
        let mut importances = vec![0.0; n_features];
        let mut scores = Vec::with_capacity(encoding.n_models());
        for k in 0..encoding.n_models() {
            let target = encoding.target(y, k);
            scores.push(self.boost(x, &target, &mut rng, &mut importances)?);
        }

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }

        self.encoding = encoding;
        self.scores = scores;
        self.n_features = n_features;
        self.feature_importances = importances;
        Ok(())
    }

    /// Boosting rounds against one 0/1 target
    fn boost(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        rng: &mut Xoshiro256PlusPlus,
        importances: &mut [f64],
    ) -> Result<BoostedScore> {
        let n_samples = x.nrows();
        let p = y.mean().unwrap_or(0.5).clamp(1e-10, 1.0 - 1e-10);
        let log_odds = (p / (1.0 - p)).ln();
        let initial_score = match self.config.loss {
            BoostingLoss::LogLoss => log_odds,
            BoostingLoss::Exponential => 0.5 * log_odds,
        };

        let mut scores = Array1::from_elem(n_samples, initial_score);
        let mut trees = Vec::with_capacity(self.config.n_estimators);

        for _ in 0..self.config.n_estimators {
            let residuals = self.negative_gradient(y, &scores);

            let sample_indices = self.subsample_indices(n_samples, rng);
            let x_sub = x.select(Axis(0), &sample_indices);
            let r_sub = residuals.select(Axis(0), &sample_indices);

            let mut tree = DecisionTree::new_regressor()
                .with_criterion(self.config.criterion)
                .with_min_samples_split(self.config.min_samples_split)
                .with_min_samples_leaf(self.config.min_samples_leaf)
                .with_max_features(self.config.max_features)
                .with_random_state(rng.gen());
            tree.max_depth = self.config.max_depth;
            tree.fit(&x_sub, &r_sub)?;

            // Every row moves, including the ones left out of this round's sample
            let update = tree.predict(x)?;
            scores.scaled_add(self.config.learning_rate, &update);

            if let Some(tree_importance) = tree.feature_importances() {
                for (acc, imp) in importances.iter_mut().zip(tree_importance.iter()) {
                    *acc += imp;
                }
            }

            trees.push(tree);
        }

        Ok(BoostedScore { trees, initial_score })
    }

    fn negative_gradient(&self, y: &Array1<f64>, scores: &Array1<f64>) -> Array1<f64> {
        match self.config.loss {
            BoostingLoss::LogLoss => y
                .iter()
                .zip(scores.iter())
                .map(|(&yi, &f)| yi - sigmoid(f))
                .collect(),
            BoostingLoss::Exponential => y
                .iter()
                .zip(scores.iter())
                .map(|(&yi, &f)| {
                    let signed = 2.0 * yi - 1.0;
                    signed * (-signed * f).exp()
                })
                .collect(),
        }
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(self.encoding.decode(&proba))
    }

    /// Class probabilities, one column per class in sorted label order
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.scores.is_empty() {
            return Err(NetworkSecurityError::ModelNotFitted);
        }

        let mut positive = Vec::with_capacity(self.scores.len());
        for boosted in &self.scores {
            let mut scores = Array1::from_elem(x.nrows(), boosted.initial_score);
            for tree in &boosted.trees {
                scores.scaled_add(self.config.learning_rate, &tree.predict(x)?);
            }
            positive.push(match self.config.loss {
                BoostingLoss::LogLoss => scores.mapv(sigmoid),
                BoostingLoss::Exponential => scores.mapv(|f| sigmoid(2.0 * f)),
            });
        }
        Ok(self.encoding.probabilities(&positive))
    }

    /// Class labels seen during fit
    pub fn classes(&self) -> &[f64] {
        self.encoding.classes()
    }

    pub fn is_fitted(&self) -> bool {
        !self.scores.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    fn subsample_indices(&self, n: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        if self.config.subsample >= 1.0 {
            return (0..n).collect();
        }
        let sample_size = ((n as f64) * self.config.subsample).ceil().max(1.0) as usize;
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(rng);
        indices.truncate(sample_size);
        indices.sort_unstable();
        indices
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((80, 3), |(i, j)| ((i * 7 + j * 13) % 17) as f64 / 17.0);
        let y = x.column(0).mapv(|v| if v > 0.5 { 1.0 } else { 0.0 });
        (x, y)
    }

    fn accuracy(pred: &Array1<f64>, y: &Array1<f64>) -> f64 {
        pred.iter().zip(y.iter()).filter(|(p, a)| p == a).count() as f64 / y.len() as f64
    }

    #[test]
    fn test_log_loss_fits_threshold() {
        let (x, y) = make_data();
        let mut model = GradientBoostingClassifier::new(GradientBoostingConfig {
            n_estimators: 30,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();

        let pred = model.predict(&x).unwrap();
        assert!(accuracy(&pred, &y) > 0.95);

        let proba = model.predict_proba(&x).unwrap();
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_exponential_loss_with_subsample() {
        let (x, y) = make_data();
        let mut model = GradientBoostingClassifier::default();
        model.set_param("loss", &"exponential".into()).unwrap();
        model.set_param("subsample", &ParamValue::Float(0.7)).unwrap();
        model.set_param("n_estimators", &ParamValue::Int(30)).unwrap();
        model.fit(&x, &y).unwrap();

        assert!(accuracy(&model.predict(&x).unwrap(), &y) > 0.9);
    }

    #[test]
    fn test_signed_labels_round_trip() {
        let (x, y01) = make_data();
        let y = y01.mapv(|v| if v == 1.0 { 1.0 } else { -1.0 });
        let mut model = GradientBoostingClassifier::new(GradientBoostingConfig {
            n_estimators: 30,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();

        assert_eq!(model.classes(), &[-1.0, 1.0]);
        let pred = model.predict(&x).unwrap();
        assert!(pred.iter().all(|&p| p == -1.0 || p == 1.0));
        assert!(accuracy(&pred, &y) > 0.95);
    }

    #[test]
    fn test_multiclass_one_score_per_class() {
        let x = Array2::from_shape_fn((90, 2), |(i, j)| ((i * (j + 3)) % 11) as f64 + (i / 30) as f64 * 20.0);
        let y = Array1::from_shape_fn(90, |i| (i / 30) as f64);
        let mut model = GradientBoostingClassifier::new(GradientBoostingConfig {
            n_estimators: 20,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();

        assert_eq!(model.classes(), &[0.0, 1.0, 2.0]);
        let proba = model.predict_proba(&x).unwrap();
        assert_eq!(proba.ncols(), 3);
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
        assert!(accuracy(&model.predict(&x).unwrap(), &y) > 0.95);
    }

    #[test]
    fn test_both_split_criteria_fit() {
        let (x, y) = make_data();
        let mut friedman = GradientBoostingClassifier::new(GradientBoostingConfig {
            n_estimators: 10,
            ..Default::default()
        });
        let mut squared = friedman.clone();
        squared.set_param("criterion", &"squared_error".into()).unwrap();
        assert_eq!(squared.config.criterion, Criterion::MSE);
        assert_eq!(friedman.config.criterion, Criterion::FriedmanMSE);

        friedman.fit(&x, &y).unwrap();
        squared.fit(&x, &y).unwrap();
        assert!(accuracy(&friedman.predict(&x).unwrap(), &y) > 0.95);
        assert!(accuracy(&squared.predict(&x).unwrap(), &y) > 0.95);
    }

    #[test]
    fn test_single_class_training_set() {
        let x = Array2::from_shape_fn((6, 2), |(i, j)| (i + j) as f64);
        let y = Array1::ones(6);
        let mut model = GradientBoostingClassifier::new(GradientBoostingConfig {
            n_estimators: 5,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_invalid_params() {
        let mut model = GradientBoostingClassifier::default();
        assert!(model.set_param("subsample", &ParamValue::Float(1.5)).is_err());
        assert!(model.set_param("learning_rate", &ParamValue::Float(0.0)).is_err());
        assert!(model.set_param("loss", &"hinge".into()).is_err());
        assert!(model.set_param("criterion", &"gini".into()).is_err());
        assert!(model.set_param("bootstrap", &ParamValue::Bool(true)).is_err());
    }
}
