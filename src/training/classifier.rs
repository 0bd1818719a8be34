//! Uniform wrapper over the native classifiers

use super::adaboost::AdaBoostClassifier;
use super::decision_tree::DecisionTree;
use super::gradient_boosting::GradientBoostingClassifier;
use super::linear_models::LogisticRegression;
use super::params::Params;
use super::random_forest::RandomForest;
use crate::error::{NetworkSecurityError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Estimator family of a catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    RandomForest,
    DecisionTree,
    GradientBoosting,
    LogisticRegression,
    AdaBoost,
}

impl ModelKind {
    /// Estimator class name, as recorded on tracking runs
    pub fn estimator_name(&self) -> &'static str {
        match self {
            ModelKind::RandomForest => "RandomForestClassifier",
            ModelKind::DecisionTree => "DecisionTreeClassifier",
            ModelKind::GradientBoosting => "GradientBoostingClassifier",
            ModelKind::LogisticRegression => "LogisticRegression",
            ModelKind::AdaBoost => "AdaBoostClassifier",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.estimator_name())
    }
}

/// A classifier of any supported family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Classifier {
    RandomForest(RandomForest),
    DecisionTree(DecisionTree),
    GradientBoosting(GradientBoostingClassifier),
    LogisticRegression(LogisticRegression),
    AdaBoost(AdaBoostClassifier),
}

impl Classifier {
    /// Untrained estimator with default hyperparameters
    pub fn new(kind: ModelKind, random_state: u64) -> Self {
        match kind {
            ModelKind::RandomForest => {
                Classifier::RandomForest(RandomForest::default().with_random_state(random_state))
            }
            ModelKind::DecisionTree => {
                Classifier::DecisionTree(DecisionTree::new_classifier().with_random_state(random_state))
            }
            ModelKind::GradientBoosting => {
                let mut model = GradientBoostingClassifier::default();
                model.config.random_state = Some(random_state);
                Classifier::GradientBoosting(model)
            }
            ModelKind::LogisticRegression => Classifier::LogisticRegression(LogisticRegression::new()),
            ModelKind::AdaBoost => Classifier::AdaBoost(AdaBoostClassifier::default()),
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            Classifier::RandomForest(_) => ModelKind::RandomForest,
            Classifier::DecisionTree(_) => ModelKind::DecisionTree,
            Classifier::GradientBoosting(_) => ModelKind::GradientBoosting,
            Classifier::LogisticRegression(_) => ModelKind::LogisticRegression,
            Classifier::AdaBoost(_) => ModelKind::AdaBoost,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().estimator_name()
    }

    /// Apply every hyperparameter in `params`; the first bad one aborts
    pub fn set_params(&mut self, params: &Params) -> Result<()> {
        for (name, value) in params.iter() {
            match self {
                Classifier::RandomForest(m) => m.set_param(name, value)?,
                Classifier::DecisionTree(m) => m.set_param(name, value)?,
                Classifier::GradientBoosting(m) => m.set_param(name, value)?,
                Classifier::LogisticRegression(m) => m.set_param(name, value)?,
                Classifier::AdaBoost(m) => m.set_param(name, value)?,
            }
        }
        Ok(())
    }

    /// Fresh copy of this estimator with `params` applied
    pub fn with_params(&self, params: &Params) -> Result<Self> {
        let mut model = self.clone();
        model.set_params(params)?;
        Ok(model)
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            Classifier::RandomForest(m) => m.fit(x, y).map(|_| ()),
            Classifier::DecisionTree(m) => m.fit(x, y).map(|_| ()),
            Classifier::GradientBoosting(m) => m.fit(x, y),
            Classifier::LogisticRegression(m) => m.fit(x, y).map(|_| ()),
            Classifier::AdaBoost(m) => m.fit(x, y).map(|_| ()),
        }
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            Classifier::RandomForest(m) => m.predict(x),
            Classifier::DecisionTree(m) => m.predict(x),
            Classifier::GradientBoosting(m) => m.predict(x),
            Classifier::LogisticRegression(m) => m.predict(x),
            Classifier::AdaBoost(m) => m.predict(x),
        }
    }

    /// Number of input features the fitted model expects
    pub fn n_features(&self) -> Result<usize> {
        let n = match self {
            Classifier::RandomForest(m) if m.is_fitted() => m.n_features(),
            Classifier::DecisionTree(m) if m.is_fitted() => m.n_features(),
            Classifier::GradientBoosting(m) if m.is_fitted() => m.n_features(),
            Classifier::LogisticRegression(m) if m.is_fitted => m.n_features(),
            Classifier::AdaBoost(m) if m.is_fitted => m.n_features(),
            _ => return Err(NetworkSecurityError::ModelNotFitted),
        };
        Ok(n)
    }

    /// Hyperparameters that distinguish this estimator, for run records
    pub fn params(&self) -> Vec<(String, String)> {
        fn opt(v: Option<usize>) -> String {
            v.map_or_else(|| "None".to_string(), |d| d.to_string())
        }
        let pairs: Vec<(&str, String)> = match self {
            Classifier::RandomForest(m) => vec![
                ("n_estimators", m.n_estimators.to_string()),
                ("criterion", format!("{:?}", m.criterion)),
                ("max_features", format!("{:?}", m.max_features)),
                ("max_depth", opt(m.max_depth)),
                ("min_samples_split", m.min_samples_split.to_string()),
                ("min_samples_leaf", m.min_samples_leaf.to_string()),
                ("bootstrap", m.bootstrap.to_string()),
            ],
            Classifier::DecisionTree(m) => vec![
                ("criterion", format!("{:?}", m.criterion)),
                ("splitter", format!("{:?}", m.splitter)),
                ("max_features", format!("{:?}", m.max_features)),
                ("max_depth", opt(m.max_depth)),
                ("max_leaf_nodes", opt(m.max_leaf_nodes)),
                ("min_samples_split", m.min_samples_split.to_string()),
                ("min_samples_leaf", m.min_samples_leaf.to_string()),
            ],
            Classifier::GradientBoosting(m) => vec![
                ("loss", format!("{:?}", m.config.loss)),
                ("criterion", format!("{:?}", m.config.criterion)),
                ("learning_rate", m.config.learning_rate.to_string()),
                ("n_estimators", m.config.n_estimators.to_string()),
                ("subsample", m.config.subsample.to_string()),
                ("max_features", format!("{:?}", m.config.max_features)),
                ("max_depth", opt(m.config.max_depth)),
                ("min_samples_split", m.config.min_samples_split.to_string()),
                ("min_samples_leaf", m.config.min_samples_leaf.to_string()),
            ],
            Classifier::LogisticRegression(m) => vec![
                ("penalty", format!("{:?}", m.penalty)),
                ("C", m.c.to_string()),
                ("l1_ratio", m.l1_ratio.to_string()),
                ("max_iter", m.max_iter.to_string()),
                ("class_weight", format!("{:?}", m.class_weight)),
            ],
            Classifier::AdaBoost(m) => vec![
                ("learning_rate", m.learning_rate.to_string()),
                ("n_estimators", m.n_estimators.to_string()),
            ],
        };
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::params::ParamValue;
    use ndarray::array;

    #[test]
    fn test_every_kind_fits_and_predicts() {
        let x = array![[0.0, 1.0], [0.2, 0.8], [0.1, 0.9], [1.0, 0.0], [0.9, 0.1], [0.8, 0.3]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        for kind in [
            ModelKind::RandomForest,
            ModelKind::DecisionTree,
            ModelKind::GradientBoosting,
            ModelKind::LogisticRegression,
            ModelKind::AdaBoost,
        ] {
            let mut model = Classifier::new(kind, 7);
            assert!(model.n_features().is_err());
            model.fit(&x, &y).unwrap();
            assert_eq!(model.kind(), kind);
            assert_eq!(model.n_features().unwrap(), 2);
            assert_eq!(model.predict(&x).unwrap().len(), 6);
        }
    }

    #[test]
    fn test_every_kind_handles_multiclass_and_signed_labels() {
        let x = Array2::from_shape_fn((30, 2), |(i, j)| (i / 10) as f64 * 4.0 + ((i + j) % 3) as f64 * 0.1);
        let three = Array1::from_shape_fn(30, |i| (i / 10) as f64);
        let signed = Array1::from_shape_fn(30, |i| if i < 15 { -1.0 } else { 1.0 });

        for kind in [
            ModelKind::RandomForest,
            ModelKind::DecisionTree,
            ModelKind::GradientBoosting,
            ModelKind::LogisticRegression,
            ModelKind::AdaBoost,
        ] {
            for y in [&three, &signed] {
                let mut model = Classifier::new(kind, 7);
                model.fit(&x, y).unwrap();
                let pred = model.predict(&x).unwrap();
                assert!(
                    pred.iter().all(|p| y.iter().any(|c| c == p)),
                    "{} predicted an unseen label",
                    kind
                );
            }
        }
    }

    #[test]
    fn test_set_params_applies_in_order() {
        let params = Params(vec![
            ("max_depth".to_string(), ParamValue::Int(3)),
            ("criterion".to_string(), ParamValue::from("entropy")),
        ]);
        let model = Classifier::new(ModelKind::DecisionTree, 0).with_params(&params).unwrap();
        let recorded = model.params();
        assert!(recorded.contains(&("max_depth".to_string(), "3".to_string())));
        assert!(recorded.contains(&("criterion".to_string(), "Entropy".to_string())));
    }

    #[test]
    fn test_unknown_param_rejected() {
        let params = Params(vec![("kernel".to_string(), ParamValue::from("rbf"))]);
        let err = Classifier::new(ModelKind::LogisticRegression, 0)
            .with_params(&params)
            .unwrap_err();
        assert!(matches!(err, NetworkSecurityError::InvalidParameter { .. }));
    }

    #[test]
    fn test_names() {
        assert_eq!(Classifier::new(ModelKind::AdaBoost, 0).name(), "AdaBoostClassifier");
        assert_eq!(ModelKind::RandomForest.to_string(), "RandomForestClassifier");
    }
}
