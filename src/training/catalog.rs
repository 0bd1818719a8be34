//! Declarative table of candidate classifiers and their grids

use super::classifier::{Classifier, ModelKind};
use super::params::{ParamGrid, ParamValue};
use serde::{Deserialize, Serialize};

/// One catalog entry: a named estimator family and the grid searched for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpec {
    pub name: String,
    pub kind: ModelKind,
    /// Overrides applied to the untrained estimator before searching
    #[serde(default)]
    pub base: ParamGrid,
    #[serde(default)]
    pub grid: ParamGrid,
}

impl SearchSpec {
    pub fn new(name: &str, kind: ModelKind, grid: ParamGrid) -> Self {
        Self {
            name: name.to_string(),
            kind,
            base: ParamGrid::new(),
            grid,
        }
    }

    /// Fix a hyperparameter on the base estimator (single value)
    pub fn with_base(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.base = self.base.with(name, [value.into()]);
        self
    }

    /// Untrained estimator carrying the base overrides
    pub fn base_estimator(&self, random_state: u64) -> crate::error::Result<Classifier> {
        let mut model = Classifier::new(self.kind, random_state);
        for params in self.base.grid_candidates()? {
            model.set_params(&params)?;
        }
        Ok(model)
    }
}

fn none_or<I: IntoIterator<Item = i64>>(values: I) -> Vec<ParamValue> {
    std::iter::once(ParamValue::None)
        .chain(values.into_iter().map(ParamValue::Int))
        .collect()
}

/// The five classifier families searched by default, in selection order
pub fn default_catalog() -> Vec<SearchSpec> {
    let n_estimators = [8i64, 16, 32, 64, 128, 256, 512];
    let split_leaf = |grid: ParamGrid| {
        grid.with("min_samples_split", [2i64, 5, 10])
            .with("min_samples_leaf", [1i64, 2, 4])
    };

    vec![
        SearchSpec::new(
            "Random Forest",
            ModelKind::RandomForest,
            split_leaf(
                ParamGrid::new()
                    .with("criterion", ["gini", "entropy", "log_loss"])
                    .with("max_features", [ParamValue::from("sqrt"), "log2".into(), ParamValue::None])
                    .with("n_estimators", n_estimators)
                    .with("max_depth", none_or([10, 20, 30, 50])),
            )
            .with("bootstrap", [true, false]),
        ),
        SearchSpec::new(
            "Decision Tree",
            ModelKind::DecisionTree,
            split_leaf(
                ParamGrid::new()
                    .with("criterion", ["gini", "entropy", "log_loss"])
                    .with("splitter", ["best", "random"])
                    .with("max_features", [ParamValue::from("sqrt"), "log2".into(), ParamValue::None])
                    .with("max_depth", none_or([10, 20, 30, 50])),
            )
            .with("max_leaf_nodes", none_or([10, 20, 50])),
        ),
        SearchSpec::new(
            "Gradient Boosting",
            ModelKind::GradientBoosting,
            split_leaf(
                ParamGrid::new()
                    .with("loss", ["log_loss", "exponential"])
                    .with("learning_rate", [0.01, 0.05, 0.1, 0.2, 0.5])
                    .with("subsample", [0.6, 0.7, 0.75, 0.85, 0.9])
                    .with("criterion", ["squared_error", "friedman_mse"])
                    .with("max_features", ["auto", "sqrt", "log2"])
                    .with("n_estimators", n_estimators)
                    .with("max_depth", [3i64, 5, 10, 20]),
            ),
        ),
        SearchSpec::new(
            "Logistic Regression",
            ModelKind::LogisticRegression,
            ParamGrid::new()
                .with("penalty", [ParamValue::from("l1"), "l2".into(), "elasticnet".into(), ParamValue::None])
                .with("C", [0.01, 0.1, 1.0, 10.0, 100.0])
                .with("max_iter", [100i64, 500, 1000])
                .with("class_weight", [ParamValue::None, "balanced".into()]),
        )
        .with_base("max_iter", 1000i64),
        SearchSpec::new(
            "AdaBoost",
            ModelKind::AdaBoost,
            ParamGrid::new()
                .with("learning_rate", [0.01, 0.1, 0.5, 1.0])
                .with("n_estimators", n_estimators),
        ),
    ]
}
