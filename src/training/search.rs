//! Hyperparameter search over a catalog and best-model selection

use super::catalog::SearchSpec;
use super::classifier::Classifier;
use super::cross_validation::{CVStrategy, CrossValidator};
use super::params::Params;
use crate::constants::DEFAULT_RANDOM_STATE;
use crate::error::{NetworkSecurityError, Result};
use crate::metrics::{accuracy_score, ScoringMetric};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// How candidates are drawn from a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Every combination
    Grid,
    /// `n_iter` distinct combinations from a seeded RNG
    Randomized { n_iter: usize },
}

impl Default for SearchStrategy {
    fn default() -> Self {
        SearchStrategy::Grid
    }
}

/// Search settings shared by every catalog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub strategy: SearchStrategy,
    pub cv_folds: usize,
    /// Metric for the refit model on the test split
    pub scoring: ScoringMetric,
    pub random_state: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            strategy: SearchStrategy::Grid,
            cv_folds: 3,
            scoring: ScoringMetric::R2,
            random_state: DEFAULT_RANDOM_STATE,
        }
    }
}

/// Result for one catalog entry
#[derive(Debug, Clone)]
pub struct ReportEntry {
    pub name: String,
    /// Held-out score of the refit model
    pub score: f64,
    /// Mean cross-validation accuracy of the chosen candidate
    pub cv_score: f64,
    pub best_params: Params,
    /// Estimator refit on the full training split
    pub model: Classifier,
}

/// Per-model scores in catalog order
#[derive(Debug, Clone, Default)]
pub struct ModelReport {
    entries: Vec<ReportEntry>,
}

impl ModelReport {
    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(name, score)` pairs in catalog order
    pub fn scores(&self) -> Vec<(&str, f64)> {
        self.entries.iter().map(|e| (e.name.as_str(), e.score)).collect()
    }

    /// Index of the winning entry
    pub fn best_index(&self) -> Result<usize> {
        select_best(self.entries.iter().map(|e| e.score)).ok_or_else(|| {
            NetworkSecurityError::TrainingError(
                "model report has no entry with a comparable score".to_string(),
            )
        })
    }

    pub fn best(&self) -> Result<&ReportEntry> {
        Ok(&self.entries[self.best_index()?])
    }

    pub fn into_best(mut self) -> Result<ReportEntry> {
        let idx = self.best_index()?;
        Ok(self.entries.swap_remove(idx))
    }
}

/// First index holding the maximum score; NaN never wins
pub fn select_best<I: IntoIterator<Item = f64>>(scores: I) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, score) in scores.into_iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, b)| score > b) {
            best = Some((idx, score));
        }
    }
    best.map(|(idx, _)| idx)
}

/// Search each catalog entry, refit the best candidate and score it on the test split
pub fn evaluate_models(
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    x_test: &Array2<f64>,
    y_test: &Array1<f64>,
    catalog: &[SearchSpec],
    config: &SearchConfig,
) -> Result<ModelReport> {
    if x_train.nrows() != y_train.len() || x_test.nrows() != y_test.len() {
        return Err(NetworkSecurityError::ShapeError {
            expected: "one label per row".to_string(),
            actual: format!(
                "train {}x{} / {} labels, test {}x{} / {} labels",
                x_train.nrows(),
                x_train.ncols(),
                y_train.len(),
                x_test.nrows(),
                x_test.ncols(),
                y_test.len()
            ),
        });
    }

    let splits = CrossValidator::new(CVStrategy::StratifiedKFold {
        n_splits: config.cv_folds,
        shuffle: false,
    })
    .split(y_train)?;

    let mut entries = Vec::with_capacity(catalog.len());
    for spec in catalog {
        let start = Instant::now();
        let base = spec.base_estimator(config.random_state)?;
        let candidates = match config.strategy {
            SearchStrategy::Grid => spec.grid.grid_candidates()?,
            SearchStrategy::Randomized { n_iter } => {
                spec.grid.sampled_candidates(n_iter, config.random_state)?
            }
        };
        info!(
            model = %spec.name,
            candidates = candidates.len(),
            folds = splits.len(),
            "searching hyperparameters"
        );

        let mut best: Option<(Params, f64)> = None;
        for params in candidates {
            let candidate = base.with_params(&params)?;
            let mut fold_scores = Vec::with_capacity(splits.len());
            for split in &splits {
                let mut model = candidate.clone();
                model.fit(
                    &x_train.select(Axis(0), &split.train_indices),
                    &y_train.select(Axis(0), &split.train_indices),
                )?;
                let pred = model.predict(&x_train.select(Axis(0), &split.test_indices))?;
                fold_scores.push(accuracy_score(&y_train.select(Axis(0), &split.test_indices), &pred)?);
            }
            let mean = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
            debug!(model = %spec.name, params = %params, cv_score = mean, "candidate scored");
            if best.as_ref().map_or(true, |(_, b)| mean > *b) {
                best = Some((params, mean));
            }
        }

        let (best_params, cv_score) = best.ok_or_else(|| {
            NetworkSecurityError::TrainingError(format!("no candidates for {}", spec.name))
        })?;

        let mut model = base.with_params(&best_params)?;
        model.fit(x_train, y_train)?;
        let score = config.scoring.score(y_test, &model.predict(x_test)?)?;

        info!(
            model = %spec.name,
            best_params = %best_params,
            cv_score,
            test_score = score,
            metric = %config.scoring,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "model evaluated"
        );

        entries.push(ReportEntry {
            name: spec.name.clone(),
            score,
            cv_score,
            best_params,
            model,
        });
    }

    Ok(ModelReport { entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::catalog::SearchSpec;
    use crate::training::classifier::ModelKind;
    use crate::training::params::{ParamGrid, ParamValue};

    fn data(n: usize, offset: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 3), |(i, j)| (((i + offset) * (j + 2) + j) % 3) as f64 - 1.0);
        let y = Array1::from_shape_fn(n, |i| if x[[i, 0]] + x[[i, 1]] >= 0.0 { 1.0 } else { 0.0 });
        (x, y)
    }

    #[test]
    fn test_select_best_first_maximum() {
        assert_eq!(select_best([0.5, 0.9, 0.9, 0.1]), Some(1));
        assert_eq!(select_best([f64::NAN, 0.2, f64::NAN]), Some(1));
        assert_eq!(select_best([f64::NAN]), None);
        assert_eq!(select_best(Vec::<f64>::new()), None);
    }

    #[test]
    fn test_evaluate_models_reports_in_catalog_order() {
        let (x_train, y_train) = data(45, 0);
        let (x_test, y_test) = data(15, 100);
        let catalog = vec![
            SearchSpec::new(
                "Decision Tree",
                ModelKind::DecisionTree,
                ParamGrid::new().with("max_depth", [ParamValue::Int(1), ParamValue::None]),
            ),
            SearchSpec::new(
                "Logistic Regression",
                ModelKind::LogisticRegression,
                ParamGrid::new().with("C", [1.0]),
            ),
        ];

        let report = evaluate_models(&x_train, &y_train, &x_test, &y_test, &catalog, &SearchConfig::default())
            .unwrap();

        assert_eq!(report.len(), 2);
        assert_eq!(report.scores()[0].0, "Decision Tree");
        assert_eq!(report.scores()[1].0, "Logistic Regression");
        // Both depths separate the data, so the first candidate keeps the tie
        assert_eq!(report.entries()[0].best_params.get("max_depth"), Some(&ParamValue::Int(1)));
        assert_eq!(report.entries()[0].score, 1.0);

        let best = report.best().unwrap();
        let max = report.scores().iter().map(|(_, s)| *s).fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(best.score, max);
    }

    #[test]
    fn test_invalid_grid_value_aborts() {
        let (x, y) = data(30, 0);
        let catalog = vec![SearchSpec::new(
            "Gradient Boosting",
            ModelKind::GradientBoosting,
            ParamGrid::new().with("learning_rate", [0.0]),
        )];
        let err = evaluate_models(&x, &y, &x, &y, &catalog, &SearchConfig::default()).unwrap_err();
        assert!(matches!(err, NetworkSecurityError::InvalidParameter { .. }));
    }

    #[test]
    fn test_randomized_strategy_limits_candidates() {
        let (x, y) = data(30, 0);
        let catalog = vec![SearchSpec::new(
            "AdaBoost",
            ModelKind::AdaBoost,
            ParamGrid::new()
                .with("n_estimators", [2i64, 4, 8])
                .with("learning_rate", [0.5, 1.0]),
        )];
        let config = SearchConfig {
            strategy: SearchStrategy::Randomized { n_iter: 2 },
            scoring: ScoringMetric::Accuracy,
            ..SearchConfig::default()
        };
        let report = evaluate_models(&x, &y, &x, &y, &catalog, &config).unwrap();
        let score = report.best().unwrap().score;
        assert!((0.0..=1.0).contains(&score));
    }
}
