//! AdaBoost (Adaptive Boosting) implementation
//!
//! AdaBoost builds an ensemble of weak learners (decision stumps), weighting
//! misclassified samples more heavily in subsequent rounds.

use super::decision_tree::{class_position, unique_sorted};
use super::params::{expect_positive, expect_str, expect_usize, invalid_param, unknown_param, ParamValue};
use crate::error::{NetworkSecurityError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A single decision stump: splits on one feature at one threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Stump {
    feature_index: usize,
    threshold: f64,
    /// Class position predicted when feature <= threshold
    left_class: usize,
    /// Class position predicted when feature > threshold
    right_class: usize,
}

impl Stump {
    fn predict_row(&self, row: ArrayView1<f64>) -> usize {
        if row[self.feature_index] <= self.threshold {
            self.left_class
        } else {
            self.right_class
        }
    }
}

/// AdaBoost Classifier (SAMME, supports multi-class)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaBoostClassifier {
    pub n_estimators: usize,
    pub learning_rate: f64,
    stumps: Vec<Stump>,
    alphas: Vec<f64>,
    classes: Vec<f64>,
    n_features: usize,
    pub is_fitted: bool,
}

impl Default for AdaBoostClassifier {
    fn default() -> Self {
        Self::new(50, 1.0)
    }
}

impl AdaBoostClassifier {
    pub fn new(n_estimators: usize, learning_rate: f64) -> Self {
        Self {
            n_estimators,
            learning_rate,
            stumps: Vec::new(),
            alphas: Vec::new(),
            classes: Vec::new(),
            n_features: 0,
            is_fitted: false,
        }
    }

    /// Apply one named hyperparameter
    pub fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match name {
            "n_estimators" => self.n_estimators = expect_usize(name, value, 1)?,
            "learning_rate" => self.learning_rate = expect_positive(name, value)?,
            "algorithm" => {
                if expect_str(name, value)? != "SAMME" {
                    return Err(invalid_param(name, value, "only SAMME is supported"));
                }
            }
            _ => return Err(unknown_param("AdaBoostClassifier", name)),
        }
        Ok(())
    }

    /// Best stump under the current sample weights, with its weighted error
    fn fit_stump(x: &Array2<f64>, class_idx: &[usize], weights: &Array1<f64>, n_classes: usize) -> (Stump, f64) {
        let mut class_totals = vec![0.0; n_classes];
        for (i, &c) in class_idx.iter().enumerate() {
            class_totals[c] += weights[i];
        }
        let total: f64 = class_totals.iter().sum();

        let per_feature: Vec<Option<(Stump, f64)>> = (0..x.ncols())
            .into_par_iter()
            .map(|f| {
                let col = x.column(f);
                let mut order: Vec<usize> = (0..x.nrows()).collect();
                order.sort_by(|&a, &b| col[a].partial_cmp(&col[b]).unwrap_or(std::cmp::Ordering::Equal));

                let mut left = vec![0.0; n_classes];
                let mut best: Option<(Stump, f64)> = None;
                for pos in 0..order.len().saturating_sub(1) {
                    let i = order[pos];
                    left[class_idx[i]] += weights[i];
                    let (value, next) = (col[i], col[order[pos + 1]]);
                    if next <= value {
                        continue;
                    }
                    let (left_class, right_class, correct) = best_label_pair(&left, &class_totals);
                    let error = total - correct;
                    if best.as_ref().map_or(true, |(_, e)| error < *e) {
                        best = Some((
                            Stump {
                                feature_index: f,
                                threshold: (value + next) / 2.0,
                                left_class,
                                right_class,
                            },
                            error,
                        ));
                    }
                }
                best
            })
            .collect();

        let mut best: Option<(Stump, f64)> = None;
        for candidate in per_feature.into_iter().flatten() {
            if best.as_ref().map_or(true, |(_, e)| candidate.1 < *e) {
                best = Some(candidate);
            }
        }

        // Constant features: fall back to the weighted majority class
        best.unwrap_or_else(|| {
            let mut majority = 0;
            for (c, &w) in class_totals.iter().enumerate() {
                if w > class_totals[majority] {
                    majority = c;
                }
            }
            let error = total - class_totals[majority];
            (
                Stump {
                    feature_index: 0,
                    threshold: f64::INFINITY,
                    left_class: majority,
                    right_class: majority,
                },
                error,
            )
        })
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(NetworkSecurityError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 || x.ncols() == 0 {
            return Err(NetworkSecurityError::ValidationError(
                "cannot fit AdaBoost on an empty matrix".to_string(),
            ));
        }

        self.classes = unique_sorted(y);
        self.n_features = x.ncols();
        let n_classes = self.classes.len();
        let class_idx: Vec<usize> = y.iter().map(|&v| class_position(&self.classes, v)).collect();
        let mut weights = Array1::from_elem(n_samples, 1.0 / n_samples as f64);

        self.stumps.clear();
        self.alphas.clear();

        for _round in 0..self.n_estimators {
            let (stump, error) = Self::fit_stump(x, &class_idx, &weights, n_classes);
            let error = error / weights.sum();

            if error <= 1e-15 {
                // Perfect fit: this stump alone decides
                self.stumps.push(stump);
                self.alphas.push(1.0);
                break;
            }
            if error >= 1.0 - 1.0 / n_classes as f64 {
                // No better than chance; keep what we have
                if self.stumps.is_empty() {
                    self.stumps.push(stump);
                    self.alphas.push(1.0);
                }
                break;
            }

            let alpha = self.learning_rate
                * (((1.0 - error) / error).ln() + (n_classes as f64 - 1.0).max(1.0).ln());

            for (i, row) in x.outer_iter().enumerate() {
                if stump.predict_row(row) != class_idx[i] {
                    weights[i] *= alpha.exp();
                }
            }
            let w_sum = weights.sum();
            if w_sum > 0.0 {
                weights /= w_sum;
            }

            self.stumps.push(stump);
            self.alphas.push(alpha);
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Weighted vote across stumps; ties go to the smallest label
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(NetworkSecurityError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(NetworkSecurityError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        Ok(x.outer_iter()
            .map(|row| {
                let mut scores = vec![0.0f64; self.classes.len()];
                for (stump, &alpha) in self.stumps.iter().zip(self.alphas.iter()) {
                    scores[stump.predict_row(row)] += alpha;
                }
                let mut best = 0;
                for (c, &s) in scores.iter().enumerate() {
                    if s > scores[best] {
                        best = c;
                    }
                }
                self.classes[best]
            })
            .collect())
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_stumps(&self) -> usize {
        self.stumps.len()
    }
}

/// Distinct (left, right) labels maximising the correctly classified weight
fn best_label_pair(left: &[f64], totals: &[f64]) -> (usize, usize, f64) {
    let n_classes = left.len();
    if n_classes == 1 {
        return (0, 0, totals[0]);
    }
    let mut best = (0, 1, f64::NEG_INFINITY);
    for a in 0..n_classes {
        for b in 0..n_classes {
            if a == b {
                continue;
            }
            let correct = left[a] + (totals[b] - left[b]);
            if correct > best.2 {
                best = (a, b, correct);
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn accuracy(model: &AdaBoostClassifier, x: &Array2<f64>, y: &Array1<f64>) -> f64 {
        let preds = model.predict(x).unwrap();
        preds.iter().zip(y.iter()).filter(|(p, a)| p == a).count() as f64 / y.len() as f64
    }

    #[test]
    fn test_adaboost_binary() {
        let x = array![[1.0, 2.0], [2.0, 3.0], [3.0, 4.0], [6.0, 7.0], [7.0, 8.0], [8.0, 9.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let mut model = AdaBoostClassifier::new(10, 1.0);
        model.fit(&x, &y).unwrap();
        assert!(model.is_fitted);
        assert_eq!(accuracy(&model, &x, &y), 1.0);
    }

    #[test]
    fn test_adaboost_combines_stumps() {
        // Positive only inside the band 2 < x0 <= 5: needs more than one stump
        let x = Array2::from_shape_fn((16, 1), |(i, _)| i as f64 * 0.5);
        let y = x.column(0).mapv(|v| if v > 2.0 && v <= 5.0 { 1.0 } else { 0.0 });
        let mut model = AdaBoostClassifier::new(30, 1.0);
        model.fit(&x, &y).unwrap();

        assert!(model.n_stumps() > 1);
        assert!(accuracy(&model, &x, &y) >= 0.9);
    }

    #[test]
    fn test_adaboost_multiclass() {
        let x = array![[0.0], [1.0], [2.0], [10.0], [11.0], [12.0], [20.0], [21.0], [22.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0];
        let mut model = AdaBoostClassifier::new(20, 0.5);
        model.fit(&x, &y).unwrap();
        assert!(accuracy(&model, &x, &y) >= 0.66);
    }

    #[test]
    fn test_set_param() {
        let mut model = AdaBoostClassifier::default();
        model.set_param("learning_rate", &ParamValue::Float(0.5)).unwrap();
        model.set_param("algorithm", &"SAMME".into()).unwrap();
        assert_eq!(model.learning_rate, 0.5);
        assert!(model.set_param("algorithm", &"SAMME.R".into()).is_err());
        assert!(model.set_param("max_depth", &ParamValue::Int(1)).is_err());
    }
}
