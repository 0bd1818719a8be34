//! Linear classification models

use super::decision_tree::class_position;
use super::labels::ClassEncoding;
use super::params::{expect_positive, expect_str, expect_usize, invalid_param, unknown_param, ParamValue};
use crate::error::{NetworkSecurityError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Regularization term added to the log loss
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Penalty {
    L1,
    L2,
    /// `l1_ratio` · L1 + (1 - `l1_ratio`) · L2
    ElasticNet,
    None,
}

/// Per-class sample weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassWeight {
    Uniform,
    /// Weights inversely proportional to class frequency
    Balanced,
}

/// Logistic regression; one-vs-rest beyond two classes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// One row of weights per binary model
    pub coefficients: Option<Array2<f64>>,
    pub intercepts: Option<Array1<f64>>,
    pub fit_intercept: bool,
    pub penalty: Penalty,
    /// Inverse regularization strength
    pub c: f64,
    /// L1 share of the elastic-net penalty
    pub l1_ratio: f64,
    pub class_weight: ClassWeight,
    pub max_iter: usize,
    /// Convergence tolerance on the gradient norm
    pub tol: f64,
    pub learning_rate: f64,
    pub is_fitted: bool,
    encoding: ClassEncoding,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercepts: None,
            fit_intercept: true,
            penalty: Penalty::L2,
            c: 1.0,
            l1_ratio: 0.5,
            class_weight: ClassWeight::Uniform,
            max_iter: 100,
            tol: 1e-6,
            learning_rate: 0.1,
            is_fitted: false,
            encoding: ClassEncoding::default(),
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn with_penalty(mut self, penalty: Penalty) -> Self {
        self.penalty = penalty;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Apply one named hyperparameter
    pub fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match name {
            "penalty" => {
                self.penalty = match value {
                    ParamValue::None => Penalty::None,
                    _ => match expect_str(name, value)? {
                        "l1" => Penalty::L1,
                        "l2" => Penalty::L2,
                        "elasticnet" => Penalty::ElasticNet,
                        "none" => Penalty::None,
                        _ => return Err(invalid_param(name, value, "expected l1, l2, elasticnet or None")),
                    },
                };
            }
            "C" => self.c = expect_positive(name, value)?,
            "l1_ratio" => {
                self.l1_ratio = match value.as_float() {
                    Some(r) if (0.0..=1.0).contains(&r) => r,
                    _ => return Err(invalid_param(name, value, "expected a number in [0, 1]")),
                };
            }
            "max_iter" => self.max_iter = expect_usize(name, value, 1)?,
            "tol" => self.tol = expect_positive(name, value)?,
            "class_weight" => {
                self.class_weight = match value {
                    ParamValue::None => ClassWeight::Uniform,
                    ParamValue::Str(s) if s == "balanced" => ClassWeight::Balanced,
                    _ => return Err(invalid_param(name, value, "expected None or balanced")),
                };
            }
            "fit_intercept" => {
                self.fit_intercept = value
                    .as_bool()
                    .ok_or_else(|| invalid_param(name, value, "expected a boolean"))?;
            }
            _ => return Err(unknown_param("LogisticRegression", name)),
        }
        Ok(())
    }

    fn sigmoid(z: &Array1<f64>) -> Array1<f64> {
        z.mapv(|v| 1.0 / (1.0 + (-v).exp()))
    }

    /// L1 and L2 shares of the penalty
    fn penalty_mix(&self) -> (f64, f64) {
        match self.penalty {
            Penalty::L1 => (1.0, 0.0),
            Penalty::L2 => (0.0, 1.0),
            Penalty::ElasticNet => (self.l1_ratio, 1.0 - self.l1_ratio),
            Penalty::None => (0.0, 0.0),
        }
    }

    fn sample_weights(&self, y: &Array1<f64>, encoding: &ClassEncoding) -> Array1<f64> {
        match self.class_weight {
            ClassWeight::Uniform => Array1::ones(y.len()),
            ClassWeight::Balanced => {
                let n = y.len() as f64;
                let counts = encoding.counts(y);
                let n_classes = counts.iter().filter(|&&c| c > 0).count() as f64;
                y.mapv(|v| {
                    let count = counts
                        .get(class_position(encoding.classes(), v))
                        .copied()
                        .unwrap_or(1)
                        .max(1);
                    n / (n_classes * count as f64)
                })
            }
        }
    }

    /// Fit the model using gradient descent
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
                "cannot fit logistic regression on zero samples".to_string(),
            ));
        }

        let encoding = ClassEncoding::fit(y)?;
        let sample_weights = self.sample_weights(y, &encoding);
        let mut coefficients = Array2::zeros((encoding.n_models(), n_features));
        let mut intercepts = Array1::zeros(encoding.n_models());
        for k in 0..encoding.n_models() {
            let target = encoding.target(y, k);
            let (weights, bias) = self.descend(x, &target, &sample_weights);
            coefficients.row_mut(k).assign(&weights);
            intercepts[k] = bias;
        }

        self.coefficients = Some(coefficients);
        self.intercepts = Some(intercepts);
        self.encoding = encoding;
        self.is_fitted = true;

        Ok(self)
    }

    /// Gradient descent on one 0/1 target
    fn descend(&self, x: &Array2<f64>, y: &Array1<f64>, sample_weights: &Array1<f64>) -> (Array1<f64>, f64) {
        let mut weights = Array1::zeros(x.ncols());
        let mut bias = 0.0;

        let n = x.nrows() as f64;
        let lr = self.learning_rate;
        // objective: C * sum(loss) + penalty, divided through by C·n
        let reg = 1.0 / (self.c * n);
        let (l1, l2) = self.penalty_mix();

        for _iter in 0..self.max_iter {
            let linear = x.dot(&weights) + bias;
            let predictions = Self::sigmoid(&linear);

            let errors = (&predictions - y) * sample_weights;
            let mut dw = x.t().dot(&errors) / n;
            if l2 > 0.0 {
                dw.scaled_add(reg * l2, &weights);
            }
            let db = if self.fit_intercept {
                errors.mean().unwrap_or(0.0)
            } else {
                0.0
            };

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.tol {
                break;
            }

            weights.scaled_add(-lr, &dw);
            bias -= lr * db;

            if l1 > 0.0 {
                // Proximal step for the L1 term
                let shrink = lr * reg * l1;
                weights.mapv_inplace(|w| w.signum() * (w.abs() - shrink).max(0.0));
            }
        }

        (weights, bias)
    }

    /// Class probabilities, one column per class in sorted label order
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (coefficients, intercepts) = match (&self.coefficients, &self.intercepts, self.is_fitted) {
            (Some(c), Some(b), true) => (c, b),
            _ => return Err(NetworkSecurityError::ModelNotFitted),
        };
        if x.ncols() != coefficients.ncols() {
            return Err(NetworkSecurityError::ShapeError {
                expected: format!("{} features", coefficients.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let positive: Vec<Array1<f64>> = coefficients
            .rows()
            .into_iter()
            .zip(intercepts.iter())
            .map(|(w, &b)| Self::sigmoid(&(x.dot(&w) + b)))
            .collect();
        Ok(self.encoding.probabilities(&positive))
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(self.encoding.decode(&proba))
    }

    /// Class labels seen during fit
    pub fn classes(&self) -> &[f64] {
        self.encoding.classes()
    }

    pub fn n_features(&self) -> usize {
        self.coefficients.as_ref().map_or(0, |c| c.ncols())
    }
}
