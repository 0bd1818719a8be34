//! Class encoding for estimators that learn a single 0/1 target
//!
//! Two observed classes map to 0/1 with the larger label positive. More than
//! two train one binary model per class (one-vs-rest) and predict the class
//! whose model scores highest.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::decision_tree::{class_position, unique_sorted};
use crate::error::{NetworkSecurityError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassEncoding {
    classes: Vec<f64>,
}

impl ClassEncoding {
    pub fn fit(y: &Array1<f64>) -> Result<Self> {
        if y.iter().any(|v| !v.is_finite()) {
            return Err(NetworkSecurityError::InvalidInput(
                "class labels must be finite".to_string(),
            ));
        }
        Ok(Self {
            classes: unique_sorted(y),
        })
    }

    /// Sorted distinct labels seen during fit
    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    /// Number of binary models the estimator trains
    pub fn n_models(&self) -> usize {
        if self.classes.len() > 2 {
            self.classes.len()
        } else {
            1
        }
    }

    /// 0/1 target for binary model `k`
    pub fn target(&self, y: &Array1<f64>, k: usize) -> Array1<f64> {
        let positive = if self.classes.len() > 2 {
            self.classes.get(k)
        } else {
            self.classes.last()
        };
        match positive {
            Some(&positive) => y.mapv(|v| if (v - positive).abs() < 1e-10 { 1.0 } else { 0.0 }),
            None => Array1::zeros(y.len()),
        }
    }

    /// Per-class sample counts, aligned with `classes()`
    pub fn counts(&self, y: &Array1<f64>) -> Vec<usize> {
        let mut counts = vec![0; self.classes.len()];
        for &v in y {
            if let Some(c) = counts.get_mut(class_position(&self.classes, v)) {
                *c += 1;
            }
        }
        counts
    }

    /// Class probabilities (n_samples × n_classes) from each binary model's
    /// positive-class probability
    pub fn probabilities(&self, positive: &[Array1<f64>]) -> Array2<f64> {
        let n = positive.first().map_or(0, |p| p.len());
        match (self.classes.len(), positive) {
            (0, _) | (_, []) => Array2::zeros((n, self.classes.len())),
            (1, _) => Array2::ones((n, 1)),
            (2, [p, ..]) => Array2::from_shape_fn((n, 2), |(i, c)| if c == 1 { p[i] } else { 1.0 - p[i] }),
            (k, scores) => {
                let totals: Vec<f64> = (0..n).map(|i| scores.iter().map(|s| s[i]).sum()).collect();
                Array2::from_shape_fn((n, k), |(i, c)| match scores.get(c) {
                    Some(s) if totals[i] > 0.0 => s[i] / totals[i],
                    _ => 1.0 / k as f64,
                })
            }
        }
    }

    /// Most probable class per row; the smaller label wins ties
    pub fn decode(&self, proba: &Array2<f64>) -> Array1<f64> {
        proba
            .rows()
            .into_iter()
            .map(|row| {
                let mut best = 0;
                for (c, &p) in row.iter().enumerate() {
                    if p > row[best] {
                        best = c;
                    }
                }
                self.classes.get(best).copied().unwrap_or(0.0)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_two_classes_use_one_model() {
        let y = array![-1.0, 1.0, 1.0, -1.0];
        let encoding = ClassEncoding::fit(&y).unwrap();
        assert_eq!(encoding.classes(), &[-1.0, 1.0]);
        assert_eq!(encoding.n_models(), 1);
        assert_eq!(encoding.target(&y, 0), array![0.0, 1.0, 1.0, 0.0]);

        let proba = encoding.probabilities(&[array![0.9, 0.2, 0.5]]);
        assert_eq!(encoding.decode(&proba), array![1.0, -1.0, -1.0]);
    }

    #[test]
    fn test_multiclass_one_vs_rest() {
        let y = array![0.0, 2.0, 1.0, 2.0];
        let encoding = ClassEncoding::fit(&y).unwrap();
        assert_eq!(encoding.n_models(), 3);
        assert_eq!(encoding.target(&y, 2), array![0.0, 1.0, 0.0, 1.0]);
        assert_eq!(encoding.counts(&y), vec![1, 1, 2]);

        let proba = encoding.probabilities(&[array![0.6, 0.1], array![0.2, 0.1], array![0.2, 0.8]]);
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-12);
        }
        assert_eq!(encoding.decode(&proba), array![0.0, 2.0]);
    }

    #[test]
    fn test_single_class_is_constant() {
        let encoding = ClassEncoding::fit(&array![3.0, 3.0]).unwrap();
        let proba = encoding.probabilities(&[array![0.1, 0.7]]);
        assert_eq!(encoding.decode(&proba), array![3.0, 3.0]);
    }

    #[test]
    fn test_rejects_nan_labels() {
        assert!(ClassEncoding::fit(&array![0.0, f64::NAN]).is_err());
    }
}
