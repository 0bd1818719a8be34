//! Classification and held-out scoring metrics

use crate::entity::ClassificationMetricArtifact;
use crate::error::{NetworkSecurityError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Metric used to score a refit model on the test split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMetric {
    /// Coefficient of determination of predicted labels
    #[default]
    R2,
    Accuracy,
    F1,
}

impl ScoringMetric {
    pub fn score(&self, y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
        match self {
            ScoringMetric::R2 => r2_score(y_true, y_pred),
            ScoringMetric::Accuracy => accuracy_score(y_true, y_pred),
            ScoringMetric::F1 => get_classification_score(y_true, y_pred).map(|m| m.f1_score),
        }
    }
}

impl fmt::Display for ScoringMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScoringMetric::R2 => "r2",
            ScoringMetric::Accuracy => "accuracy",
            ScoringMetric::F1 => "f1",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ScoringMetric {
    type Err = NetworkSecurityError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "r2" => Ok(ScoringMetric::R2),
            "accuracy" => Ok(ScoringMetric::Accuracy),
            "f1" => Ok(ScoringMetric::F1),
            other => Err(NetworkSecurityError::ConfigError(format!(
                "unknown scoring metric '{}', expected r2, accuracy or f1",
                other
            ))),
        }
    }
}

fn check_lengths(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(NetworkSecurityError::ShapeError {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{} predictions", y_pred.len()),
        });
    }
    if y_true.is_empty() {
        return Err(NetworkSecurityError::ValidationError(
            "cannot score an empty label array".to_string(),
        ));
    }
    Ok(())
}

/// Precision, recall and F1 of predicted labels
///
/// Labels within {0, 1} (or any two labels including 1) are scored as a
/// binary problem with 1 as the positive class. Anything else is
/// macro-averaged over the union of observed labels. A zero denominator
/// yields 0 for that quantity.
pub fn get_classification_score(
    y_true: &Array1<f64>,
    y_pred: &Array1<f64>,
) -> Result<ClassificationMetricArtifact> {
    check_lengths(y_true, y_pred)?;

    let mut labels: Vec<f64> = y_true.iter().chain(y_pred.iter()).copied().collect();
    labels.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    labels.dedup();

    let binary = labels.iter().all(|&l| l == 0.0 || l == 1.0)
        || (labels.len() <= 2 && labels.contains(&1.0));

    let (precision_score, recall_score, f1_score) = if binary {
        per_label(y_true, y_pred, 1.0)
    } else {
        let n = labels.len() as f64;
        let (p, r, f) = labels
            .iter()
            .map(|&label| per_label(y_true, y_pred, label))
            .fold((0.0, 0.0, 0.0), |acc, s| (acc.0 + s.0, acc.1 + s.1, acc.2 + s.2));
        (p / n, r / n, f / n)
    };

    Ok(ClassificationMetricArtifact {
        f1_score,
        precision_score,
        recall_score,
    })
}

fn per_label(y_true: &Array1<f64>, y_pred: &Array1<f64>, positive: f64) -> (f64, f64, f64) {
    let (mut tp, mut fp, mut fn_) = (0usize, 0usize, 0usize);
    for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
        match (t == positive, p == positive) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => {}
        }
    }

    let precision = if tp + fp > 0 { tp as f64 / (tp + fp) as f64 } else { 0.0 };
    let recall = if tp + fn_ > 0 { tp as f64 / (tp + fn_) as f64 } else { 0.0 };
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    (precision, recall, f1)
}

/// Fraction of exact label matches
pub fn accuracy_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t == p)
        .count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Coefficient of determination
///
/// A constant `y_true` scores 1 when predicted exactly and 0 otherwise.
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let mean = y_true.mean().unwrap_or(0.0);
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_binary_scores() {
        let y_true = array![1.0, 1.0, 0.0, 0.0, 1.0];
        let y_pred = array![1.0, 0.0, 0.0, 1.0, 1.0];
        let m = get_classification_score(&y_true, &y_pred).unwrap();

        assert!((m.precision_score - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.recall_score - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.f1_score - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_division_is_zero() {
        let y_true = array![0.0, 0.0, 0.0];
        let y_pred = array![0.0, 0.0, 0.0];
        let m = get_classification_score(&y_true, &y_pred).unwrap();
        assert_eq!(m.precision_score, 0.0);
        assert_eq!(m.recall_score, 0.0);
        assert_eq!(m.f1_score, 0.0);
    }

    #[test]
    fn test_multiclass_macro_average() {
        let y_true = array![0.0, 1.0, 2.0, 2.0];
        let y_pred = array![0.0, 2.0, 2.0, 2.0];
        let m = get_classification_score(&y_true, &y_pred).unwrap();

        // class 0: p=1 r=1; class 1: p=0 r=0; class 2: p=2/3 r=1
        assert!((m.precision_score - (1.0 + 0.0 + 2.0 / 3.0) / 3.0).abs() < 1e-12);
        assert!((m.recall_score - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_length_mismatch_and_empty() {
        assert!(get_classification_score(&array![1.0], &array![1.0, 0.0]).is_err());
        assert!(get_classification_score(&Array1::zeros(0), &Array1::zeros(0)).is_err());
    }

    #[test]
    fn test_r2() {
        let y = array![0.0, 1.0, 1.0, 0.0];
        assert_eq!(r2_score(&y, &y).unwrap(), 1.0);
        assert_eq!(r2_score(&y, &array![1.0, 0.0, 0.0, 1.0]).unwrap(), -3.0);
        assert_eq!(r2_score(&array![1.0, 1.0], &array![1.0, 0.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_scoring_metric_parse() {
        assert_eq!("accuracy".parse::<ScoringMetric>().unwrap(), ScoringMetric::Accuracy);
        assert_eq!(ScoringMetric::default(), ScoringMetric::R2);
        assert!("auc".parse::<ScoringMetric>().is_err());
        let score = ScoringMetric::Accuracy
            .score(&array![1.0, 0.0], &array![1.0, 1.0])
            .unwrap();
        assert_eq!(score, 0.5);
    }
}
