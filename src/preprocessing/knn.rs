//! KNN-based imputation

use super::is_missing;
use crate::error::{NetworkSecurityError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Ordered float for the neighbour heap
#[derive(Debug, Clone, Copy)]
struct DistanceIdx(f64, usize);

impl PartialEq for DistanceIdx {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DistanceIdx {}

impl PartialOrd for DistanceIdx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DistanceIdx {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max heap by distance, then by row so equal distances keep the earlier row
        self.0
            .partial_cmp(&other.0)
            .unwrap_or(Ordering::Equal)
            .then(self.1.cmp(&other.1))
    }
}

/// How neighbour values are averaged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Weighting {
    Uniform,
    /// Inverse-distance weighting
    Distance,
}

/// KNN imputer over NaN-marked missing values
///
/// Donors for a missing feature are the fitted rows where that feature is
/// present, ranked by NaN-aware euclidean distance over the coordinates both
/// rows share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNImputer {
    n_neighbors: usize,
    weights: Weighting,
    fit_data: Option<Array2<f64>>,
    /// Column means ignoring NaN, used when no donor exists
    feature_means: Option<Array1<f64>>,
}

impl Default for KNNImputer {
    fn default() -> Self {
        Self::new(5)
    }
}

impl KNNImputer {
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors: n_neighbors.max(1),
            weights: Weighting::Uniform,
            fit_data: None,
            feature_means: None,
        }
    }

    pub fn with_weights(mut self, weights: Weighting) -> Self {
        self.weights = weights;
        self
    }

    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    pub fn n_features(&self) -> Option<usize> {
        self.fit_data.as_ref().map(|d| d.ncols())
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        if x.nrows() == 0 {
            return Err(NetworkSecurityError::ValidationError(
                "cannot fit an imputer on zero rows".to_string(),
            ));
        }

        let means = x
            .axis_iter(Axis(1))
            .map(|col| {
                let (sum, count) = col
                    .iter()
                    .filter(|v| !is_missing(**v))
                    .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
                if count > 0 {
                    sum / count as f64
                } else {
                    0.0
                }
            })
            .collect();

        self.fit_data = Some(x.to_owned());
        self.feature_means = Some(means);
        Ok(())
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (data, means) = match (&self.fit_data, &self.feature_means) {
            (Some(d), Some(m)) => (d, m),
            _ => return Err(NetworkSecurityError::ModelNotFitted),
        };
        if x.ncols() != data.ncols() {
            return Err(NetworkSecurityError::ShapeError {
                expected: format!("{} features", data.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let mut out = x.to_owned();
        for (i, row) in x.outer_iter().enumerate() {
            for j in 0..x.ncols() {
                if is_missing(row[j]) {
                    out[[i, j]] = self.impute_value(data, means, row, j);
                }
            }
        }
        Ok(out)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    fn impute_value(&self, data: &Array2<f64>, means: &Array1<f64>, sample: ArrayView1<f64>, feature_idx: usize) -> f64 {
        let neighbors = self.find_donors(data, sample, feature_idx);
        if neighbors.is_empty() {
            return means[feature_idx];
        }

        match self.weights {
            Weighting::Distance => {
                let mut weighted_sum = 0.0;
                let mut weight_sum = 0.0;
                for &(idx, dist) in &neighbors {
                    let weight = if dist < 1e-10 { 1e10 } else { 1.0 / dist };
                    weighted_sum += data[[idx, feature_idx]] * weight;
                    weight_sum += weight;
                }
                weighted_sum / weight_sum
            }
            Weighting::Uniform => {
                neighbors.iter().map(|&(idx, _)| data[[idx, feature_idx]]).sum::<f64>()
                    / neighbors.len() as f64
            }
        }
    }

    /// k nearest fitted rows that carry a value for `feature_idx`
    fn find_donors(&self, data: &Array2<f64>, sample: ArrayView1<f64>, feature_idx: usize) -> Vec<(usize, f64)> {
        let mut heap: BinaryHeap<DistanceIdx> = BinaryHeap::with_capacity(self.n_neighbors + 1);

        for (i, row) in data.outer_iter().enumerate() {
            if is_missing(row[feature_idx]) {
                continue;
            }
            let dist = nan_euclidean(sample, row);
            if !dist.is_finite() {
                continue;
            }
            let candidate = DistanceIdx(dist, i);
            if heap.len() < self.n_neighbors {
                heap.push(candidate);
            } else if heap.peek().map_or(false, |worst| candidate < *worst) {
                heap.pop();
                heap.push(candidate);
            }
        }

        heap.into_sorted_vec()
            .into_iter()
            .map(|DistanceIdx(d, i)| (i, d))
            .collect()
    }
}

/// Euclidean distance over shared coordinates, scaled up by the share missing
fn nan_euclidean(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    let mut present = 0usize;
    let mut accum = 0.0;
    for (&ai, &bi) in a.iter().zip(b.iter()) {
        if is_missing(ai) || is_missing(bi) {
            continue;
        }
        present += 1;
        accum += (ai - bi).powi(2);
    }
    if present == 0 {
        return f64::INFINITY;
    }
    (accum * a.len() as f64 / present as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_imputes_from_nearest_rows() {
        let x = array![
            [1.0, 10.0],
            [1.1, 11.0],
            [0.9, 12.0],
            [8.0, 80.0],
            [1.0, f64::NAN],
        ];
        let mut imputer = KNNImputer::new(3);
        let out = imputer.fit_transform(&x).unwrap();
        assert!((out[[4, 1]] - 11.0).abs() < 1e-9);
        assert_eq!(out[[0, 1]], 10.0);
    }

    #[test]
    fn test_distance_weighting_prefers_closest() {
        let x = array![[0.0, 0.0], [10.0, 100.0]];
        let mut imputer = KNNImputer::new(2).with_weights(Weighting::Distance);
        imputer.fit(&x).unwrap();
        let out = imputer.transform(&array![[1.0, f64::NAN]]).unwrap();
        assert!(out[[0, 1]] < 50.0);
    }

    #[test]
    fn test_falls_back_to_mean_without_donors() {
        let x = array![[1.0, f64::NAN], [2.0, 4.0], [3.0, 6.0]];
        let mut imputer = KNNImputer::new(3);
        imputer.fit(&x).unwrap();
        // No shared coordinates with any donor
        let out = imputer.transform(&array![[f64::NAN, f64::NAN]]).unwrap();
        assert_eq!(out[[0, 0]], 2.0);
        assert_eq!(out[[0, 1]], 5.0);
    }

    #[test]
    fn test_transform_requires_fit_and_width() {
        let imputer = KNNImputer::new(3);
        assert!(imputer.transform(&array![[1.0]]).is_err());

        let mut imputer = KNNImputer::new(3);
        imputer.fit(&array![[1.0, 2.0]]).unwrap();
        assert!(imputer.transform(&array![[1.0]]).is_err());
    }
}
