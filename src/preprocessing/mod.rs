//! Preprocessing applied to raw feature matrices before classification
//!
//! The upstream transformation stage fits a [`Preprocessor`] on the training
//! features and persists it; the trainer reloads it to build the served
//! model bundle.

mod knn;

pub use knn::{KNNImputer, Weighting};

use crate::constants::KNN_IMPUTER_NEIGHBORS;
use crate::error::{NetworkSecurityError, Result};
use crate::utils::{load_object, save_object};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Check if value is missing (NaN)
#[inline]
pub fn is_missing(v: f64) -> bool {
    v.is_nan()
}

/// Fitted feature transform: KNN imputation of missing values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preprocessor {
    imputer: KNNImputer,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Preprocessor {
    /// Three-neighbour uniform KNN imputer
    pub fn new() -> Self {
        Self {
            imputer: KNNImputer::new(KNN_IMPUTER_NEIGHBORS).with_weights(Weighting::Uniform),
        }
    }

    pub fn with_imputer(imputer: KNNImputer) -> Self {
        Self { imputer }
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        self.imputer.fit(x)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.imputer.transform(x)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.imputer.fit_transform(x)
    }

    /// Width of the matrices this preprocessor was fitted on
    pub fn n_features(&self) -> Result<usize> {
        self.imputer.n_features().ok_or(NetworkSecurityError::ModelNotFitted)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_object(path, self)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_object(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_preprocessor_fills_missing() {
        let x = array![[1.0, 2.0], [1.0, 4.0], [1.0, 6.0], [1.0, f64::NAN]];
        let mut pre = Preprocessor::new();
        let out = pre.fit_transform(&x).unwrap();
        assert_eq!(out[[3, 1]], 4.0);
        assert_eq!(pre.n_features().unwrap(), 2);
    }

    #[test]
    fn test_unfitted_has_no_width() {
        assert!(Preprocessor::new().n_features().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("preprocessing.bin");

        let mut pre = Preprocessor::new();
        pre.fit(&array![[0.0, 1.0], [2.0, 3.0]]).unwrap();
        pre.save(&path).unwrap();

        let loaded = Preprocessor::load(&path).unwrap();
        let x = array![[f64::NAN, 1.0]];
        assert_eq!(pre.transform(&x).unwrap(), loaded.transform(&x).unwrap());
    }
}
