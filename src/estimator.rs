//! Served model bundle: fitted preprocessor plus classifier

use crate::error::{NetworkSecurityError, Result};
use crate::preprocessing::Preprocessor;
use crate::training::Classifier;
use crate::utils::{load_object, save_object};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Applies the preprocessor to raw features, then the classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkModel {
    preprocessor: Preprocessor,
    model: Classifier,
}

impl NetworkModel {
    /// Both parts must be fitted on the same feature width
    pub fn new(preprocessor: Preprocessor, model: Classifier) -> Result<Self> {
        let expected = preprocessor.n_features()?;
        let actual = model.n_features()?;
        if expected != actual {
            return Err(NetworkSecurityError::ShapeError {
                expected: format!("{} features", expected),
                actual: format!("{} features", actual),
            });
        }
        Ok(Self { preprocessor, model })
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let transformed = self.preprocessor.transform(x)?;
        self.model.predict(&transformed)
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    pub fn model(&self) -> &Classifier {
        &self.model
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_object(path, self)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_object(path)
    }
}
