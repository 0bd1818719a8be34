//! Artifacts passed between pipeline stages

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outputs of the upstream transformation stage consumed by the trainer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTransformationArtifact {
    /// Fitted preprocessor
    pub transformed_object_file_path: PathBuf,
    /// Training matrix, label in the last column
    pub transformed_train_file_path: PathBuf,
    /// Test matrix, label in the last column
    pub transformed_test_file_path: PathBuf,
}

/// Precision, recall and F1 of one prediction set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetricArtifact {
    pub f1_score: f64,
    pub precision_score: f64,
    pub recall_score: f64,
}

/// Result of a model trainer run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTrainerArtifact {
    pub trained_model_file_path: PathBuf,
    pub train_metric_artifact: ClassificationMetricArtifact,
    pub test_metric_artifact: ClassificationMetricArtifact,
}
