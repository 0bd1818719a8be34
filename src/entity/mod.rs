//! Configuration and artifact value types

mod artifact;
mod config;

pub use artifact::{ClassificationMetricArtifact, DataTransformationArtifact, ModelTrainerArtifact};
pub use config::{ModelTrainerConfig, TrainingPipelineConfig, TIMESTAMP_FORMAT};
