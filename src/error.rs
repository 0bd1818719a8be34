//! Error types for the network security training pipeline

use std::panic::Location;

use thiserror::Error;

use crate::components::TrainerStage;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, NetworkSecurityError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum NetworkSecurityError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Tracking error: {0}")]
    TrackingError(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Uniform wrapper raised at the model trainer boundary.
    #[error("Error occurred in model trainer during {stage} [{location}]: {source}")]
    Trainer {
        stage: TrainerStage,
        location: String,
        #[source]
        source: Box<NetworkSecurityError>,
    },
}

impl NetworkSecurityError {
    /// Wrap an error with the trainer stage and the caller's `file:line`.
    #[track_caller]
    pub fn trainer(stage: TrainerStage, source: NetworkSecurityError) -> Self {
        let location = Location::caller();
        NetworkSecurityError::Trainer {
            stage,
            location: format!("{}:{}", location.file(), location.line()),
            source: Box::new(source),
        }
    }
}

impl From<serde_json::Error> for NetworkSecurityError {
    fn from(err: serde_json::Error) -> Self {
        NetworkSecurityError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for NetworkSecurityError {
    fn from(err: bincode::Error) -> Self {
        NetworkSecurityError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for NetworkSecurityError {
    fn from(err: ndarray::ShapeError) -> Self {
        NetworkSecurityError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

impl From<polars::error::PolarsError> for NetworkSecurityError {
    fn from(err: polars::error::PolarsError) -> Self {
        NetworkSecurityError::DataError(err.to_string())
    }
}

impl From<url::ParseError> for NetworkSecurityError {
    fn from(err: url::ParseError) -> Self {
        NetworkSecurityError::ConfigError(format!("invalid URL: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NetworkSecurityError::DataError("test error".to_string());
        assert_eq!(err.to_string(), "Data error: test error");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: NetworkSecurityError = io_err.into();
        assert!(matches!(err, NetworkSecurityError::IoError(_)));
    }

    #[test]
    fn test_trainer_wrapper_records_location() {
        let err = NetworkSecurityError::trainer(
            TrainerStage::LoadArrays,
            NetworkSecurityError::ModelNotFitted,
        );
        match &err {
            NetworkSecurityError::Trainer { stage, location, source } => {
                assert_eq!(*stage, TrainerStage::LoadArrays);
                assert!(location.contains("error.rs"), "location = {}", location);
                assert!(matches!(**source, NetworkSecurityError::ModelNotFitted));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_string().contains("Model not fitted"));
    }
}
