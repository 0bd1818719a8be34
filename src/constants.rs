//! Fixed names shared across the pipeline

/// Pipeline name recorded in the training pipeline config
pub const PIPELINE_NAME: &str = "NetworkSecurity";

/// Root directory for timestamped run artifacts
pub const ARTIFACT_DIR: &str = "Artifacts";

/// Directory (relative to the working directory) holding the bare best model
pub const FINAL_MODEL_DIR: &str = "final_model";

/// Convenience copy of the bare best model, relative to the working directory
pub const FINAL_MODEL_PATH: &str = "final_model/model.pkl";

pub const MODEL_TRAINER_DIR_NAME: &str = "model_trainer";
pub const MODEL_TRAINER_TRAINED_MODEL_DIR: &str = "trained_model";
pub const MODEL_TRAINER_TRAINED_MODEL_NAME: &str = "model.bin";

pub const DATA_TRANSFORMATION_DIR_NAME: &str = "data_transformation";
pub const DATA_TRANSFORMATION_TRANSFORMED_DATA_DIR: &str = "transformed";
pub const DATA_TRANSFORMATION_TRANSFORMED_OBJECT_DIR: &str = "transformed_object";
pub const TRAIN_ARRAY_FILE_NAME: &str = "train.bin";
pub const TEST_ARRAY_FILE_NAME: &str = "test.bin";
pub const PREPROCESSING_OBJECT_FILE_NAME: &str = "preprocessing.bin";

/// Name under which the winning model is registered on remote trackers
pub const REGISTERED_MODEL_NAME: &str = "phishing_detection_model";

/// Default MLflow endpoint for the project
pub const DEFAULT_TRACKING_URI: &str =
    "https://dagshub.com/HarshavardhanKurtkoti/Phising_Domain_Detection.mlflow";

/// Default experiment used when none is configured
pub const DEFAULT_EXPERIMENT_NAME: &str = "Default";

/// Artifact sub-path the fitted model is logged under
pub const MODEL_ARTIFACT_PATH: &str = "model";

/// External CLI used for bucket mirroring
pub const SYNC_PROGRAM: &str = "aws";

/// KNN imputer settings used by the preprocessing object
pub const KNN_IMPUTER_NEIGHBORS: usize = 3;

/// Column appended by batch prediction
pub const PREDICTION_COLUMN: &str = "predicted_column";

/// Default seed for estimators and randomized search
pub const DEFAULT_RANDOM_STATE: u64 = 42;
