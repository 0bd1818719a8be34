//! Pipeline and trainer configuration

use crate::constants::{
    ARTIFACT_DIR, FINAL_MODEL_DIR, FINAL_MODEL_PATH, MODEL_TRAINER_DIR_NAME,
    MODEL_TRAINER_TRAINED_MODEL_DIR, MODEL_TRAINER_TRAINED_MODEL_NAME, PIPELINE_NAME,
};
use crate::error::{NetworkSecurityError, Result};
use crate::metrics::ScoringMetric;
use crate::training::{default_catalog, SearchConfig, SearchSpec, SearchStrategy};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Timestamp format used for run directories
pub const TIMESTAMP_FORMAT: &str = "%m_%d_%Y_%H_%M_%S";

/// Root layout for one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingPipelineConfig {
    pub pipeline_name: String,
    pub artifact_name: String,
    /// `Artifacts/<timestamp>`
    pub artifact_dir: PathBuf,
    pub model_dir: PathBuf,
    pub timestamp: String,
}

impl Default for TrainingPipelineConfig {
    fn default() -> Self {
        Self::new(Local::now())
    }
}

impl TrainingPipelineConfig {
    pub fn new(at: DateTime<Local>) -> Self {
        let timestamp = at.format(TIMESTAMP_FORMAT).to_string();
        Self {
            pipeline_name: PIPELINE_NAME.to_string(),
            artifact_name: ARTIFACT_DIR.to_string(),
            artifact_dir: Path::new(ARTIFACT_DIR).join(&timestamp),
            model_dir: PathBuf::from(FINAL_MODEL_DIR),
            timestamp,
        }
    }

    /// Place run artifacts under `root` instead of the working directory
    pub fn with_artifact_root(mut self, root: impl AsRef<Path>) -> Self {
        self.artifact_dir = root.as_ref().join(&self.artifact_name).join(&self.timestamp);
        self
    }
}

/// Settings for the model trainer stage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelTrainerConfig {
    pub model_trainer_dir: PathBuf,
    /// Where the model bundle is written
    pub trained_model_file_path: PathBuf,
    /// Where the bare best model is written
    pub final_model_file_path: PathBuf,
    pub search: SearchConfig,
    pub catalog: Vec<SearchSpec>,
}

impl Default for ModelTrainerConfig {
    fn default() -> Self {
        Self::new(&TrainingPipelineConfig::default())
    }
}

impl ModelTrainerConfig {
    pub fn new(pipeline: &TrainingPipelineConfig) -> Self {
        let model_trainer_dir = pipeline.artifact_dir.join(MODEL_TRAINER_DIR_NAME);
        let trained_model_file_path = model_trainer_dir
            .join(MODEL_TRAINER_TRAINED_MODEL_DIR)
            .join(MODEL_TRAINER_TRAINED_MODEL_NAME);
        Self {
            model_trainer_dir,
            trained_model_file_path,
            final_model_file_path: PathBuf::from(FINAL_MODEL_PATH),
            search: SearchConfig::default(),
            catalog: default_catalog(),
        }
    }

    /// Read overrides from a JSON file; missing fields keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.search.cv_folds < 2 {
            return Err(NetworkSecurityError::ConfigError(format!(
                "cv_folds must be at least 2, got {}",
                self.search.cv_folds
            )));
        }
        if let SearchStrategy::Randomized { n_iter: 0 } = self.search.strategy {
            return Err(NetworkSecurityError::ConfigError(
                "randomized search needs n_iter >= 1".to_string(),
            ));
        }
        if self.catalog.is_empty() {
            return Err(NetworkSecurityError::ConfigError(
                "the model catalog is empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.search.strategy = strategy;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.search.cv_folds = folds;
        self
    }

    pub fn with_scoring(mut self, scoring: ScoringMetric) -> Self {
        self.search.scoring = scoring;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.search.random_state = seed;
        self
    }

    pub fn with_catalog(mut self, catalog: Vec<SearchSpec>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_trained_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.trained_model_file_path = path.into();
        self
    }

    pub fn with_final_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.final_model_file_path = path.into();
        self
    }
}
