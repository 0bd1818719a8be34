//! Model trainer stage: search, evaluate, track and persist the best classifier

use crate::entity::{DataTransformationArtifact, ModelTrainerArtifact, ModelTrainerConfig};
use crate::error::{NetworkSecurityError, Result};
use crate::estimator::NetworkModel;
use crate::metrics::get_classification_score;
use crate::preprocessing::Preprocessor;
use crate::tracking::{track_model, ExperimentTracker};
use crate::training::evaluate_models;
use crate::utils::{load_array, load_object, save_object};
use ndarray::{s, Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::info;

/// Step of [`ModelTrainer::initiate_model_trainer`] an error was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrainerStage {
    LoadArrays,
    ModelSearch,
    EvaluateTrain,
    TrackTrain,
    EvaluateTest,
    TrackTest,
    Persist,
}

impl fmt::Display for TrainerStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrainerStage::LoadArrays => "loading arrays",
            TrainerStage::ModelSearch => "model search",
            TrainerStage::EvaluateTrain => "train evaluation",
            TrainerStage::TrackTrain => "train tracking",
            TrainerStage::EvaluateTest => "test evaluation",
            TrainerStage::TrackTest => "test tracking",
            TrainerStage::Persist => "persisting models",
        };
        f.write_str(s)
    }
}

/// Tags a result's error with the stage and call site
trait StageContext<T> {
    fn stage(self, stage: TrainerStage) -> Result<T>;
}

impl<T> StageContext<T> for Result<T> {
    #[track_caller]
    fn stage(self, stage: TrainerStage) -> Result<T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(NetworkSecurityError::trainer(stage, e)),
        }
    }
}

/// Features are every column but the last, labels the last one
fn split_features_target(array: &Array2<f64>) -> Result<(Array2<f64>, Array1<f64>)> {
    if array.ncols() < 2 {
        return Err(NetworkSecurityError::DataError(format!(
            "expected features plus a label column, got {} column(s)",
            array.ncols()
        )));
    }
    if array.nrows() == 0 {
        return Err(NetworkSecurityError::DataError("array has no rows".to_string()));
    }
    let last = array.ncols() - 1;
    Ok((
        array.slice(s![.., ..last]).to_owned(),
        array.column(last).to_owned(),
    ))
}

pub struct ModelTrainer {
    config: ModelTrainerConfig,
    data_transformation_artifact: DataTransformationArtifact,
}

impl ModelTrainer {
    pub fn new(config: ModelTrainerConfig, data_transformation_artifact: DataTransformationArtifact) -> Self {
        Self {
            config,
            data_transformation_artifact,
        }
    }

    pub fn config(&self) -> &ModelTrainerConfig {
        &self.config
    }

    /// Run the whole stage. Every failure comes back as
    /// [`NetworkSecurityError::Trainer`].
    pub fn initiate_model_trainer(
        &self,
        tracker: &mut dyn ExperimentTracker,
    ) -> Result<ModelTrainerArtifact> {
        let start = Instant::now();
        let artifact = &self.data_transformation_artifact;

        info!(path = %artifact.transformed_train_file_path.display(), "loading transformed arrays");
        let train = load_array(&artifact.transformed_train_file_path).stage(TrainerStage::LoadArrays)?;
        let test = load_array(&artifact.transformed_test_file_path).stage(TrainerStage::LoadArrays)?;
        let (x_train, y_train) = split_features_target(&train).stage(TrainerStage::LoadArrays)?;
        let (x_test, y_test) = split_features_target(&test).stage(TrainerStage::LoadArrays)?;

        info!(
            train_rows = x_train.nrows(),
            test_rows = x_test.nrows(),
            features = x_train.ncols(),
            models = self.config.catalog.len(),
            "starting model search"
        );
        let report = evaluate_models(
            &x_train,
            &y_train,
            &x_test,
            &y_test,
            &self.config.catalog,
            &self.config.search,
        )
        .stage(TrainerStage::ModelSearch)?;
        let best = report.into_best().stage(TrainerStage::ModelSearch)?;
        info!(model = %best.name, score = best.score, params = %best.best_params, "best model selected");

        info!("evaluating best model on the training split");
        let train_pred = best.model.predict(&x_train).stage(TrainerStage::EvaluateTrain)?;
        let train_metric =
            get_classification_score(&y_train, &train_pred).stage(TrainerStage::EvaluateTrain)?;
        track_model(tracker, &best.model, &train_metric).stage(TrainerStage::TrackTrain)?;

        info!("evaluating best model on the test split");
        let test_pred = best.model.predict(&x_test).stage(TrainerStage::EvaluateTest)?;
        let test_metric =
            get_classification_score(&y_test, &test_pred).stage(TrainerStage::EvaluateTest)?;
        track_model(tracker, &best.model, &test_metric).stage(TrainerStage::TrackTest)?;

        info!(path = %self.config.trained_model_file_path.display(), "persisting model bundle");
        let preprocessor: Preprocessor =
            load_object(&artifact.transformed_object_file_path).stage(TrainerStage::Persist)?;
        let bundle = NetworkModel::new(preprocessor, best.model).stage(TrainerStage::Persist)?;
        save_object(&self.config.trained_model_file_path, &bundle).stage(TrainerStage::Persist)?;
        save_object(&self.config.final_model_file_path, bundle.model()).stage(TrainerStage::Persist)?;

        let result = ModelTrainerArtifact {
            trained_model_file_path: self.config.trained_model_file_path.clone(),
            train_metric_artifact: train_metric,
            test_metric_artifact: test_metric,
        };
        info!(
            artifact = ?result,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "model trainer finished"
        );
        Ok(result)
    }
}
