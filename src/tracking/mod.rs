//! Experiment tracking
//!
//! A run records the metrics of one evaluated prediction set together with
//! the fitted model. Remote MLflow servers also receive a registry entry;
//! local `file` stores never do.

mod config;
mod file_store;
mod mlflow;

pub use config::TrackingConfig;
pub use file_store::FileTracker;
pub use mlflow::MlflowClient;

use crate::constants::{MODEL_ARTIFACT_PATH, REGISTERED_MODEL_NAME};
use crate::entity::ClassificationMetricArtifact;
use crate::error::Result;
use crate::training::Classifier;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};
use url::Url;

/// Terminal state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
    Killed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Running => "RUNNING",
            RunStatus::Finished => "FINISHED",
            RunStatus::Failed => "FAILED",
            RunStatus::Killed => "KILLED",
        };
        f.write_str(s)
    }
}

/// Backend that stores runs, metrics and model artifacts
pub trait ExperimentTracker {
    fn tracking_uri(&self) -> &str;

    /// Open a run and return its id
    fn start_run(&mut self) -> Result<String>;

    fn log_metric(&mut self, run_id: &str, key: &str, value: f64) -> Result<()>;

    fn log_param(&mut self, run_id: &str, key: &str, value: &str) -> Result<()>;

    fn set_tag(&mut self, run_id: &str, key: &str, value: &str) -> Result<()>;

    /// Upload the fitted model under `artifact_path`; returns its source URI
    fn log_model(&mut self, run_id: &str, artifact_path: &str, model: &Classifier) -> Result<String>;

    fn register_model(&mut self, run_id: &str, source: &str, name: &str) -> Result<()>;

    fn end_run(&mut self, run_id: &str, status: RunStatus) -> Result<()>;
}

/// Scheme of a tracking URI; plain paths, including drive-letter paths
/// such as `C:\mlruns`, count as `file`
pub fn uri_scheme(uri: &str) -> String {
    match Url::parse(uri) {
        Ok(url) if url.scheme().len() > 1 => url.scheme().to_string(),
        _ => "file".to_string(),
    }
}

/// Record one evaluation of `model` as a tracked run.
///
/// The run is closed as FINISHED on success. Any failure marks it FAILED and
/// is returned to the caller.
pub fn track_model(
    tracker: &mut dyn ExperimentTracker,
    model: &Classifier,
    metric: &ClassificationMetricArtifact,
) -> Result<()> {
    let run_id = tracker.start_run()?;
    match log_run(tracker, &run_id, model, metric) {
        Ok(()) => {
            tracker.end_run(&run_id, RunStatus::Finished)?;
            info!(run_id = %run_id, model = model.name(), "run tracked");
            Ok(())
        }
        Err(err) => {
            if let Err(close_err) = tracker.end_run(&run_id, RunStatus::Failed) {
                warn!(run_id = %run_id, error = %close_err, "could not mark run as failed");
            }
            Err(err)
        }
    }
}

fn log_run(
    tracker: &mut dyn ExperimentTracker,
    run_id: &str,
    model: &Classifier,
    metric: &ClassificationMetricArtifact,
) -> Result<()> {
    tracker.set_tag(run_id, "estimator", model.name())?;
    for (key, value) in model.params() {
        tracker.log_param(run_id, &key, &value)?;
    }

    tracker.log_metric(run_id, "f1_score", metric.f1_score)?;
    tracker.log_metric(run_id, "precision", metric.precision_score)?;
    tracker.log_metric(run_id, "recall_score", metric.recall_score)?;

    let source = tracker.log_model(run_id, MODEL_ARTIFACT_PATH, model)?;
    if uri_scheme(tracker.tracking_uri()) != "file" {
        tracker.register_model(run_id, &source, REGISTERED_MODEL_NAME)?;
    }
    Ok(())
}

/// Build the tracker matching the configured URI scheme
pub fn tracker_from_config(config: &TrackingConfig) -> Result<Box<dyn ExperimentTracker>> {
    if uri_scheme(&config.tracking_uri) == "file" {
        Ok(Box::new(FileTracker::from_uri(
            &config.tracking_uri,
            &config.experiment_name,
        )?))
    } else {
        Ok(Box::new(MlflowClient::new(config)?))
    }
}
