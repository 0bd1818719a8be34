//! Local `file:` tracking store
//!
//! Layout: `<root>/<experiment>/<run_id>/{meta.json, metrics.json, artifacts/}`.

use super::{ExperimentTracker, RunStatus};
use crate::constants::MODEL_TRAINER_TRAINED_MODEL_NAME;
use crate::error::{NetworkSecurityError, Result};
use crate::training::Classifier;
use crate::utils::save_object;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Run metadata written to `meta.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub run_id: String,
    pub experiment: String,
    pub status: RunStatus,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub params: BTreeMap<String, String>,
    pub tags: BTreeMap<String, String>,
    pub artifacts: Vec<String>,
}

#[derive(Debug, Default)]
struct RunState {
    meta: Option<RunMeta>,
    metrics: BTreeMap<String, f64>,
}

/// Tracker persisting runs as JSON files on disk
#[derive(Debug)]
pub struct FileTracker {
    uri: String,
    root: PathBuf,
    experiment: String,
    runs: HashMap<String, RunState>,
}

impl FileTracker {
    pub fn new(root: impl Into<PathBuf>, experiment: impl Into<String>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            uri: format!("file:{}", root.display()),
            root,
            experiment: experiment.into(),
            runs: HashMap::new(),
        })
    }

    /// Accepts `file:///abs`, `file:rel` or a bare path
    pub fn from_uri(uri: &str, experiment: &str) -> Result<Self> {
        let path = uri
            .strip_prefix("file://")
            .or_else(|| uri.strip_prefix("file:"))
            .unwrap_or(uri);
        let mut tracker = Self::new(path, experiment)?;
        tracker.uri = uri.to_string();
        Ok(tracker)
    }

    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root.join(&self.experiment).join(run_id)
    }

    /// Load a run's metadata back from disk
    pub fn read_meta(&self, run_id: &str) -> Result<RunMeta> {
        let text = fs::read_to_string(self.run_dir(run_id).join("meta.json"))?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn read_metrics(&self, run_id: &str) -> Result<BTreeMap<String, f64>> {
        let text = fs::read_to_string(self.run_dir(run_id).join("metrics.json"))?;
        Ok(serde_json::from_str(&text)?)
    }

    fn state(&mut self, run_id: &str) -> Result<&mut RunState> {
        self.runs
            .get_mut(run_id)
            .ok_or_else(|| NetworkSecurityError::TrackingError(format!("unknown run {}", run_id)))
    }

    fn flush(&self, run_id: &str) -> Result<()> {
        let state = self
            .runs
            .get(run_id)
            .ok_or_else(|| NetworkSecurityError::TrackingError(format!("unknown run {}", run_id)))?;
        let dir = self.run_dir(run_id);
        fs::create_dir_all(&dir)?;
        if let Some(meta) = &state.meta {
            write_json(&dir.join("meta.json"), meta)?;
        }
        write_json(&dir.join("metrics.json"), &state.metrics)
    }

    fn update(&mut self, run_id: &str, apply: impl FnOnce(&mut RunState)) -> Result<()> {
        apply(self.state(run_id)?);
        self.flush(run_id)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    fs::write(path, serde_json::to_vec_pretty(value)?)?;
    Ok(())
}

impl ExperimentTracker for FileTracker {
    fn tracking_uri(&self) -> &str {
        &self.uri
    }

    fn start_run(&mut self) -> Result<String> {
        let run_id = uuid::Uuid::new_v4().simple().to_string();
        let meta = RunMeta {
            run_id: run_id.clone(),
            experiment: self.experiment.clone(),
            status: RunStatus::Running,
            start_time: chrono::Utc::now().timestamp_millis(),
            end_time: None,
            params: BTreeMap::new(),
            tags: BTreeMap::new(),
            artifacts: Vec::new(),
        };
        self.runs.insert(
            run_id.clone(),
            RunState {
                meta: Some(meta),
                metrics: BTreeMap::new(),
            },
        );
        self.flush(&run_id)?;
        debug!(run_id = %run_id, root = %self.root.display(), "file run started");
        Ok(run_id)
    }

    fn log_metric(&mut self, run_id: &str, key: &str, value: f64) -> Result<()> {
        self.update(run_id, |s| {
            s.metrics.insert(key.to_string(), value);
        })
    }

    fn log_param(&mut self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.update(run_id, |s| {
            if let Some(meta) = s.meta.as_mut() {
                meta.params.insert(key.to_string(), value.to_string());
            }
        })
    }

    fn set_tag(&mut self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.update(run_id, |s| {
            if let Some(meta) = s.meta.as_mut() {
                meta.tags.insert(key.to_string(), value.to_string());
            }
        })
    }

    fn log_model(&mut self, run_id: &str, artifact_path: &str, model: &Classifier) -> Result<String> {
        self.state(run_id)?;
        let relative = Path::new("artifacts")
            .join(artifact_path)
            .join(MODEL_TRAINER_TRAINED_MODEL_NAME);
        let target = self.run_dir(run_id).join(&relative);
        save_object(&target, model)?;

        let recorded = relative.to_string_lossy().into_owned();
        self.update(run_id, |s| {
            if let Some(meta) = s.meta.as_mut() {
                meta.artifacts.push(recorded);
            }
        })?;
        Ok(target.display().to_string())
    }

    fn register_model(&mut self, _run_id: &str, _source: &str, name: &str) -> Result<()> {
        Err(NetworkSecurityError::TrackingError(format!(
            "cannot register {}: model registry is not available for file stores",
            name
        )))
    }

    fn end_run(&mut self, run_id: &str, status: RunStatus) -> Result<()> {
        self.update(run_id, |s| {
            if let Some(meta) = s.meta.as_mut() {
                meta.status = status;
                meta.end_time = Some(chrono::Utc::now().timestamp_millis());
            }
        })?;
        // Closed runs live on disk only
        self.runs.remove(run_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::ModelKind;
    use crate::utils::load_object;
    use ndarray::array;

    #[test]
    fn test_run_layout() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = FileTracker::new(dir.path().join("mlruns"), "Default").unwrap();

        let mut model = Classifier::new(ModelKind::DecisionTree, 0);
        model.fit(&array![[0.0], [1.0]], &array![0.0, 1.0]).unwrap();

        let run_id = tracker.start_run().unwrap();
        tracker.log_metric(&run_id, "f1_score", 0.75).unwrap();
        tracker.log_param(&run_id, "max_depth", "None").unwrap();
        let source = tracker.log_model(&run_id, "model", &model).unwrap();
        tracker.end_run(&run_id, RunStatus::Finished).unwrap();

        let meta = tracker.read_meta(&run_id).unwrap();
        assert_eq!(meta.status, RunStatus::Finished);
        assert!(meta.end_time.is_some());
        assert_eq!(meta.params.get("max_depth").map(String::as_str), Some("None"));
        assert_eq!(tracker.read_metrics(&run_id).unwrap()["f1_score"], 0.75);

        let expected = dir
            .path()
            .join("mlruns/Default")
            .join(&run_id)
            .join("artifacts/model/model.bin");
        assert_eq!(Path::new(&source), expected);
        let restored: Classifier = load_object(&expected).unwrap();
        assert_eq!(restored.kind(), ModelKind::DecisionTree);
    }

    #[test]
    fn test_ended_runs_are_released() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = FileTracker::new(dir.path(), "exp").unwrap();

        for _ in 0..3 {
            let run_id = tracker.start_run().unwrap();
            tracker.log_metric(&run_id, "precision", 0.5).unwrap();
            tracker.end_run(&run_id, RunStatus::Finished).unwrap();
            assert!(tracker.log_metric(&run_id, "precision", 0.6).is_err());
            assert_eq!(tracker.read_metrics(&run_id).unwrap()["precision"], 0.5);
        }
        assert!(tracker.runs.is_empty());
    }

    #[test]
    fn test_from_uri_variants() {
        let dir = tempfile::tempdir().unwrap();
        let uri = format!("file://{}", dir.path().join("store").display());
        let tracker = FileTracker::from_uri(&uri, "exp").unwrap();
        assert_eq!(tracker.tracking_uri(), uri);
        assert!(dir.path().join("store").is_dir());
    }

    #[test]
    fn test_unknown_run_and_registry() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = FileTracker::new(dir.path(), "exp").unwrap();
        assert!(tracker.log_metric("missing", "f1_score", 1.0).is_err());
        assert!(tracker.register_model("r", "s", "n").is_err());
    }
}
