//! MLflow REST client (API 2.0) over blocking HTTP

use super::{ExperimentTracker, RunStatus, TrackingConfig};
use crate::constants::MODEL_TRAINER_TRAINED_MODEL_NAME;
use crate::error::{NetworkSecurityError, Result};
use crate::training::Classifier;
use crate::utils::to_bytes;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};
use url::Url;

const USER_AGENT: &str = concat!("networksecurity/", env!("CARGO_PKG_VERSION"));
const ARTIFACT_PROXY_SCHEME: &str = "mlflow-artifacts:";

#[derive(Debug, Default, Deserialize)]
struct ApiError {
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct Experiment {
    experiment_id: String,
}

#[derive(Debug, Deserialize)]
struct GetExperimentResponse {
    experiment: Experiment,
}

#[derive(Debug, Deserialize)]
struct CreateExperimentResponse {
    experiment_id: String,
}

#[derive(Debug, Deserialize)]
struct RunInfo {
    run_id: String,
    #[serde(default)]
    artifact_uri: String,
}

#[derive(Debug, Deserialize)]
struct Run {
    info: RunInfo,
}

#[derive(Debug, Deserialize)]
struct CreateRunResponse {
    run: Run,
}

#[derive(Debug, Deserialize)]
struct ModelVersion {
    #[serde(default)]
    version: String,
}

#[derive(Debug, Deserialize)]
struct CreateModelVersionResponse {
    model_version: ModelVersion,
}

#[derive(Serialize)]
struct KeyValue<'a> {
    run_id: &'a str,
    key: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct LogMetric<'a> {
    run_id: &'a str,
    key: &'a str,
    value: f64,
    timestamp: i64,
    step: i64,
}

/// Client for an MLflow tracking server
pub struct MlflowClient {
    http: Client,
    uri: String,
    base: Url,
    registry: Url,
    username: Option<String>,
    password: Option<String>,
    experiment_name: String,
    experiment_id: Option<String>,
    artifact_uris: HashMap<String, String>,
}

impl std::fmt::Debug for MlflowClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MlflowClient")
            .field("uri", &self.uri)
            .field("experiment_name", &self.experiment_name)
            .field("experiment_id", &self.experiment_id)
            .finish()
    }
}

fn base_url(uri: &str) -> Result<Url> {
    Ok(Url::parse(&format!("{}/", uri.trim_end_matches('/')))?)
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl MlflowClient {
    pub fn new(config: &TrackingConfig) -> Result<Self> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            uri: config.tracking_uri.clone(),
            base: base_url(&config.tracking_uri)?,
            registry: base_url(config.registry_base())?,
            username: config.username.clone(),
            password: config.password.clone(),
            experiment_name: config.experiment_name.clone(),
            experiment_id: None,
            artifact_uris: HashMap::new(),
        })
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let req = self.http.request(method, url);
        match &self.username {
            Some(user) => req.basic_auth(user, self.password.as_deref()),
            None => req,
        }
    }

    /// Transport failures surface as the outer error, API rejections as the inner one
    fn execute(&self, req: RequestBuilder) -> Result<std::result::Result<String, ApiError>> {
        let resp = req.send()?;
        let status = resp.status();
        let body = resp.text()?;
        if status.is_success() {
            return Ok(Ok(body));
        }
        let mut api: ApiError = serde_json::from_str(&body).unwrap_or_default();
        if api.message.is_empty() {
            api.message = format!("HTTP {}: {}", status, body.trim());
        }
        Ok(Err(api))
    }

    fn post<B: Serialize, T: DeserializeOwned>(&self, base: &Url, endpoint: &str, body: &B) -> Result<T> {
        let url = base.join(&format!("api/2.0/mlflow/{}", endpoint))?;
        debug!(endpoint, "mlflow request");
        let text = self
            .execute(self.request(Method::POST, url).json(body))?
            .map_err(|e| rejected(endpoint, e))?;
        parse_body(endpoint, &text)
    }

    fn experiment_id(&mut self) -> Result<String> {
        if let Some(id) = &self.experiment_id {
            return Ok(id.clone());
        }

        let mut url = self.base.join("api/2.0/mlflow/experiments/get-by-name")?;
        url.query_pairs_mut()
            .append_pair("experiment_name", &self.experiment_name);
        let id = match self.execute(self.request(Method::GET, url))? {
            Ok(text) => {
                parse_body::<GetExperimentResponse>("experiments/get-by-name", &text)?
                    .experiment
                    .experiment_id
            }
            Err(e) if e.error_code == "RESOURCE_DOES_NOT_EXIST" => {
                info!(experiment = %self.experiment_name, "creating experiment");
                let created: CreateExperimentResponse = self.post(
                    &self.base,
                    "experiments/create",
                    &serde_json::json!({ "name": self.experiment_name }),
                )?;
                created.experiment_id
            }
            Err(e) => return Err(rejected("experiments/get-by-name", e)),
        };

        self.experiment_id = Some(id.clone());
        Ok(id)
    }

    fn ok(&self, endpoint: &str, body: &impl Serialize) -> Result<()> {
        let _: serde_json::Value = self.post(&self.base, endpoint, body)?;
        Ok(())
    }
}

fn rejected(endpoint: &str, e: ApiError) -> NetworkSecurityError {
    if e.error_code.is_empty() {
        NetworkSecurityError::TrackingError(format!("{} failed: {}", endpoint, e.message))
    } else {
        NetworkSecurityError::TrackingError(format!(
            "{} failed: {} ({})",
            endpoint, e.message, e.error_code
        ))
    }
}

fn parse_body<T: DeserializeOwned>(endpoint: &str, text: &str) -> Result<T> {
    let body = if text.trim().is_empty() { "{}" } else { text };
    serde_json::from_str(body).map_err(|e| {
        NetworkSecurityError::TrackingError(format!("unexpected {} response: {}", endpoint, e))
    })
}

impl ExperimentTracker for MlflowClient {
    fn tracking_uri(&self) -> &str {
        &self.uri
    }

    fn start_run(&mut self) -> Result<String> {
        let experiment_id = self.experiment_id()?;
        let created: CreateRunResponse = self.post(
            &self.base,
            "runs/create",
            &serde_json::json!({
                "experiment_id": experiment_id,
                "start_time": now_millis(),
            }),
        )?;
        let info = created.run.info;
        debug!(run_id = %info.run_id, artifact_uri = %info.artifact_uri, "mlflow run started");
        self.artifact_uris.insert(info.run_id.clone(), info.artifact_uri);
        Ok(info.run_id)
    }

    fn log_metric(&mut self, run_id: &str, key: &str, value: f64) -> Result<()> {
        self.ok(
            "runs/log-metric",
            &LogMetric {
                run_id,
                key,
                value,
                timestamp: now_millis(),
                step: 0,
            },
        )
    }

    fn log_param(&mut self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.ok("runs/log-parameter", &KeyValue { run_id, key, value })
    }

    fn set_tag(&mut self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.ok("runs/set-tag", &KeyValue { run_id, key, value })
    }

    fn log_model(&mut self, run_id: &str, artifact_path: &str, model: &Classifier) -> Result<String> {
        let artifact_uri = self.artifact_uris.get(run_id).cloned().ok_or_else(|| {
            NetworkSecurityError::TrackingError(format!("unknown run {}", run_id))
        })?;
        let store_path = artifact_uri
            .strip_prefix(ARTIFACT_PROXY_SCHEME)
            .ok_or_else(|| {
                NetworkSecurityError::TrackingError(format!(
                    "artifact store {} is not served through the tracking server",
                    artifact_uri
                ))
            })?
            .trim_matches('/');

        let url = self.base.join(&format!(
            "api/2.0/mlflow-artifacts/artifacts/{}/{}/{}",
            store_path, artifact_path, MODEL_TRAINER_TRAINED_MODEL_NAME
        ))?;
        let bytes = to_bytes(model)?;
        let size = bytes.len();
        self.execute(
            self.request(Method::PUT, url)
                .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                .body(bytes),
        )?
        .map_err(|e| rejected("mlflow-artifacts/artifacts", e))?;

        let source = format!("{}/{}", artifact_uri.trim_end_matches('/'), artifact_path);
        debug!(run_id, source = %source, bytes = size, "model artifact uploaded");
        Ok(source)
    }

    fn register_model(&mut self, run_id: &str, source: &str, name: &str) -> Result<()> {
        let registry = self.registry.clone();
        let url = registry.join("api/2.0/mlflow/registered-models/create")?;
        match self.execute(
            self.request(Method::POST, url)
                .json(&serde_json::json!({ "name": name })),
        )? {
            Ok(_) => info!(name, "registered model created"),
            Err(e) if e.error_code == "RESOURCE_ALREADY_EXISTS" => {}
            Err(e) => return Err(rejected("registered-models/create", e)),
        }

        let created: CreateModelVersionResponse = self.post(
            &registry,
            "model-versions/create",
            &serde_json::json!({ "name": name, "source": source, "run_id": run_id }),
        )?;
        info!(name, version = %created.model_version.version, "model version registered");
        Ok(())
    }

    fn end_run(&mut self, run_id: &str, status: RunStatus) -> Result<()> {
        self.ok(
            "runs/update",
            &serde_json::json!({
                "run_id": run_id,
                "status": status,
                "end_time": now_millis(),
            }),
        )?;
        self.artifact_uris.remove(run_id);
        Ok(())
    }
}
