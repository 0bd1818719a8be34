//! MLflow client tests against a mock tracking server

use mockito::{Matcher, Server};
use ndarray::array;
use networksecurity::entity::ClassificationMetricArtifact;
use networksecurity::tracking::{
    track_model, tracker_from_config, ExperimentTracker, MlflowClient, RunStatus, TrackingConfig,
};
use networksecurity::training::{Classifier, ModelKind};

fn fitted_model() -> Classifier {
    let mut model = Classifier::new(ModelKind::DecisionTree, 0);
    model
        .fit(&array![[0.0], [1.0], [2.0], [3.0]], &array![0.0, 0.0, 1.0, 1.0])
        .unwrap();
    model
}

fn metric() -> ClassificationMetricArtifact {
    ClassificationMetricArtifact {
        f1_score: 0.9,
        precision_score: 0.8,
        recall_score: 1.0,
    }
}

fn config(server: &Server) -> TrackingConfig {
    TrackingConfig::new(server.url()).with_credentials("u", "p")
}

const RUN_BODY: &str = r#"{"run": {"info": {"run_id": "abc", "experiment_id": "1", "status": "RUNNING", "artifact_uri": "mlflow-artifacts:/1/abc/artifacts"}, "data": {}}}"#;

#[test]
fn test_remote_run_logs_uploads_and_registers() {
    let mut server = Server::new();

    let get_experiment = server
        .mock("GET", "/api/2.0/mlflow/experiments/get-by-name")
        .match_query(Matcher::UrlEncoded("experiment_name".into(), "Default".into()))
        .match_header("authorization", "Basic dTpw")
        .with_status(200)
        .with_body(r#"{"experiment": {"experiment_id": "1", "name": "Default"}}"#)
        .create();
    let create_run = server
        .mock("POST", "/api/2.0/mlflow/runs/create")
        .match_body(Matcher::PartialJsonString(r#"{"experiment_id": "1"}"#.into()))
        .with_status(200)
        .with_body(RUN_BODY)
        .create();
    let log_metric = server
        .mock("POST", "/api/2.0/mlflow/runs/log-metric")
        .match_body(Matcher::PartialJsonString(r#"{"run_id": "abc"}"#.into()))
        .with_status(200)
        .with_body("{}")
        .expect(3)
        .create();
    let log_param = server
        .mock("POST", "/api/2.0/mlflow/runs/log-parameter")
        .with_status(200)
        .with_body("{}")
        .expect_at_least(1)
        .create();
    let set_tag = server
        .mock("POST", "/api/2.0/mlflow/runs/set-tag")
        .match_body(Matcher::PartialJsonString(
            r#"{"key": "estimator", "value": "DecisionTreeClassifier"}"#.into(),
        ))
        .with_status(200)
        .with_body("{}")
        .create();
    let upload = server
        .mock(
            "PUT",
            "/api/2.0/mlflow-artifacts/artifacts/1/abc/artifacts/model/model.bin",
        )
        .with_status(200)
        .with_body("{}")
        .create();
    let create_registered = server
        .mock("POST", "/api/2.0/mlflow/registered-models/create")
        .with_status(400)
        .with_body(r#"{"error_code": "RESOURCE_ALREADY_EXISTS", "message": "exists"}"#)
        .create();
    let create_version = server
        .mock("POST", "/api/2.0/mlflow/model-versions/create")
        .match_body(Matcher::PartialJsonString(
            r#"{"name": "phishing_detection_model", "source": "mlflow-artifacts:/1/abc/artifacts/model", "run_id": "abc"}"#.into(),
        ))
        .with_status(200)
        .with_body(r#"{"model_version": {"name": "phishing_detection_model", "version": "3"}}"#)
        .create();
    let update = server
        .mock("POST", "/api/2.0/mlflow/runs/update")
        .match_body(Matcher::PartialJsonString(
            r#"{"run_id": "abc", "status": "FINISHED"}"#.into(),
        ))
        .with_status(200)
        .with_body("{}")
        .create();

    let mut client = MlflowClient::new(&config(&server)).unwrap();
    track_model(&mut client, &fitted_model(), &metric()).unwrap();

    get_experiment.assert();
    create_run.assert();
    log_metric.assert();
    log_param.assert();
    set_tag.assert();
    upload.assert();
    create_registered.assert();
    create_version.assert();
    update.assert();
}

#[test]
fn test_missing_experiment_is_created_once() {
    let mut server = Server::new();

    let get_experiment = server
        .mock("GET", "/api/2.0/mlflow/experiments/get-by-name")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"error_code": "RESOURCE_DOES_NOT_EXIST", "message": "no such experiment"}"#)
        .expect(1)
        .create();
    let create_experiment = server
        .mock("POST", "/api/2.0/mlflow/experiments/create")
        .match_body(Matcher::PartialJsonString(r#"{"name": "phishing"}"#.into()))
        .with_status(200)
        .with_body(r#"{"experiment_id": "7"}"#)
        .expect(1)
        .create();
    let create_run = server
        .mock("POST", "/api/2.0/mlflow/runs/create")
        .match_body(Matcher::PartialJsonString(r#"{"experiment_id": "7"}"#.into()))
        .with_status(200)
        .with_body(RUN_BODY)
        .expect(2)
        .create();

    let mut client = MlflowClient::new(&config(&server).with_experiment("phishing")).unwrap();
    assert_eq!(client.start_run().unwrap(), "abc");
    assert_eq!(client.start_run().unwrap(), "abc");

    get_experiment.assert();
    create_experiment.assert();
    create_run.assert();
}

#[test]
fn test_unproxied_artifact_store_fails_the_run() {
    let mut server = Server::new();

    server
        .mock("GET", "/api/2.0/mlflow/experiments/get-by-name")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"experiment": {"experiment_id": "1"}}"#)
        .create();
    server
        .mock("POST", "/api/2.0/mlflow/runs/create")
        .with_status(200)
        .with_body(r#"{"run": {"info": {"run_id": "abc", "artifact_uri": "s3://bucket/1/abc/artifacts"}}}"#)
        .create();
    for endpoint in ["log-metric", "log-parameter", "set-tag"] {
        server
            .mock("POST", format!("/api/2.0/mlflow/runs/{}", endpoint).as_str())
            .with_status(200)
            .with_body("{}")
            .create();
    }
    let failed = server
        .mock("POST", "/api/2.0/mlflow/runs/update")
        .match_body(Matcher::PartialJsonString(r#"{"status": "FAILED"}"#.into()))
        .with_status(200)
        .with_body("{}")
        .create();

    let mut client = MlflowClient::new(&config(&server)).unwrap();
    let err = track_model(&mut client, &fitted_model(), &metric()).unwrap_err();
    assert!(err.to_string().contains("s3://bucket"));
    failed.assert();
}

#[test]
fn test_server_error_surfaces_message() {
    let mut server = Server::new();
    server
        .mock("GET", "/api/2.0/mlflow/experiments/get-by-name")
        .match_query(Matcher::Any)
        .with_status(403)
        .with_body(r#"{"error_code": "PERMISSION_DENIED", "message": "bad token"}"#)
        .create();

    let mut client = MlflowClient::new(&config(&server)).unwrap();
    let err = client.start_run().unwrap_err();
    let text = err.to_string();
    assert!(text.contains("bad token"));
    assert!(text.contains("PERMISSION_DENIED"));
}

#[test]
fn test_end_run_sends_status() {
    let mut server = Server::new();
    let killed = server
        .mock("POST", "/api/2.0/mlflow/runs/update")
        .match_body(Matcher::PartialJsonString(r#"{"run_id": "r", "status": "KILLED"}"#.into()))
        .with_status(200)
        .create();

    let mut client = MlflowClient::new(&config(&server)).unwrap();
    client.end_run("r", RunStatus::Killed).unwrap();
    killed.assert();
}

#[test]
fn test_ended_run_forgets_artifact_location() {
    let mut server = Server::new();
    server
        .mock("GET", "/api/2.0/mlflow/experiments/get-by-name")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"experiment": {"experiment_id": "1"}}"#)
        .create();
    server
        .mock("POST", "/api/2.0/mlflow/runs/create")
        .with_status(200)
        .with_body(RUN_BODY)
        .create();
    server
        .mock("POST", "/api/2.0/mlflow/runs/update")
        .with_status(200)
        .with_body("{}")
        .create();
    let upload = server
        .mock("PUT", Matcher::Regex("^/api/2.0/mlflow-artifacts/".into()))
        .expect(0)
        .create();

    let mut client = MlflowClient::new(&config(&server)).unwrap();
    let run_id = client.start_run().unwrap();
    client.end_run(&run_id, RunStatus::Finished).unwrap();

    let err = client.log_model(&run_id, "model", &fitted_model()).unwrap_err();
    assert!(err.to_string().contains("unknown run abc"));
    upload.assert();
}

#[test]
fn test_tracker_selection_by_scheme() {
    let dir = tempfile::tempdir().unwrap();
    let file_uri = format!("file:{}", dir.path().join("mlruns").display());

    let file_tracker = tracker_from_config(&TrackingConfig::new(file_uri.clone())).unwrap();
    assert_eq!(file_tracker.tracking_uri(), file_uri);
    assert!(dir.path().join("mlruns").is_dir());

    let remote = tracker_from_config(&TrackingConfig::new("https://dagshub.com/x/y.mlflow")).unwrap();
    assert_eq!(remote.tracking_uri(), "https://dagshub.com/x/y.mlflow");
}
