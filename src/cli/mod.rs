//! Network security CLI
//!
//! Command-line interface for training, batch prediction and bucket sync.

use clap::{Parser, Subcommand};
use colored::*;
use ndarray::Array2;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::cloud::S3Sync;
use crate::components::ModelTrainer;
use crate::constants::PREDICTION_COLUMN;
use crate::entity::{
    ClassificationMetricArtifact, DataTransformationArtifact, ModelTrainerConfig,
    TrainingPipelineConfig,
};
use crate::estimator::NetworkModel;
use crate::metrics::ScoringMetric;
use crate::tracking::{tracker_from_config, TrackingConfig};
use crate::training::SearchStrategy;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn print_metric(label: &str, metric: &ClassificationMetricArtifact) {
    println!(
        "  {:<8} {} {}  {} {}  {} {}",
        muted(label),
        muted("f1"),
        format!("{:.4}", metric.f1_score).white().bold(),
        muted("precision"),
        format!("{:.4}", metric.precision_score).white(),
        muted("recall"),
        format!("{:.4}", metric.recall_score).white(),
    );
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "networksecurity")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Phishing-domain classifier training and serving")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search, evaluate, track and persist the best classifier
    Train {
        /// Transformed training array (features + label column)
        #[arg(long)]
        train_array: PathBuf,

        /// Transformed test array (features + label column)
        #[arg(long)]
        test_array: PathBuf,

        /// Fitted preprocessing object
        #[arg(long)]
        preprocessor: PathBuf,

        /// JSON file with trainer settings
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Tracking server or `file:` store, overrides MLFLOW_TRACKING_URI
        #[arg(long)]
        tracking_uri: Option<String>,

        /// Directory holding the timestamped `Artifacts/` tree
        #[arg(long)]
        artifact_dir: Option<PathBuf>,

        /// Where the bare best model is written
        #[arg(long)]
        final_model: Option<PathBuf>,

        /// Sample this many candidates per model instead of the full grid
        #[arg(long)]
        n_iter: Option<usize>,

        /// Number of cross-validation folds
        #[arg(long)]
        cv_folds: Option<usize>,

        /// Held-out scoring metric (r2, accuracy, f1)
        #[arg(long)]
        scoring: Option<ScoringMetric>,
    },

    /// Predict a CSV of raw features with a trained model bundle
    Predict {
        /// Trained model bundle
        #[arg(short, long)]
        model: PathBuf,

        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// Output CSV file
        #[arg(short, long, default_value = "prediction_output/output.csv")]
        output: PathBuf,
    },

    /// Upload a local folder to a bucket URL
    SyncToS3 {
        #[arg(short, long)]
        folder: String,

        #[arg(short, long)]
        bucket_url: String,
    },

    /// Download a bucket URL into a local folder
    SyncFromS3 {
        #[arg(short, long)]
        folder: String,

        #[arg(short, long)]
        bucket_url: String,
    },
}

/// Trainer settings taken from the command line
#[derive(Debug, Default)]
pub struct TrainOptions {
    pub config: Option<PathBuf>,
    pub tracking_uri: Option<String>,
    pub artifact_dir: Option<PathBuf>,
    pub final_model: Option<PathBuf>,
    pub n_iter: Option<usize>,
    pub cv_folds: Option<usize>,
    pub scoring: Option<ScoringMetric>,
}

impl TrainOptions {
    /// Merge command-line overrides over the file or default configuration
    pub fn trainer_config(&self) -> anyhow::Result<ModelTrainerConfig> {
        let mut pipeline = TrainingPipelineConfig::default();
        if let Some(root) = &self.artifact_dir {
            pipeline = pipeline.with_artifact_root(root);
        }

        let mut config = match &self.config {
            Some(path) => ModelTrainerConfig::from_json_file(path)?,
            None => ModelTrainerConfig::new(&pipeline),
        };
        if self.config.is_some() && self.artifact_dir.is_some() {
            let layout = ModelTrainerConfig::new(&pipeline);
            config.model_trainer_dir = layout.model_trainer_dir;
            config.trained_model_file_path = layout.trained_model_file_path;
        }
        if let Some(path) = &self.final_model {
            config = config.with_final_model_path(path);
        }
        if let Some(n_iter) = self.n_iter {
            config = config.with_strategy(SearchStrategy::Randomized { n_iter });
        }
        if let Some(folds) = self.cv_folds {
            config = config.with_cv_folds(folds);
        }
        if let Some(scoring) = self.scoring {
            config = config.with_scoring(scoring);
        }
        config.validate()?;
        Ok(config)
    }
}

// ─── Data loading ──────────────────────────────────────────────────────────────

pub fn load_csv(path: &Path) -> anyhow::Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_infer_schema_length(Some(1000))
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

/// Numeric matrix of every column; nulls become NaN
pub fn frame_to_array(df: &DataFrame) -> anyhow::Result<Array2<f64>> {
    let mut columns = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        let series = column.as_materialized_series().cast(&DataType::Float64)?;
        let values: Vec<f64> = series
            .f64()?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();
        columns.push(values);
    }
    Ok(Array2::from_shape_fn((df.height(), columns.len()), |(i, j)| {
        columns[j][i]
    }))
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(
    artifact: DataTransformationArtifact,
    options: &TrainOptions,
    mut tracking: TrackingConfig,
) -> anyhow::Result<()> {
    section("Train");

    let config = options.trainer_config()?;
    if let Some(uri) = &options.tracking_uri {
        tracking.tracking_uri = uri.clone();
    }
    step_ok(&format!(
        "{} models, {} folds, scored by {}",
        config.catalog.len(),
        config.search.cv_folds,
        config.search.scoring
    ));
    step_ok(&format!("tracking to {}", tracking.tracking_uri.cyan()));

    let mut tracker = tracker_from_config(&tracking)?;
    let trainer = ModelTrainer::new(config, artifact);

    step_run("Training");
    let start = Instant::now();
    let result = trainer.initiate_model_trainer(tracker.as_mut())?;
    step_done(&format!("{:.1?}", start.elapsed()));

    println!();
    print_metric("train", &result.train_metric_artifact);
    print_metric("test", &result.test_metric_artifact);
    println!(
        "  {:<8} {}",
        muted("model"),
        result.trained_model_file_path.display().to_string().white()
    );
    println!();

    Ok(())
}

pub fn cmd_predict(model_path: &Path, data_path: &Path, output: &Path) -> anyhow::Result<()> {
    section("Predict");

    step_run("Loading model");
    let model = NetworkModel::load(model_path)?;
    step_done(model.model().name());

    step_run("Loading data");
    let mut df = load_csv(data_path)?;
    let x = frame_to_array(&df)?;
    step_done(&format!("{} rows × {} cols", df.height(), df.width()));

    step_run("Predicting");
    let preds = model.predict(&x)?;
    df.with_column(Series::new(PREDICTION_COLUMN.into(), preds.to_vec()))?;
    step_done(&format!("{} predictions", preds.len()));

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::File::create(output)?;
    CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;
    step_ok(&format!("written to {}", output.display()));
    println!();

    Ok(())
}

pub fn cmd_sync_to_s3(folder: &str, bucket_url: &str) -> anyhow::Result<()> {
    S3Sync::new().sync_folder_to_s3(folder, bucket_url);
    Ok(())
}

pub fn cmd_sync_from_s3(folder: &str, bucket_url: &str) -> anyhow::Result<()> {
    S3Sync::new().sync_folder_from_s3(folder, bucket_url);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_train_command() {
        let cli = Cli::try_parse_from([
            "networksecurity",
            "train",
            "--train-array",
            "a/train.bin",
            "--test-array",
            "a/test.bin",
            "--preprocessor",
            "a/preprocessing.bin",
            "--n-iter",
            "5",
            "--scoring",
            "f1",
        ])
        .unwrap();
        match cli.command {
            Commands::Train { n_iter, scoring, .. } => {
                assert_eq!(n_iter, Some(5));
                assert_eq!(scoring, Some(ScoringMetric::F1));
            }
            _ => panic!("expected train"),
        }
    }

    #[test]
    fn test_rejects_unknown_scoring() {
        let parsed = Cli::try_parse_from([
            "networksecurity",
            "train",
            "--train-array",
            "t",
            "--test-array",
            "t",
            "--preprocessor",
            "p",
            "--scoring",
            "auc",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_train_options_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let options = TrainOptions {
            artifact_dir: Some(dir.path().to_path_buf()),
            final_model: Some(dir.path().join("final.bin")),
            n_iter: Some(2),
            cv_folds: Some(4),
            ..Default::default()
        };
        let config = options.trainer_config().unwrap();
        assert!(config.trained_model_file_path.starts_with(dir.path()));
        assert_eq!(config.final_model_file_path, dir.path().join("final.bin"));
        assert_eq!(config.search.strategy, SearchStrategy::Randomized { n_iter: 2 });
        assert_eq!(config.search.cv_folds, 4);
    }

    #[test]
    fn test_frame_to_array_fills_nulls() {
        let df = df!(
            "a" => [Some(1i64), None],
            "b" => [0.5f64, -1.0],
        )
        .unwrap();
        let x = frame_to_array(&df).unwrap();
        assert_eq!(x.shape(), &[2, 2]);
        assert_eq!(x[[0, 0]], 1.0);
        assert!(x[[1, 0]].is_nan());
        assert_eq!(x[[1, 1]], -1.0);
    }

    #[test]
    fn test_predict_appends_prediction_column() {
        use crate::preprocessing::Preprocessor;
        use crate::training::{Classifier, ModelKind};
        use ndarray::array;

        let dir = tempfile::tempdir().unwrap();
        let x = array![[-1.0, 0.0], [-1.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];
        let mut preprocessor = Preprocessor::new();
        preprocessor.fit(&x).unwrap();
        let mut model = Classifier::new(ModelKind::DecisionTree, 0);
        model.fit(&x, &y).unwrap();
        let model_path = dir.path().join("model.bin");
        NetworkModel::new(preprocessor, model).unwrap().save(&model_path).unwrap();

        let data_path = dir.path().join("input.csv");
        std::fs::write(&data_path, "a,b\n-1,0\n1,\n1,1\n").unwrap();
        let output = dir.path().join("out/output.csv");
        cmd_predict(&model_path, &data_path, &output).unwrap();

        let written = std::fs::read_to_string(&output).unwrap();
        let mut lines = written.lines();
        assert_eq!(lines.next(), Some("a,b,predicted_column"));
        assert_eq!(lines.count(), 3);
    }
}
