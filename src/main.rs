//! Network security - main entry point

use clap::Parser;
use networksecurity::cli::{cmd_predict, cmd_sync_from_s3, cmd_sync_to_s3, cmd_train, Cli, Commands, TrainOptions};
use networksecurity::entity::DataTransformationArtifact;
use networksecurity::tracking::TrackingConfig;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "networksecurity=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            train_array,
            test_array,
            preprocessor,
            config,
            tracking_uri,
            artifact_dir,
            final_model,
            n_iter,
            cv_folds,
            scoring,
        } => {
            let artifact = DataTransformationArtifact {
                transformed_object_file_path: preprocessor,
                transformed_train_file_path: train_array,
                transformed_test_file_path: test_array,
            };
            let options = TrainOptions {
                config,
                tracking_uri,
                artifact_dir,
                final_model,
                n_iter,
                cv_folds,
                scoring,
            };
            cmd_train(artifact, &options, TrackingConfig::from_env())?;
        }
        Commands::Predict { model, data, output } => {
            cmd_predict(&model, &data, &output)?;
        }
        Commands::SyncToS3 { folder, bucket_url } => {
            cmd_sync_to_s3(&folder, &bucket_url)?;
        }
        Commands::SyncFromS3 { folder, bucket_url } => {
            cmd_sync_from_s3(&folder, &bucket_url)?;
        }
    }

    Ok(())
}
