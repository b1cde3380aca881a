use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tumor_classifier::{build_service, config::Config, http, training};

#[derive(Parser)]
#[command(name = "tumor-classifier")]
#[command(about = "Serve tumor malignancy predictions over HTTP")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Serve,
    /// Retrain the model from the dataset and overwrite the artifact
    Train,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    tracing_subscriber::fmt()
        .with_env_filter(config.runtime.log_level.as_str())
        .init();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            info!(
                "Starting tumor-classifier: model={}, dataset={}",
                config.model.artifact_path.display(),
                config.dataset.path.display()
            );
            let service = build_service(&config)?;
            info!("Serving {} features", service.feature_names().len());
            http::start_http_server(&config, Arc::new(service)).await?;
        }
        Commands::Train => {
            let artifact = training::train_and_save(&config)?;
            info!(
                "Training finished: {} rows, holdout accuracy {:?}",
                artifact.metadata.trained_rows, artifact.metadata.holdout_accuracy
            );
        }
    }

    Ok(())
}
