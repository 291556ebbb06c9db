use clap::Parser;
use hepatitis_predictor::api::start_api_server;
use hepatitis_predictor::cli::{self, Cli, Commands};
use hepatitis_predictor::config::AppConfig;
use hepatitis_predictor::error::{HepatitisError, Result};
use hepatitis_predictor::logging::{init_logging, init_logging_simple};
use hepatitis_predictor::predictor::Predictor;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_from(&cli.config)?;
    if let Err(errors) = config.validate() {
        return Err(HepatitisError::Other(anyhow::anyhow!(
            "invalid configuration: {}",
            errors.join("; ")
        )));
    }

    match cli.command.clone().unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let _guard = init_logging(&config.logging);
            run_server(&config).await?;
        }
        Commands::Check => {
            init_logging_simple();
            let predictor = Predictor::load(&config.artifacts);
            let report = cli::check_artifacts(&predictor)?;
            print!("{report}");
        }
        Commands::Predict { payload } => {
            init_logging_simple();
            let predictor = Predictor::load(&config.artifacts);
            let result = cli::predict_from_file(&predictor, &payload)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

async fn run_server(config: &AppConfig) -> Result<()> {
    info!(
        model = %config.artifacts.model_path.display(),
        scaler = %config.artifacts.scaler_path.display(),
        "Loading model artifacts"
    );
    // Load once before serving; a failed load still serves health/status.
    let predictor = Arc::new(Predictor::load(&config.artifacts));
    if !predictor.ready() {
        error!("Serving in degraded mode: predictions are disabled until restart");
    }

    start_api_server(&config.server, predictor).await
}
