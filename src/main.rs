use anyhow::Result;
use clap::{Parser, Subcommand};
use lens::client::{HttpVisionClient, VisionApi};
use lens::config::{ApiConfig, ConfigLoader, Profile};
use lens::observability::init_tracing;
use lens::services::{PredictionService, create_prediction_service};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Lens - CNN image recognition client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "lens.toml")]
    config: PathBuf,

    /// Deployment profile (local, production); overrides LENS_PROFILE
    #[arg(short, long)]
    profile: Option<String>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check backend health
    Health,
    /// Upload an image and print the predicted classes
    Predict {
        /// Image file
        image: PathBuf,
        /// Number of results to print
        #[arg(long, default_value_t = 5)]
        top: usize,
    },
    /// Print the resolved configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let logging = ConfigLoader::load_logging_config()?;
    init_tracing(&logging).map_err(|e| anyhow::anyhow!(e))?;

    if !args.config.exists() {
        info!(path = %args.config.display(), "No config file found, using profile defaults");
    }

    let config = match args.profile.as_deref() {
        Some(profile) => ConfigLoader::load_profile(profile.parse::<Profile>()?, &args.config)?,
        None => ConfigLoader::load_from(&args.config)?,
    };
    let config = Arc::new(config);
    info!(profile = %config.profile, "Starting Lens");

    match args.command {
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(config.as_ref())?);
        }
        Command::Health => {
            let service = build_service(&config)?;
            let report = service.check_backend().await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "{} ({})",
                    report.status,
                    report.model.as_deref().unwrap_or("unknown model")
                );
            }
            if !report.is_ok() {
                anyhow::bail!("backend reported status '{}'", report.status);
            }
        }
        Command::Predict { image, top } => {
            let service = build_service(&config)?;
            let predictions = service.classify_file(&image, top).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&predictions)?);
            } else {
                println!("Results for {}:", image.display());
                for (i, p) in predictions.iter().enumerate() {
                    println!("{}. {}: {:.2}%", i + 1, p.name, p.confidence);
                }
            }
        }
    }

    Ok(())
}

fn build_service(config: &Arc<ApiConfig>) -> lens::error::Result<Box<dyn PredictionService>> {
    let api: Arc<dyn VisionApi> = Arc::new(HttpVisionClient::new(config.clone())?);
    Ok(create_prediction_service(config, api))
}
