//! Flood Prediction Service - HTTP server
//!
//! Loads one classifier at startup and answers:
//! 1. POST /predict with a flood / no-flood label and its probability
//! 2. GET /health with service and model status
//! 3. GET /api/weather with current Open-Meteo conditions
//!
//! Usage:
//!   cargo run --release                          # predict_service.toml if present, else defaults
//!   cargo run --release -- --config prod.toml    # explicit config file
//!   cargo run --release -- --mock --port 8080    # rainfall threshold rule, no artifact
//!
//! Environment (also read from .env):
//!   FLOOD_HOST, FLOOD_PORT, FLOOD_MODEL_PATH, FLOOD_DEBUG
//!   RUST_LOG - tracing filter, overrides the default level

use clap::Parser;
use flood_predict_service::config::{Backend, ServiceConfig};
use flood_predict_service::endpoint::{self, EndpointContext};
use flood_predict_service::predict::Predictor;
use flood_predict_service::weather::WeatherClient;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "flood_predict_service",
    version,
    about = "HTTP flood risk classifier"
)]
struct Args {
    /// TOML config file (default: predict_service.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bind host, overrides config and FLOOD_HOST
    #[arg(long)]
    host: Option<String>,

    /// Bind port, overrides config and FLOOD_PORT
    #[arg(long)]
    port: Option<u16>,

    /// Log raw /predict payloads
    #[arg(long)]
    debug: bool,

    /// Serve the rainfall threshold rule instead of a model artifact
    #[arg(long)]
    mock: bool,
}

fn main() {
    let args = Args::parse();

    println!("🌊 Flood Prediction Service");
    println!("===========================\n");

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(config.server.debug);

    println!("📊 Loading model ({:?} backend)...", config.model.backend);
    let predictor = match Predictor::from_config(&config) {
        Ok(predictor) => predictor,
        Err(e) => {
            eprintln!("\n❌ Model load failed: {}\n", e);
            std::process::exit(1);
        }
    };
    if predictor.is_ready() {
        println!("✓ Model ready (schema: {})\n", predictor.schema().name);
    } else {
        println!("⚠️  Model unavailable; /predict will answer 503\n");
    }

    let weather = if config.weather.enabled {
        match WeatherClient::new(&config.weather) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(error = %e, "Weather passthrough disabled: client setup failed");
                None
            }
        }
    } else {
        info!("Weather passthrough disabled by configuration");
        None
    };

    let context = EndpointContext::new(predictor, weather, config.server.debug);

    println!("🚀 Starting HTTP endpoint server...");
    if let Err(e) = endpoint::start_endpoint_server(
        &config.bind_address(),
        context,
        config.server.workers,
    ) {
        error!(error = %e, "Endpoint server stopped");
        eprintln!("\n❌ Endpoint server error: {}", e);
        std::process::exit(1);
    }
}

/// File, then environment, then command line.
fn build_config(args: &Args) -> Result<ServiceConfig, Box<dyn std::error::Error>> {
    let mut config = ServiceConfig::load(args.config.as_deref())?;
    config.apply_env()?;

    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.debug {
        config.server.debug = true;
    }
    if args.mock {
        config.model.backend = Backend::Mock;
    }

    config.validate()?;
    Ok(config)
}

fn init_tracing(debug: bool) {
    let default_directive = if debug {
        "info,flood_predict_service=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
