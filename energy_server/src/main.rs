//! Energy Server - floor energy forecasts over HTTP
//!
//! # Usage
//!
//! ```bash
//! energy_server --config energy.toml
//! energy_server --dataset energy_consumption_dataset.csv --models-dir models --port 5000
//! ```

use clap::Parser;
use energy_server::{charts, create_router, AppState, Config};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Energy Server - floor energy forecasts over HTTP
#[derive(Parser, Debug)]
#[command(name = "energy_server")]
#[command(version)]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Energy dataset CSV
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// Directory holding per-floor model and scaler files
    #[arg(long)]
    models_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "energy_server=info,energy_forecast=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Energy Server v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::default(),
    };
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(dataset) = args.dataset {
        config.data.dataset_path = dataset;
    }
    if let Some(models_dir) = args.models_dir {
        config.data.models_dir = models_dir;
    }

    let font = charts::register_chart_font(config.charts.font_path.as_deref())?;
    info!(?font, "chart font ready");

    let state = AppState::from_config(&config)?;
    info!(floors = ?state.service.floors(), "forecast service ready");

    let app = create_router(state);
    let addr: SocketAddr = config.bind_address().parse()?;
    info!("Energy Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
