//! Market-data desk pipeline - entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Market-data pipeline runner.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via DESK_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // TLS crypto provider must be installed before any WS connections
    desk_feed::init_crypto();

    let args = Args::parse();

    desk_app::init_logging();

    info!("starting desk v{}", env!("CARGO_PKG_VERSION"));

    let config_path = args
        .config
        .or_else(|| std::env::var("DESK_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "loading configuration");
    let config = desk_app::AppConfig::from_file(&config_path)?;
    info!(
        network = %config.network,
        coin = %config.coin,
        interval = %config.interval(),
        "configuration loaded"
    );

    let mut app = desk_app::Application::new(config)?;
    app.run().await?;

    Ok(())
}
