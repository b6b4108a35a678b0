use anyhow::Result;
use clap::Parser;
use portal_core::tracing::{config::InstrumentationConfig, init::init_tracing};
use portal_edge::{Settings, server};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Portal edge - route gate in front of the portal pages
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Address to bind, overriding the configuration
    #[arg(short = 'b', long = "bind")]
    bind: Option<SocketAddr>,

    /// Built page tree to serve, overriding the configuration
    #[arg(long = "static-dir")]
    static_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let instrumentation_config = InstrumentationConfig {
        service_name: "portal-edge".to_string(),
        service_version: env!("CARGO_PKG_VERSION").to_string(),
        log_level: std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "portal=debug,tower_http=debug".to_string()),
        ..InstrumentationConfig::from_env()
    };
    init_tracing(&instrumentation_config)?;

    if let Some(path) = &cli.config {
        info!("Loading configuration from: {}", path.display());
    }
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        settings.server.bind_addr = bind;
    }
    if let Some(static_dir) = cli.static_dir {
        settings.server.static_dir = Some(static_dir);
    }

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
        }
        signal.cancel();
    });

    server::serve(&settings, shutdown).await?;

    Ok(())
}
