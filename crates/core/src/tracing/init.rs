//! Initialization functions for tracing

use anyhow::Result;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::tracing::config::{InstrumentationConfig, LogFormat};

/// Initialize tracing with the given configuration
pub fn init_tracing(config: &InstrumentationConfig) -> Result<()> {
    // RUST_LOG wins over the configured level
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match config.format {
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true);

            tracing_subscriber::registry()
                .with(fmt_layer)
                .with(env_filter)
                .try_init()?;
        }
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(true);

            tracing_subscriber::registry()
                .with(fmt_layer)
                .with(env_filter)
                .try_init()?;
        }
    }

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        "tracing initialized"
    );

    Ok(())
}
