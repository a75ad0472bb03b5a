//! Memebase gateway - Main entry point.

use clap::Parser;
use memebase::config::{DbConfig, ServerConfig};
use memebase::db::Session;
use memebase::http;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &ServerConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::parse();
    init_tracing(&config);

    let db_config = DbConfig::from_env()?;
    let session = Arc::new(Session::new(db_config));

    info!(
        addr = %config.bind_addr(),
        "Starting memebase gateway v{}",
        env!("CARGO_PKG_VERSION")
    );

    http::serve(&config, session).await?;

    info!("Server shutdown complete");
    Ok(())
}
