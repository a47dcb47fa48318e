mod assignment;
mod cache;
mod cli;
mod config;
mod crm;
mod error;
mod logging;
mod mapping;
mod model;
mod resources;
mod server;
mod transform;
mod util;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use cli::{Command, ServeOptions};
use crm::bitrix::BitrixClient;
use crm::ItemStore;
use resources::Gateway;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match cli::parse_args(&args)? {
        Command::Help => {
            cli::print_help();
            Ok(())
        }
        Command::Serve(options) => serve(options).await,
    }
}

async fn serve(options: ServeOptions) -> Result<()> {
    // Load config
    let config = config::load_config(options.config.as_deref())?;
    logging::init_logging(&config.logging);

    // Wire the CRM client, cache and orchestrators
    let store: Arc<dyn ItemStore> = Arc::new(BitrixClient::new(&config.crm)?);
    let cache = cache::create_cache(&config.cache);
    let gateway = Arc::new(Gateway::new(
        store,
        cache,
        config.assignment.max_concurrent_lookups,
        config.crm.shares_entity(),
    ));

    let app = server::router(
        gateway,
        Duration::from_secs(config.server.request_timeout_secs),
    );

    let bind = options.bind.unwrap_or(config.server.bind);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    info!(%bind, cache = config.cache.enabled, "ticketing gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("failed to listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
}
