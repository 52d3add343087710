use std::path::PathBuf;

use anyhow::{Context, Result};
use catalog_service::prelude::*;
use colored::Colorize;

pub async fn execute(config_path: Option<PathBuf>, port: Option<u16>) -> Result<()> {
    let mut config = match &config_path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::load().context("Failed to load configuration")?,
    };
    if let Some(port) = port {
        config.service.port = port;
    }

    init_tracing(&config).context("Failed to initialize tracing")?;

    if config.is_production() && config.storage.backend == StorageBackend::Memory {
        warn!("Running in production with the in-memory store; data is lost on restart");
    }

    println!(
        "{} {} on port {} ({})",
        "Starting".green().bold(),
        config.service.name,
        config.service.port,
        config.service.environment
    );

    let state = AppState::builder()
        .config(config.clone())
        .build()
        .await
        .context("Failed to open document store")?;

    let result = Server::new(config).serve(build_router(state)).await;
    shutdown_tracing();
    result.context("Server terminated with an error")
}
