use std::path::PathBuf;

use anyhow::{Context, Result};
use catalog_service::config::Config;
use clap::Subcommand;
use colored::Colorize;

const SERVICE_NAME: &str = "catalog-service";

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show {
        /// Load this file instead of searching
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// List the files searched for configuration, highest priority first
    Path,
}

pub fn execute(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show { config } => show(config),
        ConfigCommands::Path => path(),
    }
}

fn show(config_path: Option<PathBuf>) -> Result<()> {
    let config = match &config_path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::load().context("Failed to load configuration")?,
    };

    let rendered = render(&config)?;
    println!("{}", rendered);
    Ok(())
}

fn render(config: &Config) -> Result<String> {
    let mut config = config.clone();
    if config.storage.password.is_some() {
        config.storage.password = Some("***".to_string());
    }
    toml::to_string_pretty(&config).context("Failed to render configuration")
}

fn path() -> Result<()> {
    println!("{}", "Configuration search order:".bold());
    for path in Config::find_config_paths(SERVICE_NAME) {
        let marker = if path.exists() { "✓ found".green() } else { "- absent".dimmed() };
        println!("  {} {}", marker, path.display());
    }
    println!();
    println!(
        "{} {}",
        "Recommended:".bold(),
        Config::recommended_path(SERVICE_NAME).display()
    );
    println!(
        "{} CATALOG_<SECTION>__<KEY>, e.g. CATALOG_SERVICE__PORT=9000",
        "Environment overrides:".bold()
    );
    Ok(())
}
