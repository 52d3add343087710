use clap::{Parser, Subcommand};
use colored::Colorize;

mod commands;

use commands::config::ConfigCommands;

/// catalog - run and probe the catalog REST service
#[derive(Parser)]
#[command(name = "catalog")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the service in the foreground
    Serve {
        /// Load configuration from this file instead of the search path
        #[arg(short, long, value_name = "FILE")]
        config: Option<std::path::PathBuf>,

        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Check the health and readiness of a running service
    Health {
        /// Base URL of the service
        #[arg(long, default_value = "http://localhost:8080", env = "CATALOG_URL")]
        url: String,

        /// Show response details
        #[arg(short, long)]
        verbose: bool,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { config, port } => commands::serve::execute(config, port).await,
        Commands::Health { url, verbose } => commands::health::execute(verbose, url).await,
        Commands::Config { command } => commands::config::execute(command),
    };

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);

            if let Some(source) = e.source() {
                eprintln!("\n{} {}", "Caused by:".yellow(), source);
            }

            std::process::exit(1);
        }
    }
}
