//! Structured logging setup
//!
//! JSON lines always go to stdout. With `service.log_to_file` set, two
//! daily-rotated files are written under `service.log_dir` as well:
//! `<name>.log` with everything the filter lets through and
//! `<name>_error.log` with errors only.

use std::sync::{Mutex, PoisonError};

use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::{config::Config, error::Result};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Writer guards for the file appenders; dropping them flushes pending lines
static LOG_GUARDS: Mutex<Vec<WorkerGuard>> = Mutex::new(Vec::new());

/// Install the global subscriber filtered at the configured level.
///
/// Calling this twice is harmless; the second install is reported and
/// ignored so tests can share a process.
pub fn init_tracing(config: &Config) -> Result<()> {
    let log_level = config.service.log_level.to_lowercase();
    let filter = EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let mut layers: Vec<BoxedLayer> = vec![fmt::layer().json().boxed()];
    let mut guards = Vec::new();
    if config.service.log_to_file {
        let (file_layers, file_guards) = file_layers(config)?;
        layers.extend(file_layers);
        guards = file_guards;
    }

    let installed = tracing_subscriber::registry().with(layers).with(filter).try_init();

    if let Err(e) = installed {
        tracing::debug!(error = %e, "Tracing subscriber already installed");
        return Ok(());
    }

    LOG_GUARDS
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .extend(guards);

    tracing::info!(
        service = %config.service.name,
        environment = %config.service.environment,
        log_to_file = config.service.log_to_file,
        "Tracing initialized"
    );

    Ok(())
}

/// Flush the file appenders.
///
/// Events logged afterwards still reach stdout but no longer the files.
pub fn shutdown_tracing() {
    let guards: Vec<WorkerGuard> = LOG_GUARDS
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .drain(..)
        .collect();

    tracing::info!(flushed_writers = guards.len(), "Tracing shutdown complete");
    drop(guards);
}

/// General and error-only file layers, creating `log_dir` if needed
fn file_layers(config: &Config) -> Result<(Vec<BoxedLayer>, Vec<WorkerGuard>)> {
    let dir = &config.service.log_dir;
    std::fs::create_dir_all(dir)?;

    let name = &config.service.name;
    let (general, general_guard) = tracing_appender::non_blocking(rolling::daily(dir, format!("{name}.log")));
    let (errors, errors_guard) = tracing_appender::non_blocking(rolling::daily(dir, format!("{name}_error.log")));

    let layers = vec![
        fmt::layer().json().with_ansi(false).with_writer(general).boxed(),
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(errors)
            .with_filter(LevelFilter::ERROR)
            .boxed(),
    ];

    Ok((layers, vec![general_guard, errors_guard]))
}
