//! # Logging Setup
//!
//! Tre destinazioni per i log di `tracing`:
//! - console, filtrata da `RUST_LOG` (default `info`, `debug` con `--verbose`)
//! - `<log_dir>/<log_name>.log` con tutto da DEBUG in su
//! - `<log_dir>/<log_name>_error.log` con i soli errori
//!
//! I due file sono anche gli allegati della notifica email.

use crate::config::LoggerSettings;
use anyhow::Result;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::error;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

/// Install the global subscriber.
pub fn init(settings: &LoggerSettings, verbose: bool) -> Result<()> {
    std::fs::create_dir_all(&settings.log_dir)?;
    let main_log = open_append(&settings.main_log())?;
    let error_log = open_append(&settings.error_log())?;

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    let file_filter = EnvFilter::new(format!("info,{}=debug", env!("CARGO_CRATE_NAME")));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_filter(console_filter))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(main_log))
                .with_filter(file_filter),
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(error_log))
                .with_filter(LevelFilter::ERROR),
        )
        .try_init()?;

    Ok(())
}

/// Log panics as critical failures before the default hook runs.
pub fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        error!("CRITICAL: {}", info);
        default_hook(info);
    }));
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| anyhow::anyhow!("Cannot open log file {}: {}", path.display(), e))
}
