//! # Image Compressor - Main Entry Point
//!
//! Punto di ingresso dell'applicazione.
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (file di configurazione, percorso, verbose)
//! 2. Carica e valida la configurazione
//! 3. Configura il logging (console + file di log + file errori)
//! 4. Verifica che la radice esista, poi esegue il walk cronometrandolo
//! 5. Logga il riepilogo, invia la notifica email ed esce con il codice dell'esito
//!
//! ## Esempio di utilizzo:
//! ```bash
//! image-compressor --config config.json --path /mnt/photos --verbose
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info};

use image_compressor::{logging, Config, DirectoryWalker, EmailNotifier, RunReport};

#[derive(Parser)]
#[command(name = "image-compressor")]
#[command(about = "Recursively recompress JPEG and PNG images in place")]
struct Args {
    /// JSON configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Root directory (overrides `compress.img_path`)
    #[arg(short, long)]
    path: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = match Config::from_file(&args.config).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(path) = args.path {
        config.compress.img_path = path;
    }

    if let Err(e) = logging::init(&config.logger, args.verbose) {
        eprintln!("❌ Cannot initialize logging: {}", e);
        return ExitCode::FAILURE;
    }
    logging::install_panic_hook();

    let root = config.compress.img_path.clone();
    info!("Starting script...");
    info!("Root: {}", root.display());

    let walker = DirectoryWalker::local(&config);
    match walker.exists(&root).await {
        Ok(true) => {}
        Ok(false) => {
            error!("CRITICAL: root path does not exist: {}", root.display());
            return ExitCode::FAILURE;
        }
        Err(e) => {
            error!("CRITICAL: root path cannot be checked: {} ({})", root.display(), e);
            return ExitCode::FAILURE;
        }
    }

    let start = Instant::now();
    let result = walker.walk(&root).await;
    let elapsed = start.elapsed();

    if let Some(e) = &result.error {
        error!("The storage is unavailable or something went wrong. Stopping... ({})", e);
    }
    info!("{}", result.format_summary(elapsed.as_secs_f64()));

    let report = RunReport::from_result(&root, &result, elapsed);
    EmailNotifier::new(&config).notify(&report).await;

    ExitCode::from(result.outcome(&root).exit_code())
}
