//! # Image Compressor Library
//!
//! Compressione ricorsiva delle immagini JPEG/PNG sotto una directory radice,
//! anche su storage di rete che può non rispondere.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi principali tramite re-exports per `main.rs` e per i test
//!
//! ## Architettura dei moduli:
//! - `config`: Configurazione JSON e validazione parametri
//! - `error`: Errori di attraversamento e di trasformazione
//! - `deadline`: Esecuzione con timeout di operazioni bloccanti
//! - `storage`: Accesso al filesystem dietro un trait
//! - `probe`: Verifica di raggiungibilità di un percorso
//! - `eligibility`: Selezione dei file da comprimere
//! - `file_manager`: Rinomina dei file e conversione delle dimensioni
//! - `image_processor`: Ricompressione di una singola immagine
//! - `walker`: Attraversamento ricorsivo della directory
//! - `progress`: Totali accumulati ed esito del walk
//! - `logging`: Console, file di log ed errori
//! - `notify`: Notifica email di fine esecuzione
//!
//! ## Utilizzo:
//! ```rust,no_run
//! use image_compressor::{Config, DirectoryWalker};
//! use std::path::Path;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::from_file(Path::new("config.json")).await?;
//! let result = DirectoryWalker::local(&config).walk(&config.compress.img_path).await;
//! println!("{}", result.format_summary(0.0));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod deadline;
pub mod eligibility;
pub mod error;
pub mod file_manager;
pub mod image_processor;
pub mod logging;
pub mod notify;
pub mod probe;
pub mod progress;
pub mod storage;
pub mod walker;

pub use config::Config;
pub use error::{TransformError, WalkError};
pub use notify::{EmailNotifier, RunReport};
pub use progress::{TraversalResult, WalkOutcome};
pub use walker::DirectoryWalker;
