//! # Error Types Module
//!
//! Questo modulo definisce i tipi di errore custom della libreria.
//!
//! ## Responsabilità:
//! - `WalkError`: errori a livello di directory, allegati al `TraversalResult`
//! - `TransformError`: errori sul singolo file, mai propagati oltre il walker
//!
//! ## Politica di propagazione:
//! - Gli errori per singolo file vengono loggati e il walk continua
//! - Gli errori di directory vengono allegati al risultato, mai come panic
//! - Solo `TooManyWarnings` interrompe l'intero walk

use std::path::PathBuf;
use std::time::Duration;

/// Directory-level failures. Attached to the walk result, never unwound.
#[derive(thiserror::Error, Debug)]
pub enum WalkError {
    #[error("\"{0}\" does not exist")]
    NotFound(PathBuf),

    #[error("\"{path}\" is unavailable (no response within {timeout:?})")]
    Unreachable { path: PathBuf, timeout: Duration },

    #[error("IO error at \"{path}\": {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Maximum number of warnings reached ({limit}), walk aborted")]
    TooManyWarnings { limit: usize },
}

impl WalkError {
    /// Classify an OS error raised while touching `path`.
    pub fn from_io(path: PathBuf, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            WalkError::NotFound(path)
        } else {
            WalkError::Io { path, source }
        }
    }

    /// Whether this error stops every remaining frame of the walk.
    pub fn is_fatal(&self) -> bool {
        matches!(self, WalkError::TooManyWarnings { .. })
    }
}

/// Failures while re-encoding a single image.
#[derive(thiserror::Error, Debug)]
pub enum TransformError {
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Execution timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Target already exists: {0}")]
    TargetExists(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransformError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransformError::TimedOut(_))
    }
}
