//! # File Management Module
//!
//! Operazioni sui singoli file usate dal walker.
//!
//! ## Responsabilità:
//! - Conversione byte → megabyte con arrotondamento a 2 decimali
//! - Normalizzazione dei nomi file (spazi → trattini) senza sovrascritture
//! - Costruzione del nome di destinazione con il postfix
//!
//! ## Nota sulla conversione:
//! Dimensioni sotto i 105 byte valgono 0 MB. È un comportamento storico
//! mantenuto per compatibilità dei conteggi.

use std::path::Path;
use tracing::{info, warn};

/// Sizes below this many bytes count as zero megabytes
pub const MIN_MEASURABLE_BYTES: u64 = 105;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

pub struct FileManager;

impl FileManager {
    /// Bytes to megabytes, rounded to 2 decimals, floored to zero under 105 bytes
    pub fn convert_size(size: u64) -> f64 {
        if size >= MIN_MEASURABLE_BYTES {
            Self::round2(size as f64 / BYTES_PER_MB)
        } else {
            0.0
        }
    }

    pub fn round2(value: f64) -> f64 {
        (value * 100.0).round() / 100.0
    }

    /// Insert `postfix` right before the extension starting at `extension_index`
    pub fn compressed_name(filename: &str, extension_index: usize, postfix: &str) -> String {
        let (stem, extension) = filename.split_at(extension_index);
        format!("{}{}{}", stem, postfix, extension)
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}

/// Outcome of a filename normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    RenamedTo(String),
    Unchanged,
}

/// Replaces spaces in filenames with hyphens, never overwriting an existing file
pub struct FilenameNormalizer;

impl FilenameNormalizer {
    pub fn normalize(dir_path: &Path, filename: &str) -> Normalized {
        if !filename.contains(' ') {
            return Normalized::Unchanged;
        }

        let new_filename = filename.replace(' ', "-");
        let source = dir_path.join(filename);
        let target = dir_path.join(&new_filename);

        match target.try_exists() {
            Ok(false) => {}
            Ok(true) => {
                warn!(">>> \"{}\" was not renamed: \"{}\" already exists", filename, new_filename);
                return Normalized::Unchanged;
            }
            Err(e) => {
                warn!(">>> \"{}\" could not be renamed. Error: {}", source.display(), e);
                return Normalized::Unchanged;
            }
        }

        match std::fs::rename(&source, &target) {
            Ok(()) => {
                info!(">>> \"{}\" was renamed to \"{}\"", filename, new_filename);
                Normalized::RenamedTo(new_filename)
            }
            Err(e) => {
                warn!(">>> \"{}\" could not be renamed. Error: {}", source.display(), e);
                Normalized::Unchanged
            }
        }
    }
}
