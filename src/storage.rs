//! # Storage Module
//!
//! Astrazione minima sul filesystem usata da probe e filtro di eleggibilità.
//! Permette di simulare storage lenti o irraggiungibili nei test.

use std::io;
use std::path::Path;
use std::time::SystemTime;
use tracing::debug;
use walkdir::WalkDir;

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub name: String,
    pub is_dir: bool,
    pub is_symlink: bool,
    /// Creation time, or modification time where the platform has none
    pub created: Option<SystemTime>,
}

/// Lists a single directory level. Implementations may block for a long time.
pub trait Storage: Send + Sync + 'static {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<RawEntry>>;

    /// Entry names only, without per-entry metadata. Used for reachability checks.
    fn list_names(&self, path: &Path) -> io::Result<Vec<String>> {
        Ok(self.read_dir(path)?.into_iter().map(|entry| entry.name).collect())
    }
}

/// Local (or mounted) filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorage;

impl Storage for LocalStorage {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<RawEntry>> {
        let mut entries = Vec::new();

        for entry in WalkDir::new(path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry.map_err(walk_error_to_io)?;

            let name = match entry.file_name().to_str() {
                Some(name) => name.to_string(),
                None => {
                    debug!("Skipping entry with non UTF-8 name: {}", entry.path().display());
                    continue;
                }
            };

            let file_type = entry.file_type();
            let created = entry
                .metadata()
                .ok()
                .and_then(|m| m.created().or_else(|_| m.modified()).ok());

            entries.push(RawEntry {
                name,
                is_dir: file_type.is_dir(),
                is_symlink: file_type.is_symlink(),
                created,
            });
        }

        Ok(entries)
    }

    fn list_names(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in WalkDir::new(path).min_depth(1).max_depth(1).follow_links(false) {
            let entry = entry.map_err(walk_error_to_io)?;
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        Ok(names)
    }
}

fn walk_error_to_io(e: walkdir::Error) -> io::Error {
    let kind = e.io_error().map(|io| io.kind()).unwrap_or(io::ErrorKind::Other);
    io::Error::new(kind, e.to_string())
}
