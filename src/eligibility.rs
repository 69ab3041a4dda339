//! # File Eligibility Filter
//!
//! Decide quali voci di una directory sono candidate: immagini non ancora
//! compresse e abbastanza vecchie, oppure sottodirectory.
//!
//! ## Regole (in ordine):
//! 1. Nome contenente il postfix → già processato, escluso
//! 2. Link simbolici → esclusi
//! 3. Directory → sempre candidate (l'ignore-list è gestita dal walker)
//! 4. File → candidato solo se l'estensione è riconosciuta e l'età in giorni
//!    è almeno `creation_days`

use crate::config::CompressSettings;
use crate::storage::{RawEntry, Storage};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// An entry selected for processing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub name: String,
    pub full_path: PathBuf,
    /// Byte offset of the matched extension in `name`
    pub extension_index: Option<usize>,
    pub age_in_days: u64,
    pub is_directory: bool,
}

/// Why an entry was left out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    AlreadyProcessed,
    Symlink,
    NotAnImage,
    TooRecent { age_in_days: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    pub name: String,
    pub reason: RejectReason,
}

/// Filtered directory listing, candidates sorted by name
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Listing {
    pub candidates: Vec<FileCandidate>,
    pub rejected: Vec<Rejected>,
}

#[derive(Debug, Clone)]
pub struct FileEligibilityFilter {
    extensions: Vec<String>,
    postfix: String,
    min_age_days: u64,
}

impl FileEligibilityFilter {
    /// `settings.image_formats` is expected to be normalized (see `Config::normalize`)
    pub fn new(settings: &CompressSettings) -> Self {
        Self {
            extensions: settings.image_formats.clone(),
            postfix: settings.postfix.clone(),
            min_age_days: settings.creation_days,
        }
    }

    /// List `dir` through `storage` and filter it against the current time.
    pub fn filter(&self, storage: &dyn Storage, dir: &Path) -> io::Result<Listing> {
        let entries = storage.read_dir(dir)?;
        Ok(self.select(dir, entries, SystemTime::now()))
    }

    /// Apply the eligibility rules to an already fetched listing.
    pub fn select(&self, dir: &Path, entries: Vec<RawEntry>, now: SystemTime) -> Listing {
        let mut listing = Listing::default();

        for entry in entries {
            if entry.name.contains(&self.postfix) {
                listing.rejected.push(Rejected { name: entry.name, reason: RejectReason::AlreadyProcessed });
                continue;
            }

            if entry.is_symlink {
                listing.rejected.push(Rejected { name: entry.name, reason: RejectReason::Symlink });
                continue;
            }

            let age_in_days = entry.created.map(|created| age_in_days(created, now)).unwrap_or(0);

            if entry.is_dir {
                listing.candidates.push(FileCandidate {
                    full_path: dir.join(&entry.name),
                    name: entry.name,
                    extension_index: None,
                    age_in_days,
                    is_directory: true,
                });
                continue;
            }

            let extension_index = match self.extension_index(&entry.name) {
                Some(index) => index,
                None => {
                    listing.rejected.push(Rejected { name: entry.name, reason: RejectReason::NotAnImage });
                    continue;
                }
            };

            if age_in_days < self.min_age_days {
                listing.rejected.push(Rejected {
                    name: entry.name,
                    reason: RejectReason::TooRecent { age_in_days },
                });
                continue;
            }

            listing.candidates.push(FileCandidate {
                full_path: dir.join(&entry.name),
                name: entry.name,
                extension_index: Some(extension_index),
                age_in_days,
                is_directory: false,
            });
        }

        listing.candidates.sort_by(|a, b| a.name.cmp(&b.name));
        listing
    }

    /// Offset where a recognized extension starts, matching case-insensitively on the suffix.
    pub fn extension_index(&self, name: &str) -> Option<usize> {
        self.extensions.iter().find_map(|ext| {
            let index = name.len().checked_sub(ext.len())?;
            if index == 0 || !name.is_char_boundary(index) {
                return None;
            }
            (name[index..].to_lowercase() == *ext).then_some(index)
        })
    }
}

/// Whole days elapsed since `created`; timestamps in the future count as zero.
pub fn age_in_days(created: SystemTime, now: SystemTime) -> u64 {
    now.duration_since(created)
        .map(|elapsed| elapsed.as_secs() / SECONDS_PER_DAY)
        .unwrap_or(0)
}
