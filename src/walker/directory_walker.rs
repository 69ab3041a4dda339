//! # Directory Walker
//!
//! Stati per ogni frame di directory: `Probing → Listing → PerEntry → Returning`.
//!
//! - **Probing**: se la directory non risponde entro il timeout, il frame ritorna
//!   i contatori invariati con l'errore `Unreachable` allegato
//! - **Listing**: filtro di eleggibilità, anch'esso limitato dal timeout
//! - **PerEntry**: nuovo probe prima di ogni voce; le directory vengono visitate
//!   ricorsivamente (salvo ignore-list e nomi nascosti), i file rinominati e compressi
//! - **Returning**: i contatori accumulati tornano al chiamante
//!
//! Un errore in un sottoalbero non ferma i fratelli: resta allegato al risultato
//! e risale fino alla radice. Solo il superamento di `max_warnings` interrompe tutto.

use crate::config::Config;
use crate::deadline::{run_blocking_io, run_detached, Deadline};
use crate::eligibility::{FileCandidate, FileEligibilityFilter, Listing, RejectReason};
use crate::error::WalkError;
use crate::file_manager::{FilenameNormalizer, Normalized};
use crate::image_processor::{ImageCodec, ImageCrateCodec, ImageTransform, TransformOutcome};
use crate::probe::{Availability, PathAvailabilityProbe};
use crate::progress::TraversalResult;
use crate::storage::{LocalStorage, Storage};
use futures::future::{BoxFuture, FutureExt};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Recursive, strictly sequential image compression walk
pub struct DirectoryWalker<'a> {
    config: &'a Config,
    storage: Arc<dyn Storage>,
    probe: PathAvailabilityProbe,
    filter: Arc<FileEligibilityFilter>,
    transform: ImageTransform,
}

impl<'a> DirectoryWalker<'a> {
    pub fn new(config: &'a Config, storage: Arc<dyn Storage>, codec: Arc<dyn ImageCodec>) -> Self {
        let probe = PathAvailabilityProbe::new(storage.clone(), config.timeout.connection());
        let filter = Arc::new(FileEligibilityFilter::new(&config.compress));
        let transform = ImageTransform::new(
            codec,
            &config.compress.postfix,
            config.compress.quality,
            config.timeout.execution(),
            config.timeout.connection(),
        );

        Self {
            config,
            storage,
            probe,
            filter,
            transform,
        }
    }

    /// Walker over the real filesystem using the `image` crate codec
    pub fn local(config: &'a Config) -> Self {
        Self::new(config, Arc::new(LocalStorage), Arc::new(ImageCrateCodec))
    }

    /// Walk `root` from zero counts.
    pub async fn walk(&self, root: &Path) -> TraversalResult {
        self.walk_dir(root.to_path_buf(), TraversalResult::new()).await
    }

    fn walk_dir(&self, path: PathBuf, acc: TraversalResult) -> BoxFuture<'_, TraversalResult> {
        async move { self.visit(path, acc).await }.boxed()
    }

    async fn visit(&self, path: PathBuf, mut acc: TraversalResult) -> TraversalResult {
        info!("Current directory: {}", path.display());

        if let Err(e) = self.check_available(&path).await {
            return acc.with_error(e);
        }

        let listing = match self.list(&path).await {
            Ok(listing) => listing,
            Err(e) => {
                error!("Error: {}", e);
                return acc.with_error(e);
            }
        };
        self.log_rejected(&path, &listing);

        for candidate in listing.candidates {
            // The mount may vanish halfway through a directory
            if let Err(e) = self.check_available(&path).await {
                return acc.with_error(e);
            }

            let exists = match self.exists(&candidate.full_path).await {
                Ok(exists) => exists,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => return acc.with_error(self.unreachable(&path)),
                Err(e) => {
                    debug!("Cannot check {}: {}", candidate.full_path.display(), e);
                    false
                }
            };
            if !exists {
                warn!("Wrong name or path does not exist: {}", candidate.full_path.display());
                let warnings = acc.add_warning();
                let limit = self.config.compress.max_warnings;
                if limit > 0 && warnings >= limit {
                    error!("Maximum number of warnings reached. Something's wrong. Stopping...");
                    return acc.with_error(WalkError::TooManyWarnings { limit });
                }
                continue;
            }

            if candidate.is_directory {
                if self.is_ignored(&candidate.name) {
                    info!(">>> \"{}\" dir is ignored.", candidate.name);
                    continue;
                }

                info!("Going to {}", candidate.full_path.display());
                acc = self.walk_dir(candidate.full_path, acc).await;
                if acc.is_aborted() {
                    return acc;
                }
                info!("Back to {}", path.display());
                continue;
            }

            acc = self.process_file(&path, candidate, acc).await;
        }

        acc
    }

    /// Probe `path`, turning a timeout into `Unreachable`
    async fn check_available(&self, path: &Path) -> Result<(), WalkError> {
        match self.probe.probe(path).await {
            Ok(Availability::Reachable) => Ok(()),
            Ok(Availability::Unreachable) => Err(self.unreachable(path)),
            Err(e) => {
                error!("Error: {}", e);
                Err(e)
            }
        }
    }

    /// Eligibility listing, bounded by the connection timeout like the probe
    async fn list(&self, path: &Path) -> Result<Listing, WalkError> {
        let storage = self.storage.clone();
        let filter = self.filter.clone();
        let dir = path.to_path_buf();

        match run_detached("listing", self.probe.timeout(), move || filter.filter(storage.as_ref(), &dir)).await {
            Ok(Deadline::Completed(Ok(listing))) => Ok(listing),
            Ok(Deadline::Completed(Err(e))) => Err(WalkError::from_io(path.to_path_buf(), e)),
            Ok(Deadline::TimedOut) => Err(self.unreachable(path)),
            Err(e) => Err(WalkError::Io {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    fn unreachable(&self, path: &Path) -> WalkError {
        error!("Path is unavailable (timeout). Interruption... [{}]", path.display());
        WalkError::Unreachable {
            path: path.to_path_buf(),
            timeout: self.probe.timeout(),
        }
    }

    /// Existence check bounded by the connection timeout
    pub async fn exists(&self, path: &Path) -> io::Result<bool> {
        let path = path.to_path_buf();
        run_blocking_io("exists", self.probe.timeout(), move || path.try_exists()).await
    }

    fn is_ignored(&self, name: &str) -> bool {
        name.starts_with('.') || self.config.compress.ignore_directories.contains(name)
    }

    fn log_rejected(&self, dir: &Path, listing: &Listing) {
        for rejected in &listing.rejected {
            let path = dir.join(&rejected.name);
            match rejected.reason {
                RejectReason::AlreadyProcessed => debug!("Already compressed: {}", path.display()),
                RejectReason::Symlink => debug!("Symbolic link skipped: {}", path.display()),
                RejectReason::NotAnImage => warn!("This is not an image: {}", path.display()),
                RejectReason::TooRecent { age_in_days } => info!(
                    ">>> \"{}\" is too recent ({}/{} days)",
                    rejected.name, age_in_days, self.config.compress.creation_days
                ),
            }
        }
    }

    async fn process_file(&self, dir: &Path, candidate: FileCandidate, mut acc: TraversalResult) -> TraversalResult {
        let extension_index = match candidate.extension_index {
            Some(index) => index,
            None => {
                warn!("This is not an image: {}", candidate.full_path.display());
                return acc;
            }
        };

        let mut filename = candidate.name;
        let mut file_path = candidate.full_path;

        let rename_dir = dir.to_path_buf();
        let rename_from = filename.clone();
        let renamed = run_detached("rename", self.probe.timeout(), move || {
            FilenameNormalizer::normalize(&rename_dir, &rename_from)
        })
        .await;

        match renamed {
            // Spaces become hyphens byte for byte, so the extension index still holds
            Ok(Deadline::Completed(Normalized::RenamedTo(new_filename))) => {
                file_path = dir.join(&new_filename);
                filename = new_filename;
                acc.add_renamed();
            }
            Ok(Deadline::Completed(Normalized::Unchanged)) => {}
            Ok(Deadline::TimedOut) => return acc.with_error(self.unreachable(dir)),
            Err(e) => {
                error!(">>> \"{}\" could not be renamed. Error: {}", file_path.display(), e);
                return acc;
            }
        }

        match self.transform.compress(dir, &file_path, &filename, extension_index).await {
            TransformOutcome::Compressed { saved_mb, .. } => acc.add_compressed(saved_mb),
            TransformOutcome::Failed(e) if e.is_timeout() => {
                debug!("Skipping {} after timeout, nothing credited", file_path.display())
            }
            TransformOutcome::Failed(_) => {}
        }

        acc
    }
}
