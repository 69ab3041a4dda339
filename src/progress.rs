//! # Traversal Result Module
//!
//! Il totale accumulato del walk: MB risparmiati, file compressi, file
//! rinominati, warning ed eventuale errore allegato.
//!
//! ## Regole:
//! - Il risultato viene passato per valore al frame figlio e restituito indietro
//! - I contatori crescono soltanto
//! - Viene conservato il primo errore registrato, i successivi sono solo loggati
//!   (tranne `TooManyWarnings`, che prende sempre il posto di un errore non fatale)

use crate::error::WalkError;
use crate::file_manager::FileManager;
use std::path::Path;
use tracing::debug;

/// How a finished walk should be reported to the shell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOutcome {
    /// Ran to completion without any attached error
    Clean,
    /// Ran to completion, at least one subtree was unreachable or faulted
    Partial,
    /// Could not start (missing root) or was stopped by the warning limit
    Aborted,
}

impl WalkOutcome {
    pub fn exit_code(self) -> u8 {
        match self {
            WalkOutcome::Clean => 0,
            WalkOutcome::Aborted => 1,
            WalkOutcome::Partial => 2,
        }
    }
}

/// Running totals of a walk
#[derive(Debug, Default)]
pub struct TraversalResult {
    pub bytes_saved: f64,
    pub files_compressed: usize,
    pub files_renamed: usize,
    /// Entries that disappeared between listing and processing
    pub warnings: usize,
    pub error: Option<WalkError>,
}

impl TraversalResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit one compressed file
    pub fn add_compressed(&mut self, saved_mb: f64) {
        self.files_compressed += 1;
        self.bytes_saved += saved_mb;
    }

    pub fn add_renamed(&mut self) {
        self.files_renamed += 1;
    }

    pub fn add_warning(&mut self) -> usize {
        self.warnings += 1;
        self.warnings
    }

    /// Attach `error` unless an earlier one is already attached.
    /// A fatal error always replaces a non-fatal one.
    pub fn record_error(&mut self, error: WalkError) {
        let replace = match &self.error {
            None => true,
            Some(first) => error.is_fatal() && !first.is_fatal(),
        };

        if replace {
            if let Some(previous) = self.error.replace(error) {
                debug!("Superseded error: {}", previous);
            }
        } else {
            debug!("Keeping first error, dropping: {}", error);
        }
    }

    pub fn with_error(mut self, error: WalkError) -> Self {
        self.record_error(error);
        self
    }

    /// The walk was stopped and no frame should keep going
    pub fn is_aborted(&self) -> bool {
        self.error.as_ref().map(WalkError::is_fatal).unwrap_or(false)
    }

    pub fn is_clean(&self) -> bool {
        self.error.is_none()
    }

    /// Classify the walk that started at `root`
    pub fn outcome(&self, root: &Path) -> WalkOutcome {
        match &self.error {
            None => WalkOutcome::Clean,
            Some(e) if e.is_fatal() => WalkOutcome::Aborted,
            Some(WalkError::NotFound(path)) if path == root => WalkOutcome::Aborted,
            Some(_) => WalkOutcome::Partial,
        }
    }

    /// Total saved, rounded for display
    pub fn saved_mb(&self) -> f64 {
        FileManager::round2(self.bytes_saved)
    }

    pub fn format_summary(&self, elapsed_secs: f64) -> String {
        format!(
            "Script finished. Compressed files: {}. Saved: {} MB | Time: {:.2} seconds.",
            self.files_compressed,
            self.saved_mb(),
            elapsed_secs
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_accumulation() {
        let mut result = TraversalResult::new();
        result.add_compressed(1.25);
        result.add_compressed(-0.05);
        result.add_renamed();

        assert_eq!(result.files_compressed, 2);
        assert_eq!(result.files_renamed, 1);
        assert_eq!(result.saved_mb(), 1.2);
        assert!(result.is_clean());
        assert_eq!(
            result.format_summary(3.456),
            "Script finished. Compressed files: 2. Saved: 1.2 MB | Time: 3.46 seconds."
        );
    }

    #[test]
    fn test_first_error_wins() {
        let result = TraversalResult::new()
            .with_error(WalkError::Unreachable {
                path: PathBuf::from("/mnt/net_share"),
                timeout: Duration::from_secs(5),
            })
            .with_error(WalkError::NotFound(PathBuf::from("/mnt/other")));

        assert!(matches!(result.error, Some(WalkError::Unreachable { .. })));
        assert!(!result.is_clean());
        assert!(!result.is_aborted());
    }

    #[test]
    fn test_outcome_classification() {
        let root = Path::new("/photos");
        assert_eq!(TraversalResult::new().outcome(root), WalkOutcome::Clean);

        let missing_root = TraversalResult::new().with_error(WalkError::NotFound(root.to_path_buf()));
        assert_eq!(missing_root.outcome(root), WalkOutcome::Aborted);

        let missing_child = TraversalResult::new().with_error(WalkError::NotFound(root.join("2023")));
        assert_eq!(missing_child.outcome(root), WalkOutcome::Partial);

        let limit = TraversalResult::new().with_error(WalkError::TooManyWarnings { limit: 5 });
        assert_eq!(limit.outcome(root), WalkOutcome::Aborted);

        assert_eq!(WalkOutcome::Clean.exit_code(), 0);
        assert_eq!(WalkOutcome::Aborted.exit_code(), 1);
        assert_eq!(WalkOutcome::Partial.exit_code(), 2);
    }

    #[test]
    fn test_warning_limit_aborts() {
        let mut result = TraversalResult::new().with_error(WalkError::NotFound(PathBuf::from("/gone")));
        assert_eq!(result.add_warning(), 1);
        result.record_error(WalkError::TooManyWarnings { limit: 1 });
        assert!(result.is_aborted());
        assert!(matches!(result.error, Some(WalkError::TooManyWarnings { limit: 1 })));
    }
}
