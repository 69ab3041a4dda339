//! # Path Availability Probe
//!
//! Controlla in tempo limitato che una directory sia raggiungibile prima di
//! elaborarla. Il listing gira su un thread separato che viene abbandonato
//! se non risponde entro il `connection_timeout`.

use crate::deadline::{run_detached, Deadline};
use crate::error::WalkError;
use crate::storage::Storage;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Result of a successful probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Reachable,
    Unreachable,
}

/// Bounded-time reachability check
#[derive(Clone)]
pub struct PathAvailabilityProbe {
    storage: Arc<dyn Storage>,
    timeout: Duration,
}

impl PathAvailabilityProbe {
    pub fn new(storage: Arc<dyn Storage>, timeout: Duration) -> Self {
        Self { storage, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// List the entry names of `path`, waiting no longer than the timeout.
    ///
    /// A timeout is `Ok(Unreachable)`, a missing path is `NotFound`, any other
    /// OS failure is `Io`.
    pub async fn probe(&self, path: &Path) -> Result<Availability, WalkError> {
        let storage = self.storage.clone();
        let target = path.to_path_buf();

        let outcome = run_detached("probe", self.timeout, move || storage.list_names(&target).map(|_| ()))
            .await
            .map_err(|e| WalkError::Io { path: path.to_path_buf(), source: e })?;

        match outcome {
            Deadline::Completed(Ok(())) => Ok(Availability::Reachable),
            Deadline::Completed(Err(e)) => Err(WalkError::from_io(path.to_path_buf(), e)),
            Deadline::TimedOut => Ok(Availability::Unreachable),
        }
    }
}
