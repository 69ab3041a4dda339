//! # Deadline Module
//!
//! Attese limitate nel tempo per operazioni che possono bloccarsi a livello di OS
//! (listing su share di rete disconnessi, encode di immagini enormi).
//!
//! ## Responsabilità:
//! - `run_with_deadline`: wrapper generico `Completed(value) | TimedOut`
//! - `run_detached`: esegue una closure bloccante su un thread OS separato
//!   e la abbandona (senza join) allo scadere del timeout
//! - `run_blocking_io`: come `run_detached` per singole chiamate al filesystem,
//!   con il timeout trasformato in `io::ErrorKind::TimedOut`
//!
//! Un thread abbandonato può terminare più tardi: il suo risultato viene scartato
//! perché il receiver non esiste più.

use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::debug;

/// Outcome of a bounded wait
#[derive(Debug, PartialEq, Eq)]
pub enum Deadline<T> {
    Completed(T),
    TimedOut,
}

impl<T> Deadline<T> {
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Deadline::TimedOut)
    }
}

/// Await `future` for at most `limit`.
pub async fn run_with_deadline<F>(limit: Duration, future: F) -> Deadline<F::Output>
where
    F: Future,
{
    match tokio::time::timeout(limit, future).await {
        Ok(value) => Deadline::Completed(value),
        Err(_) => Deadline::TimedOut,
    }
}

/// Run blocking `work` on its own OS thread and wait for it at most `limit`.
///
/// The thread is never joined. If the deadline passes first, the receiving end is
/// dropped and whatever the thread produces later is dropped on that thread.
/// Returns an error if the thread cannot be spawned or dies without a result.
pub async fn run_detached<T, F>(name: &str, limit: Duration, work: F) -> io::Result<Deadline<T>>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (sender, receiver) = oneshot::channel();
    let thread_name = name.to_string();

    std::thread::Builder::new()
        .name(thread_name.clone())
        .spawn(move || {
            let value = work();
            if sender.send(value).is_err() {
                debug!("Discarding late result from abandoned worker '{}'", thread_name);
            }
        })?;

    match run_with_deadline(limit, receiver).await {
        Deadline::Completed(Ok(value)) => Ok(Deadline::Completed(value)),
        Deadline::Completed(Err(_)) => Err(io::Error::new(
            io::ErrorKind::Other,
            format!("worker '{}' exited without a result", name),
        )),
        Deadline::TimedOut => Ok(Deadline::TimedOut),
    }
}

/// Blocking filesystem call bounded by `limit`. A timeout becomes `ErrorKind::TimedOut`.
pub async fn run_blocking_io<T, F>(name: &str, limit: Duration, work: F) -> io::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> io::Result<T> + Send + 'static,
{
    match run_detached(name, limit, work).await? {
        Deadline::Completed(result) => result,
        Deadline::TimedOut => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("{} did not answer within {:?}", name, limit),
        )),
    }
}
