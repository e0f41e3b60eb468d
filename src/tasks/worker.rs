//! # Worker: the running half of a task.
//!
//! Pairs a spawned future with its [`CancellationToken`] and a running flag.
//!
//! ```text
//! spawn(run)  ──► running = true ──► tokio::spawn(run(token))
//!                                           │ (loop polls token)
//! shutdown()  ──► token.cancel() ──► join.await ──► running = false, log elapsed
//! ```
//!
//! ## Rules
//! - The flag is cleared by a guard inside the spawned future, so it also drops
//!   when the loop returns on its own or panics.
//! - `shutdown()` returns only after the future has completed.
//! - Dropping a `Worker` cancels its token; the future is detached, not awaited.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::TaskError;

struct Handle {
    join: JoinHandle<()>,
    cancel: CancellationToken,
    started: Instant,
}

/// Clears the running flag when the worker future ends, however it ends.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Spawned loop plus running flag for one task.
pub struct Worker {
    name: String,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<Handle>>,
}

impl Worker {
    /// `name` labels the worker's log lines.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            running: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Spawns `run` unless the worker is already running.
    ///
    /// Returns `false` (and drops `run`) when it was already running.
    pub fn spawn<F, Fut>(&self, run: F) -> bool
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.lock();
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let cancel = CancellationToken::new();
        let guard = RunningGuard(Arc::clone(&self.running));
        let fut = run(cancel.clone());
        let name = self.name.clone();
        let join = tokio::spawn(async move {
            let _guard = guard;
            debug!(task = %name, "worker running");
            fut.await;
        });

        *slot = Some(Handle {
            join,
            cancel,
            started: Instant::now(),
        });
        true
    }

    /// Cancels the worker and waits for it to exit. No-op when never spawned.
    pub async fn shutdown(&self) -> Result<(), TaskError> {
        let handle = self.lock().take();
        let Some(Handle {
            join,
            cancel,
            started,
        }) = handle
        else {
            return Ok(());
        };

        cancel.cancel();
        let result = join.await;
        let elapsed = started.elapsed();

        match result {
            Ok(()) => {
                info!(task = %self.name, ?elapsed, "worker exited");
                Ok(())
            }
            Err(e) if e.is_panic() => {
                error!(task = %self.name, ?elapsed, "worker panicked");
                Err(TaskError::Panicked {
                    error: e.to_string(),
                })
            }
            Err(e) => {
                info!(task = %self.name, ?elapsed, error = %e, "worker aborted");
                Ok(())
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Handle>> {
        self.handle.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        let slot = self.handle.get_mut().unwrap_or_else(|p| p.into_inner());
        if let Some(handle) = slot.take() {
            handle.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn shutdown_waits_for_exit() {
        let worker = Worker::new("ticker");
        let exited = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&exited);

        assert!(worker.spawn(|token| async move {
            token.cancelled().await;
            tokio::time::sleep(Duration::from_millis(20)).await;
            flag.store(true, Ordering::SeqCst);
        }));
        assert!(worker.is_running());

        worker.shutdown().await.unwrap();
        assert!(exited.load(Ordering::SeqCst));
        assert!(!worker.is_running());
    }

    #[tokio::test]
    async fn second_spawn_is_refused_while_running() {
        let worker = Worker::new("once");
        assert!(worker.spawn(|token| async move { token.cancelled().await }));
        assert!(!worker.spawn(|_| async {}));
        worker.shutdown().await.unwrap();
        assert!(worker.spawn(|_| async {}));
        worker.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn flag_clears_when_loop_returns_on_its_own() {
        let worker = Worker::new("short");
        worker.spawn(|_| async {});
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!worker.is_running());
        worker.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn panic_is_reported_and_clears_flag() {
        let worker = Worker::new("boom");
        worker.spawn(|_| async { panic!("boom") });
        let err = worker.shutdown().await.unwrap_err();
        assert_eq!(err.as_label(), "task_panicked");
        assert!(!worker.is_running());
    }

    #[tokio::test]
    async fn shutdown_without_spawn_is_noop() {
        Worker::new("idle").shutdown().await.unwrap();
    }
}
