//! # Task abstraction.
//!
//! A [`Task`] is one independently-lifecycled unit of work: it owns its domain
//! resource (broker connection, capture device, console input) and a worker
//! running its loop. The capability set is closed: identity, running flag,
//! `start`, `stop`.
//!
//! The common handle type is [`TaskRef`], an `Arc<dyn Task>` shared between
//! the [`Supervisor`](crate::Supervisor) and whoever looks tasks up.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TaskError;
use crate::mailbox::TaskIdentity;

/// # Startable, stoppable unit of work.
///
/// Contract for implementors:
/// - `start()` on a running task is a successful no-op;
/// - `stop()` returns only once the worker has fully exited, and is a no-op when stopped;
/// - the worker must notice a stop request within one poll interval.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use camvisor::{Task, TaskError, TaskIdentity, Worker};
///
/// struct Ticker {
///     identity: TaskIdentity,
///     worker: Worker,
/// }
///
/// #[async_trait]
/// impl Task for Ticker {
///     fn identity(&self) -> &TaskIdentity { &self.identity }
///
///     fn is_running(&self) -> bool { self.worker.is_running() }
///
///     async fn start(&self) -> Result<(), TaskError> {
///         self.worker.spawn(|token| async move { token.cancelled().await });
///         Ok(())
///     }
///
///     async fn stop(&self) -> Result<(), TaskError> {
///         self.worker.shutdown().await
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Identity used for registration and envelope addressing.
    fn identity(&self) -> &TaskIdentity;

    fn name(&self) -> &str {
        self.identity().name()
    }

    fn id(&self) -> u32 {
        self.identity().id()
    }

    /// True from a successful `start()` until the worker exits.
    fn is_running(&self) -> bool;

    /// Acquires the task's resource and spawns its worker.
    async fn start(&self) -> Result<(), TaskError>;

    /// Signals the worker to stop and waits for it to exit.
    async fn stop(&self) -> Result<(), TaskError>;
}

/// Shared handle to a task.
pub type TaskRef = Arc<dyn Task>;
