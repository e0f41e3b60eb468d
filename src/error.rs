//! Error types used by the agent runtime and its tasks.
//!
//! - [`RuntimeError`] - errors raised by the supervisor and the agent context.
//! - [`TaskError`] - errors raised while starting or stopping an individual task.
//!
//! Broker-specific failures live in [`crate::broker`] ([`ConnectionError`](crate::ConnectionError),
//! [`ConfigError`](crate::ConfigError)). None of these are fatal to the process:
//! the supervisor logs them and carries on.

use thiserror::Error;

/// # Errors produced by the runtime itself.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A task with the same id or name is already registered.
    #[error("task {name}#{id} is already registered")]
    TaskAlreadyRegistered {
        /// Id of the rejected task.
        id: u32,
        /// Name of the rejected task.
        name: String,
    },

    /// Installing the OS signal listeners failed.
    #[error("failed to install shutdown signal handlers: {0}")]
    Signal(#[from] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use camvisor::RuntimeError;
    ///
    /// let err = RuntimeError::TaskAlreadyRegistered { id: 3, name: "Receiver".into() };
    /// assert_eq!(err.as_label(), "runtime_task_already_registered");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::TaskAlreadyRegistered { .. } => "runtime_task_already_registered",
            RuntimeError::Signal(_) => "runtime_signal",
        }
    }
}

/// # Errors produced by task lifecycle operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError {
    /// The task could not acquire its resource (device, connection, ...).
    #[error("start failed: {error}")]
    StartFailed {
        /// The underlying error message.
        error: String,
    },

    /// The task's resource reported an error while being released.
    #[error("stop failed: {error}")]
    StopFailed {
        /// The underlying error message.
        error: String,
    },

    /// The worker panicked; it has exited either way.
    #[error("worker panicked: {error}")]
    Panicked {
        /// Panic payload rendered as text.
        error: String,
    },
}

impl TaskError {
    pub fn start(error: impl Into<String>) -> Self {
        TaskError::StartFailed {
            error: error.into(),
        }
    }

    pub fn stop(error: impl Into<String>) -> Self {
        TaskError::StopFailed {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use camvisor::TaskError;
    ///
    /// let err = TaskError::start("no device");
    /// assert_eq!(err.as_label(), "task_start_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::StartFailed { .. } => "task_start_failed",
            TaskError::StopFailed { .. } => "task_stop_failed",
            TaskError::Panicked { .. } => "task_panicked",
        }
    }
}
