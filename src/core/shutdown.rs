//! # Process shutdown.
//!
//! The agent ends when either of these completes; [`AgentContext::run`](crate::AgentContext::run)
//! waits on both:
//! - [`ShutdownFlag::trigger`] from inside the process (the console `quit`, a
//!   `Signal(0)` envelope);
//! - [`wait_for_shutdown_signal`] returning the [`ShutdownSignal`] that arrived.
//!
//! On Unix the agent listens for Ctrl-C (`SIGINT`), `SIGTERM` from the init
//! system and `SIGQUIT`. Elsewhere only Ctrl-C is available.

use std::fmt;

use tokio_util::sync::CancellationToken;

/// Process-wide shutdown flag owned by the agent context.
///
/// Cloning shares the flag. Setting it is idempotent and wakes every waiter.
#[derive(Clone, Debug, Default)]
pub struct ShutdownFlag {
    token: CancellationToken,
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes once the flag is set.
    pub async fn wait(&self) {
        self.token.cancelled().await;
    }
}

/// OS signal that asked the agent to exit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// Ctrl-C / `SIGINT`.
    Interrupt,
    /// `SIGTERM`.
    Terminate,
    /// `SIGQUIT`.
    Quit,
}

impl ShutdownSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShutdownSignal::Interrupt => "SIGINT",
            ShutdownSignal::Terminate => "SIGTERM",
            ShutdownSignal::Quit => "SIGQUIT",
        }
    }
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Completes with the first termination signal delivered to the process.
///
/// Listeners are registered on every call. A registration failure is returned
/// before anything is awaited.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<ShutdownSignal> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;

    let received = tokio::select! {
        _ = interrupt.recv() => ShutdownSignal::Interrupt,
        _ = terminate.recv() => ShutdownSignal::Terminate,
        _ = quit.recv() => ShutdownSignal::Quit,
    };
    Ok(received)
}

/// Completes when Ctrl-C is pressed.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<ShutdownSignal> {
    tokio::signal::ctrl_c().await?;
    Ok(ShutdownSignal::Interrupt)
}
