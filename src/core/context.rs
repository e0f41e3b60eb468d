//! # AgentContext: one explicit owner for the process-wide pieces.
//!
//! Holds the shared [`Mailbox`], the [`Supervisor`] and the [`ShutdownFlag`].
//! Built once at process start; tasks get their handles from it.
//!
//! ```text
//! run():
//!   supervisor.start()
//!   wait for: OS signal | shutdown flag
//!   shutdown.trigger()
//!   supervisor.stop()        (exactly once)
//! ```

use std::future::Future;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::RuntimeError;
use crate::mailbox::Mailbox;

use super::config::AgentConfig;
use super::shutdown::{wait_for_shutdown_signal, ShutdownFlag};
use super::supervisor::Supervisor;

/// Owner of the mailbox, supervisor and shutdown flag.
pub struct AgentContext {
    config: AgentConfig,
    mailbox: Arc<Mailbox>,
    supervisor: Supervisor,
    shutdown: ShutdownFlag,
}

impl AgentContext {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            mailbox: Arc::new(Mailbox::new()),
            supervisor: Supervisor::new(config.monitor_interval),
            shutdown: ShutdownFlag::new(),
            config,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn mailbox(&self) -> &Arc<Mailbox> {
        &self.mailbox
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    pub fn shutdown_flag(&self) -> &ShutdownFlag {
        &self.shutdown
    }

    /// Runs until an OS termination signal arrives or the shutdown flag is set.
    ///
    /// If the signal handlers cannot be installed only the flag can stop the
    /// agent; the registration error is returned after it has stopped.
    pub async fn run(&self) -> Result<(), RuntimeError> {
        let mut signal_error = None;
        self.run_until(async {
            match wait_for_shutdown_signal().await {
                Ok(signal) => info!(%signal, "termination signal received"),
                Err(e) => {
                    warn!(error = %e, "signal handlers unavailable, waiting for shutdown flag");
                    signal_error = Some(e);
                    std::future::pending::<()>().await;
                }
            }
        })
        .await;
        signal_error.map_or(Ok(()), |e| Err(RuntimeError::Signal(e)))
    }

    /// Starts the supervisor, waits for `stop` or the shutdown flag, then
    /// stops the supervisor.
    pub async fn run_until<F>(&self, stop: F)
    where
        F: Future<Output = ()>,
    {
        self.supervisor.start().await;

        tokio::select! {
            _ = stop => {}
            _ = self.shutdown.wait() => info!("shutdown requested"),
        }
        self.shutdown.trigger();
        self.supervisor.stop().await;
    }
}

impl Default for AgentContext {
    fn default() -> Self {
        Self::new(AgentConfig::default())
    }
}
