//! Runtime core: supervision and process lifecycle.
//!
//! - [`config`]: agent-wide intervals, reconnect policy, broker config path;
//! - [`supervisor`]: registers tasks and starts/stops them as a group;
//! - [`context`]: owns mailbox, supervisor and shutdown flag;
//! - [`shutdown`]: process shutdown flag and OS signal handling.

mod config;
mod context;
mod shutdown;
mod supervisor;

pub use config::AgentConfig;
pub use context::AgentContext;
pub use shutdown::{wait_for_shutdown_signal, ShutdownFlag, ShutdownSignal};
pub use supervisor::Supervisor;
