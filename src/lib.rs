//! # camvisor
//!
//! **camvisor** is the per-device agent runtime of an embedded camera unit.
//!
//! It supervises a fixed set of independently-running tasks (broker
//! connectivity, capture pipelines, an interactive console) and gives them a
//! single internal channel, the [`Mailbox`], through which they exchange
//! typed [`Envelope`]s.
//!
//! ## Architecture
//! ```text
//!                     ┌───────────────────────────────────────────┐
//!                     │ AgentContext                              │
//!                     │  - Mailbox (shared FIFO)                  │
//!                     │  - Supervisor (task list + monitor)       │
//!                     │  - ShutdownFlag                           │
//!                     └──────┬──────────────┬──────────────┬──────┘
//!                            ▼              ▼              ▼
//!                 ┌────────────────┐ ┌──────────────┐ ┌──────────────┐
//!                 │ConnectivityTask│ │ CaptureTask  │ │ConsoleSender │
//!                 │ ConnectionMgr  │ │ CaptureDevice│ │ stdin lines  │
//!                 └───────┬────────┘ └──────────────┘ └──────┬───────┘
//!       broker callbacks  │                                  │ Command::parse
//!                         ▼                                  ▼
//!                 ┌──────────────────────────────────────────────────┐
//!                 │                  Mailbox                         │
//!                 └────────────────────────┬─────────────────────────┘
//!                                          ▼
//!                                 ┌─────────────────┐
//!                                 │ ConsoleReceiver │ ── Signal(0) ─► ShutdownFlag
//!                                 └─────────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! AgentContext::run()
//!   ├─► Supervisor::start()   every task in registration order, then the monitor
//!   ├─► wait: SIGINT/SIGTERM/SIGQUIT | ShutdownFlag
//!   └─► Supervisor::stop()    every task (joined), then the monitor
//! ```
//!
//! ## Features
//! | Area           | Description                                               | Key types                                   |
//! |----------------|-----------------------------------------------------------|---------------------------------------------|
//! | **Messaging**  | Addressed, typed messages over one unbounded FIFO         | [`Mailbox`], [`Envelope`], [`Message`]      |
//! | **Tasks**      | Closed capability set: start / stop / running / identity  | [`Task`], [`TaskRef`], [`Worker`]           |
//! | **Supervision**| Group start/stop, lookup, monitoring                      | [`Supervisor`], [`AgentContext`]            |
//! | **Broker**     | 4-state connection lifecycle with callbacks               | [`ConnectionManager`], [`ConnectionConfig`] |
//! | **Policies**   | Reconnect pacing                                          | [`BackoffPolicy`], [`JitterPolicy`]         |
//! | **Errors**     | Typed errors with stable labels and codes                 | [`TaskError`], [`RuntimeError`], [`ConnectionError`], [`ConfigError`] |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use camvisor::{AgentConfig, AgentContext, ConsoleReceiver, Envelope, Message, TaskIdentity};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ctx = AgentContext::new(AgentConfig::default());
//!     let receiver = ConsoleReceiver::new(Arc::clone(ctx.mailbox()), ctx.shutdown_flag().clone());
//!     ctx.supervisor().add_task(Arc::new(receiver))?;
//!
//!     ctx.mailbox().send(Envelope::new(
//!         TaskIdentity::CONSOLE,
//!         TaskIdentity::RECEIVER,
//!         Message::shutdown(),
//!     ));
//!     ctx.run_until(std::future::pending()).await;
//!     assert!(ctx.shutdown_flag().is_set());
//!     Ok(())
//! }
//! ```

pub mod broker;
mod core;
mod error;
pub mod logging;
pub mod mailbox;
mod policies;
pub mod tasks;

// ---- Public re-exports ----

pub use broker::{
    ConfigError, ConnectionConfig, ConnectionError, ConnectionManager, ConnectionState,
    MqttConnector,
};
pub use self::core::{
    wait_for_shutdown_signal, AgentConfig, AgentContext, ShutdownFlag, ShutdownSignal, Supervisor,
};
pub use error::{RuntimeError, TaskError};
pub use mailbox::{Envelope, Mailbox, Message, TaskIdentity, SHUTDOWN_SIGNAL};
pub use policies::{BackoffPolicy, JitterPolicy};
pub use tasks::{
    CaptureDevice, CaptureTask, Command, ConnectivityTask, ConsoleReceiver, ConsoleSender,
    SimulatedDevice, Task, TaskRef, Worker,
};
