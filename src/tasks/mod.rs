//! # Tasks.
//!
//! - [`Task`] - the capability set every task implements
//! - [`TaskRef`] - shared handle (`Arc<dyn Task>`)
//! - [`Worker`] - spawned loop + running flag, used by every concrete task
//! - [`ConnectivityTask`] - owns the broker connection
//! - [`ConsoleSender`] / [`ConsoleReceiver`] - interactive producer / mailbox consumer
//! - [`CaptureTask`] - polls a [`CaptureDevice`]

mod capture;
mod connectivity;
mod console;
mod task;
mod worker;

pub use capture::{CaptureDevice, CaptureTask, SimulatedDevice};
pub use connectivity::{ConnectivityTask, BROKER_ERROR, CONNECTED_EVENT, DISCONNECTED_EVENT};
pub use console::{Command, ConsoleReceiver, ConsoleSender, COMMAND_ERROR};
pub use task::{Task, TaskRef};
pub use worker::Worker;
