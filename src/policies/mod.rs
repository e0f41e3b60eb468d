//! Reconnect pacing for tasks that retry an external resource.
//!
//! ## Contents
//! - [`BackoffPolicy`] how long to wait before connection attempt `n` (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization strategy so a fleet of units does not reconnect in lockstep
//!
//! ## Wiring
//! ```text
//! AgentConfig { reconnect: BackoffPolicy, .. }
//!      └─► tasks::ConnectivityTask run-loop:
//!           - connect() fails  → sleep(reconnect.next(failures)), failures += 1
//!           - connect() succeeds → failures = 0
//! ```

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
