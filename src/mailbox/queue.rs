//! # Mailbox: unbounded FIFO of envelopes shared by all tasks.
//!
//! ```text
//! Producers (many):                     Consumers (many):
//!   ConsoleSender ──┐                    ┌──► ConsoleReceiver.receive().await
//!   Connectivity ───┼──► send() ─► [VecDeque] ─► try_receive()
//!   Capture ────────┘    notify_one()
//! ```
//!
//! ## Rules
//! - **Never blocks on send**: `send()` pushes to the tail under a short lock.
//! - **One wakeup per send**: `send()` wakes at most one suspended receiver.
//! - **Total FIFO**: `receive()` / `try_receive()` pop the head, so envelopes from a
//!   single sender are delivered in send order.
//! - **Unbounded**: there is no backpressure signal.
//! - **No cancellation**: `receive()` has no timeout; a task that must be stoppable
//!   is woken by an explicit shutdown envelope.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::Notify;

use super::message::Envelope;

/// Thread-safe, unbounded envelope queue.
#[derive(Debug, Default)]
pub struct Mailbox {
    queue: Mutex<VecDeque<Envelope>>,
    notify: Notify,
}

impl Mailbox {
    /// Creates an empty mailbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `env` to the tail and wakes one suspended receiver, if any.
    pub fn send(&self, env: Envelope) {
        self.lock().push_back(env);
        self.notify.notify_one();
    }

    /// Suspends the caller until an envelope is available, then pops the head.
    pub async fn receive(&self) -> Envelope {
        loop {
            let notified = self.notify.notified();
            if let Some(env) = self.try_receive() {
                return env;
            }
            notified.await;
        }
    }

    /// Pops the head if present; never suspends.
    pub fn try_receive(&self) -> Option<Envelope> {
        let (env, remaining) = {
            let mut queue = self.lock();
            let env = queue.pop_front();
            (env, queue.len())
        };
        // Wakeups coalesce into a single permit, so hand the baton on while
        // envelopes remain.
        if env.is_some() && remaining > 0 {
            self.notify.notify_one();
        }
        env
    }

    /// Number of queued envelopes.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Envelope>> {
        // Every critical section is a single VecDeque call, so a poisoned lock
        // still guards a consistent queue.
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
