//! Inter-task messaging: identities, messages, envelopes and the shared queue.
//!
//! ## Contents
//! - [`TaskIdentity`] `{ id, name }` address of a task
//! - [`Message`] tagged union carried between tasks
//! - [`Envelope`] `{ sender, receiver, payload }`
//! - [`Mailbox`] unbounded FIFO, the only path between tasks

mod identity;
mod message;
mod queue;

pub use identity::TaskIdentity;
pub use message::{Envelope, Message, SHUTDOWN_SIGNAL};
pub use queue::Mailbox;
