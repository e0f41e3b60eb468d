//! # Messages and envelopes exchanged between tasks.
//!
//! [`Message`] is a closed tagged union; exactly one variant is active per
//! instance. [`Envelope`] addresses a message from one task to another and is
//! immutable once constructed: it is moved into the [`Mailbox`](super::Mailbox)
//! on send and moved out again on receive.
//!
//! `Signal { code: 0 }` is reserved as the shutdown sentinel.

use std::fmt;

use super::identity::TaskIdentity;

/// Signal code reserved for "shut down".
pub const SHUTDOWN_SIGNAL: i32 = 0;

/// Payload carried by an [`Envelope`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    /// Numeric signal. `0` requests shutdown.
    Signal { code: i32 },
    /// Error report with a code and a reason.
    Error { code: i32, message: String },
    /// Named event with a free-form payload.
    Custom { name: String, payload: String },
    /// Plain text.
    Text(String),
    /// Plain integer.
    Int(i64),
}

impl Message {
    /// The shutdown sentinel `Signal { code: 0 }`.
    pub const fn shutdown() -> Self {
        Message::Signal {
            code: SHUTDOWN_SIGNAL,
        }
    }

    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Message::Error {
            code,
            message: message.into(),
        }
    }

    pub fn custom(name: impl Into<String>, payload: impl Into<String>) -> Self {
        Message::Custom {
            name: name.into(),
            payload: payload.into(),
        }
    }

    /// Returns `true` for `Signal { code: 0 }`.
    #[inline]
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Message::Signal { code } if *code == SHUTDOWN_SIGNAL)
    }

    /// Short stable label for the active variant.
    pub fn as_label(&self) -> &'static str {
        match self {
            Message::Signal { .. } => "signal",
            Message::Error { .. } => "error",
            Message::Custom { .. } => "custom",
            Message::Text(_) => "text",
            Message::Int(_) => "int",
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Signal { code } => write!(f, "Signal({code})"),
            Message::Error { code, message } => write!(f, "Error({code}): {message}"),
            Message::Custom { name, payload } => write!(f, "Custom({name}): {payload}"),
            Message::Text(text) => write!(f, "Text: {text}"),
            Message::Int(value) => write!(f, "Int: {value}"),
        }
    }
}

impl From<String> for Message {
    fn from(value: String) -> Self {
        Message::Text(value)
    }
}

impl From<&str> for Message {
    fn from(value: &str) -> Self {
        Message::Text(value.to_owned())
    }
}

impl From<i64> for Message {
    fn from(value: i64) -> Self {
        Message::Int(value)
    }
}

/// An addressed message: `{ sender, receiver, payload }`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    sender: TaskIdentity,
    receiver: TaskIdentity,
    payload: Message,
}

impl Envelope {
    pub fn new(sender: TaskIdentity, receiver: TaskIdentity, payload: impl Into<Message>) -> Self {
        Self {
            sender,
            receiver,
            payload: payload.into(),
        }
    }

    #[inline]
    pub fn sender(&self) -> &TaskIdentity {
        &self.sender
    }

    #[inline]
    pub fn receiver(&self) -> &TaskIdentity {
        &self.receiver
    }

    #[inline]
    pub fn payload(&self) -> &Message {
        &self.payload
    }

    /// Consumes the envelope and returns its payload.
    pub fn into_payload(self) -> Message {
        self.payload
    }
}
