//! # Connection lifecycle state.
//!
//! ```text
//! Disconnected ──connect()──► Connecting ──ConnAck──► Connected
//!      ▲                          │                     │   │
//!      └────────── failure ───────┘                     │   │ connection lost (async)
//!      ▲                                                │   │
//!      └── Disconnecting ◄──────── disconnect() ────────┘   │
//!      └────────────────────────────────────────────────────┘
//! ```
//!
//! The state is a single atomic so readers on any thread see exactly one of the
//! four values. Transitions that race with the network thread use
//! compare-and-swap ([`AtomicState::transition`]) so only one side wins.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of the broker connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    Disconnecting = 3,
}

impl ConnectionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            3 => ConnectionState::Disconnecting,
            _ => ConnectionState::Disconnected,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnecting => "disconnecting",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Atomic holder of a [`ConnectionState`].
#[derive(Debug)]
pub struct AtomicState(AtomicU8);

impl AtomicState {
    pub fn new(state: ConnectionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn load(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, state: ConnectionState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Moves `from → to` only if the current state is `from`.
    ///
    /// Returns `false` (and leaves the state alone) when another transition won.
    pub fn transition(&self, from: ConnectionState, to: ConnectionState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for AtomicState {
    fn default() -> Self {
        Self::new(ConnectionState::Disconnected)
    }
}
