//! # Task identities used to address envelopes.
//!
//! A [`TaskIdentity`] pairs a numeric id with a human-readable name. Both are
//! unique among the tasks registered with a [`Supervisor`](crate::Supervisor)
//! for the lifetime of the process.
//!
//! The device runtime ships a fixed set of well-known identities, exposed as
//! associated constants so envelopes can be addressed without a lookup:
//!
//! ```text
//!  0 Unknown   1 Console   2 Sender   3 Receiver
//!  4 Audio     5 Video     6 Supervisor   7 Mqtt
//! ```

use std::borrow::Cow;
use std::fmt;

/// Identity of a task: `{ id, name }`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TaskIdentity {
    id: u32,
    name: Cow<'static, str>,
}

impl TaskIdentity {
    pub const UNKNOWN: TaskIdentity = TaskIdentity::fixed(0, "Unknown");
    pub const CONSOLE: TaskIdentity = TaskIdentity::fixed(1, "Console");
    pub const SENDER: TaskIdentity = TaskIdentity::fixed(2, "Sender");
    pub const RECEIVER: TaskIdentity = TaskIdentity::fixed(3, "Receiver");
    pub const AUDIO: TaskIdentity = TaskIdentity::fixed(4, "Audio");
    pub const VIDEO: TaskIdentity = TaskIdentity::fixed(5, "Video");
    pub const SUPERVISOR: TaskIdentity = TaskIdentity::fixed(6, "Supervisor");
    pub const MQTT: TaskIdentity = TaskIdentity::fixed(7, "Mqtt");

    /// Creates an identity with the given id and name.
    pub fn new(id: u32, name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    const fn fixed(id: u32, name: &'static str) -> Self {
        Self {
            id,
            name: Cow::Borrowed(name),
        }
    }

    /// Numeric id.
    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Human-readable name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns all well-known identities in id order.
    pub fn well_known() -> [TaskIdentity; 8] {
        [
            Self::UNKNOWN,
            Self::CONSOLE,
            Self::SENDER,
            Self::RECEIVER,
            Self::AUDIO,
            Self::VIDEO,
            Self::SUPERVISOR,
            Self::MQTT,
        ]
    }
}

impl fmt::Display for TaskIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}
