//! Broker-side error taxonomy.
//!
//! Every variant maps to a stable negative [`code`](ConnectionError::code) so
//! callers that only forward an integer (for example into an `Error` mailbox
//! message) can still tell failures apart.

use std::path::PathBuf;

use thiserror::Error;

/// Failure loading or saving a [`ConnectionConfig`](super::ConnectionConfig).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be opened or read.
    #[error("failed to open config file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document has no top-level `"MQTT"` object.
    #[error("missing 'MQTT' section in {}", path.display())]
    MissingSection { path: PathBuf },

    /// The document is not valid JSON or the section has the wrong shape.
    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Writing the document failed.
    #[error("failed to write config file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Negative error code: `-1` open, `-2` missing section, `-3` parse, `-4` write.
    pub fn code(&self) -> i32 {
        match self {
            ConfigError::Open { .. } => -1,
            ConfigError::MissingSection { .. } => -2,
            ConfigError::Parse { .. } => -3,
            ConfigError::Write { .. } => -4,
        }
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::Open { .. } => "config_open",
            ConfigError::MissingSection { .. } => "config_missing_section",
            ConfigError::Parse { .. } => "config_parse",
            ConfigError::Write { .. } => "config_write",
        }
    }
}

/// Failure of a [`ConnectionManager`](super::ConnectionManager) operation.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// `connect()` while already connected.
    #[error("already connected")]
    AlreadyConnected,

    /// Publish/subscribe attempted outside `Connected`.
    #[error("not connected")]
    NotConnected,

    /// The client session could not be created (bad options, unreadable TLS material).
    #[error("failed to create client: {0}")]
    Create(String),

    /// Network, TLS or MQTT negotiation failed.
    #[error("connection failed: {0}")]
    Negotiate(String),

    /// The session rejected the publish.
    #[error("publish failed: {0}")]
    Publish(String),

    /// The session rejected the subscribe.
    #[error("subscribe failed: {0}")]
    Subscribe(String),

    /// The payload could not be encoded as JSON.
    #[error("payload encoding failed: {0}")]
    Encode(String),
}

impl ConnectionError {
    /// Stable negative code for this failure.
    pub fn code(&self) -> i32 {
        match self {
            ConnectionError::AlreadyConnected => -1,
            ConnectionError::NotConnected => -2,
            ConnectionError::Create(_) => -3,
            ConnectionError::Negotiate(_) => -4,
            ConnectionError::Publish(_) => -5,
            ConnectionError::Subscribe(_) => -6,
            ConnectionError::Encode(_) => -7,
        }
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            ConnectionError::AlreadyConnected => "connection_already_connected",
            ConnectionError::NotConnected => "connection_not_connected",
            ConnectionError::Create(_) => "connection_create",
            ConnectionError::Negotiate(_) => "connection_negotiate",
            ConnectionError::Publish(_) => "connection_publish",
            ConnectionError::Subscribe(_) => "connection_subscribe",
            ConnectionError::Encode(_) => "connection_encode",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_codes_are_distinct() {
        let all = [
            ConnectionError::AlreadyConnected,
            ConnectionError::NotConnected,
            ConnectionError::Create(String::new()),
            ConnectionError::Negotiate(String::new()),
            ConnectionError::Publish(String::new()),
            ConnectionError::Subscribe(String::new()),
            ConnectionError::Encode(String::new()),
        ];
        let mut codes: Vec<i32> = all.iter().map(ConnectionError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
        assert!(codes.iter().all(|c| *c < 0));
    }

    #[test]
    fn missing_section_code() {
        let err = ConfigError::MissingSection {
            path: PathBuf::from("x.json"),
        };
        assert_eq!(err.code(), -2);
        assert_eq!(err.to_string(), "missing 'MQTT' section in x.json");
    }
}
