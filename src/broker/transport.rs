//! # Broker transport seam.
//!
//! [`ConnectionManager`](super::ConnectionManager) never talks to a network
//! library directly. It asks a [`Connector`] to negotiate a [`Session`], which
//! is split the same way an MQTT client is:
//!
//! ```text
//! Connector::connect(&cfg) ──► Session { client, events }
//!                                 │         │
//!       caller thread ◄───────────┘         └──► network task: events.next().await
//!   publish / subscribe / disconnect              Inbound::Message / PublishAck / ...
//! ```
//!
//! The production implementation is [`MqttConnector`](super::MqttConnector);
//! tests plug in an in-memory connector.

use async_trait::async_trait;

use rumqttc::QoS;

use super::config::ConnectionConfig;
use super::error::ConnectionError;

/// Event surfaced by the network side of a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inbound {
    /// A message arrived on a subscribed topic.
    Message { topic: String, payload: Vec<u8> },
    /// The broker acknowledged one of our publishes.
    PublishAck { packet_id: u16 },
    /// Protocol traffic the manager does not act on (pings, sub-acks, ...).
    Other,
}

/// Request side of a session. Cheap to share with the caller.
#[async_trait]
pub trait BrokerClient: Send + Sync + 'static {
    async fn publish(&self, topic: &str, qos: QoS, retain: bool, payload: Vec<u8>) -> Result<(), String>;

    async fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), String>;

    /// Requests a graceful disconnect. The event side ends afterwards.
    async fn disconnect(&self) -> Result<(), String>;
}

/// Notification side of a session, driven by the manager's network task.
#[async_trait]
pub trait BrokerEvents: Send + 'static {
    /// Waits for the next inbound event.
    ///
    /// `Err(reason)` means the connection is gone.
    async fn next(&mut self) -> Result<Inbound, String>;
}

/// A negotiated broker session.
pub struct Session {
    pub client: Box<dyn BrokerClient>,
    pub events: Box<dyn BrokerEvents>,
}

/// Opens sessions from a [`ConnectionConfig`].
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Creates the client and negotiates the session, including TLS and last will.
    ///
    /// Returns [`ConnectionError::Create`] when the client cannot be built and
    /// [`ConnectionError::Negotiate`] when the broker is unreachable or refuses.
    async fn connect(&self, cfg: &ConnectionConfig) -> Result<Session, ConnectionError>;
}
