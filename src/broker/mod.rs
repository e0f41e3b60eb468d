//! # Broker connectivity.
//!
//! - [`ConnectionConfig`] persisted settings (`"MQTT"` JSON section).
//! - [`ConnectionManager`] one logical connection: state machine, callbacks, requests.
//! - [`Connector`] / [`BrokerClient`] / [`BrokerEvents`] the seam the manager drives.
//! - [`MqttConnector`] the rumqttc implementation of that seam.

mod config;
mod error;
mod manager;
mod mqtt;
mod state;
mod transport;

pub use config::{ConnectionConfig, CONFIG_SECTION};
pub use error::{ConfigError, ConnectionError};
pub use manager::{decode_payload, ConnectionManager};
pub use mqtt::{qos_from_level, MqttConnector};
pub use state::ConnectionState;
pub use transport::{BrokerClient, BrokerEvents, Connector, Inbound, Session};
