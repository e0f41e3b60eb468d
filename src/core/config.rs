//! # Agent runtime configuration.
//!
//! Provides [`AgentConfig`] centralized settings for the supervisor and the
//! built-in tasks. Broker settings are not here: they live in the persisted
//! [`ConnectionConfig`](crate::ConnectionConfig) found at
//! [`broker_config_path`](AgentConfig::broker_config_path).

use std::path::PathBuf;
use std::time::Duration;

use crate::policies::BackoffPolicy;

/// Runtime settings for one agent process.
///
/// ## Field semantics
/// - `monitor_interval`: supervisor monitor tick
/// - `capture_interval`: poll period of capture tasks
/// - `connectivity_interval`: connectivity loop period while connected
/// - `reconnect`: delay between failed connect attempts
/// - `connect_timeout`: bound on one connect attempt (TCP + TLS + CONNACK)
#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub monitor_interval: Duration,
    pub capture_interval: Duration,
    pub connectivity_interval: Duration,
    /// JSON document holding the `"MQTT"` section; reloaded on every connect.
    pub broker_config_path: PathBuf,
    pub reconnect: BackoffPolicy,
    pub connect_timeout: Duration,
}

impl Default for AgentConfig {
    /// Returns the device defaults:
    /// - `monitor_interval = 100ms`
    /// - `capture_interval = 10ms`
    /// - `connectivity_interval = 1s`
    /// - `broker_config_path = ./config/MQTT.json`
    /// - `reconnect = BackoffPolicy::default()` (1s doubling to 60s, equal jitter)
    /// - `connect_timeout = 10s`
    fn default() -> Self {
        Self {
            monitor_interval: Duration::from_millis(100),
            capture_interval: Duration::from_millis(10),
            connectivity_interval: Duration::from_secs(1),
            broker_config_path: PathBuf::from("./config/MQTT.json"),
            reconnect: BackoffPolicy::default(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}
