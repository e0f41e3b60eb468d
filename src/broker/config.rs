//! # Broker connection configuration.
//!
//! Persisted as a JSON document with a top-level `"MQTT"` object:
//!
//! ```json
//! {
//!     "MQTT": {
//!         "broker": "broker.hivemq.com",
//!         "port": 1883,
//!         "clientId": "cam-01",
//!         "topic": "devices/cam-01/cmd",
//!         "willTopic": "devices/cam-01/status",
//!         "willMessage": "offline",
//!         "willQos": 1,
//!         "keepAlive": 60,
//!         "ssl": false
//!     }
//! }
//! ```
//!
//! Fields absent from the section take the built-in defaults. A missing file,
//! a missing `"MQTT"` key and malformed JSON are reported as distinct
//! [`ConfigError`]s; the caller decides whether to fall back to
//! [`ConnectionConfig::default`].

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// Top-level key holding the broker settings.
pub const CONFIG_SECTION: &str = "MQTT";

/// Everything needed to open a broker session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionConfig {
    /// Broker host name or address.
    pub broker: String,
    pub port: u16,
    /// MQTT client identifier; when empty a random `camvisor-xxxxxxxx` id is used.
    pub client_id: String,
    pub username: String,
    pub password: String,
    /// PEM trust anchors for the broker certificate.
    pub ca_cert_path: String,
    /// PEM client certificate (mutual TLS, optional).
    pub client_cert_path: String,
    /// PEM client private key (mutual TLS, optional).
    pub client_key_path: String,
    /// Topic subscribed after every successful connect (empty = none).
    pub topic: String,
    pub will_topic: String,
    pub will_message: String,
    /// Keep-alive interval in seconds.
    pub keep_alive: u32,
    /// Last-will QoS, `0..=2`.
    pub will_qos: u8,
    pub will_retained: bool,
    /// Use TLS for the broker connection.
    pub ssl: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            broker: "broker.hivemq.com".to_string(),
            port: 1883,
            client_id: String::new(),
            username: String::new(),
            password: String::new(),
            ca_cert_path: String::new(),
            client_cert_path: String::new(),
            client_key_path: String::new(),
            topic: String::new(),
            will_topic: String::new(),
            will_message: String::new(),
            keep_alive: 60,
            will_qos: 1,
            will_retained: false,
            ssl: false,
        }
    }
}

impl ConnectionConfig {
    /// A last will is registered only when both topic and message are set.
    pub fn has_last_will(&self) -> bool {
        !self.will_topic.is_empty() && !self.will_message.is_empty()
    }

    /// Reads the `"MQTT"` section of the document at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let mut doc: serde_json::Value =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let section = doc
            .get_mut(CONFIG_SECTION)
            .map(serde_json::Value::take)
            .ok_or_else(|| ConfigError::MissingSection {
                path: path.to_path_buf(),
            })?;

        serde_json::from_value(section).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes the full config to `path` as `{ "MQTT": { .. } }`, 4-space indented.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let encode_err = |source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        };
        let mut doc = serde_json::Map::new();
        doc.insert(
            CONFIG_SECTION.to_string(),
            serde_json::to_value(self).map_err(encode_err)?,
        );

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        doc.serialize(&mut ser).map_err(encode_err)?;
        buf.push(b'\n');

        fs::write(path, buf).map_err(write_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_device_profile() {
        let cfg = ConnectionConfig::default();
        assert_eq!(cfg.broker, "broker.hivemq.com");
        assert_eq!(cfg.port, 1883);
        assert_eq!(cfg.keep_alive, 60);
        assert_eq!(cfg.will_qos, 1);
        assert!(!cfg.has_last_will());
    }

    #[test]
    fn save_then_load_preserves_every_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("MQTT.json");

        let cfg = ConnectionConfig {
            broker: "10.0.0.5".into(),
            port: 8883,
            client_id: "cam-01".into(),
            username: "user".into(),
            password: "secret".into(),
            ca_cert_path: "/etc/ca.pem".into(),
            client_cert_path: "/etc/cert.pem".into(),
            client_key_path: "/etc/key.pem".into(),
            topic: "cam/cmd".into(),
            will_topic: "cam/status".into(),
            will_message: "offline".into(),
            keep_alive: 30,
            will_qos: 2,
            will_retained: true,
            ssl: true,
        };
        cfg.save(&path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"clientId\": \"cam-01\""));
        assert!(raw.starts_with("{\n    \"MQTT\""));

        assert_eq!(ConnectionConfig::load(&path).unwrap(), cfg);
    }

    #[test]
    fn partial_section_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("MQTT.json");
        fs::write(&path, r#"{ "MQTT": { "broker": "local", "willRetained": true } }"#).unwrap();

        let cfg = ConnectionConfig::load(&path).unwrap();
        assert_eq!(cfg.broker, "local");
        assert!(cfg.will_retained);
        assert_eq!(cfg.port, 1883);
    }

    #[test]
    fn failures_are_distinguished() {
        let dir = tempfile::tempdir().unwrap();

        let missing = ConnectionConfig::load(dir.path().join("nope.json")).unwrap_err();
        assert_eq!(missing.code(), -1);

        let no_section = dir.path().join("other.json");
        fs::write(&no_section, r#"{ "Video": {} }"#).unwrap();
        assert_eq!(ConnectionConfig::load(&no_section).unwrap_err().code(), -2);

        let garbage = dir.path().join("garbage.json");
        fs::write(&garbage, "{ not json").unwrap();
        assert_eq!(ConnectionConfig::load(&garbage).unwrap_err().code(), -3);

        let wrong_type = dir.path().join("wrong.json");
        fs::write(&wrong_type, r#"{ "MQTT": { "port": "high" } }"#).unwrap();
        assert_eq!(ConnectionConfig::load(&wrong_type).unwrap_err().code(), -3);
    }
}
