//! # rumqttc-backed [`Connector`].
//!
//! Builds [`MqttOptions`] from a [`ConnectionConfig`] (credentials, keep-alive,
//! TLS material, last will), then polls the fresh [`EventLoop`] until the
//! broker answers `CONNACK`. The event loop is handed back as the session's
//! [`BrokerEvents`] so the manager's network task keeps driving it.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, LastWill, MqttOptions, Packet, QoS,
    TlsConfiguration, Transport,
};
use tracing::debug;

use super::config::ConnectionConfig;
use super::error::ConnectionError;
use super::transport::{BrokerClient, BrokerEvents, Connector, Inbound, Session};

/// Outstanding requests buffered between the client handle and the event loop.
const REQUEST_CAPACITY: usize = 64;

/// Smallest keep-alive accepted by the client library.
const MIN_KEEP_ALIVE: Duration = Duration::from_secs(5);

/// Opens MQTT 3.1.1 sessions with rumqttc.
#[derive(Clone, Debug)]
pub struct MqttConnector {
    connect_timeout: Duration,
}

impl MqttConnector {
    /// `connect_timeout` bounds the whole TCP + TLS + CONNECT/CONNACK exchange.
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    async fn options(cfg: &ConnectionConfig) -> Result<MqttOptions, ConnectionError> {
        if cfg.broker.is_empty() {
            return Err(ConnectionError::Create("broker address is empty".into()));
        }
        let client_id = if cfg.client_id.is_empty() {
            format!("camvisor-{:08x}", rand::rng().random::<u32>())
        } else if cfg.client_id.starts_with(' ') {
            return Err(ConnectionError::Create(format!(
                "invalid client id {:?}",
                cfg.client_id
            )));
        } else {
            cfg.client_id.clone()
        };

        let mut opts = MqttOptions::new(client_id, cfg.broker.clone(), cfg.port);
        opts.set_keep_alive(Duration::from_secs(u64::from(cfg.keep_alive)).max(MIN_KEEP_ALIVE));
        opts.set_clean_session(true);

        if !cfg.username.is_empty() {
            opts.set_credentials(cfg.username.clone(), cfg.password.clone());
        }

        if cfg.has_last_will() {
            opts.set_last_will(LastWill::new(
                cfg.will_topic.clone(),
                cfg.will_message.as_bytes().to_vec(),
                qos_from_level(cfg.will_qos)?,
                cfg.will_retained,
            ));
        }

        if cfg.ssl {
            opts.set_transport(Transport::tls_with_config(tls_config(cfg).await?));
        }
        Ok(opts)
    }
}

#[async_trait]
impl Connector for MqttConnector {
    async fn connect(&self, cfg: &ConnectionConfig) -> Result<Session, ConnectionError> {
        let opts = Self::options(cfg).await?;
        let (client, mut eventloop) = AsyncClient::new(opts, REQUEST_CAPACITY);

        let negotiation = async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        return match ack.code {
                            ConnectReturnCode::Success => Ok(()),
                            code => Err(format!("broker refused connection: {code:?}")),
                        };
                    }
                    Ok(event) => debug!(?event, "mqtt negotiation traffic"),
                    Err(e) => return Err(e.to_string()),
                }
            }
        };

        match tokio::time::timeout(self.connect_timeout, negotiation).await {
            Ok(Ok(())) => Ok(Session {
                client: Box::new(MqttClient(client)),
                events: Box::new(MqttEvents(eventloop)),
            }),
            Ok(Err(reason)) => Err(ConnectionError::Negotiate(reason)),
            Err(_) => Err(ConnectionError::Negotiate(format!(
                "no CONNACK within {:?}",
                self.connect_timeout
            ))),
        }
    }
}

struct MqttClient(AsyncClient);

#[async_trait]
impl BrokerClient for MqttClient {
    async fn publish(&self, topic: &str, qos: QoS, retain: bool, payload: Vec<u8>) -> Result<(), String> {
        self.0
            .publish(topic, qos, retain, payload)
            .await
            .map_err(|e| e.to_string())
    }

    async fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), String> {
        self.0.subscribe(topic, qos).await.map_err(|e| e.to_string())
    }

    async fn disconnect(&self) -> Result<(), String> {
        self.0.disconnect().await.map_err(|e| e.to_string())
    }
}

struct MqttEvents(EventLoop);

#[async_trait]
impl BrokerEvents for MqttEvents {
    async fn next(&mut self) -> Result<Inbound, String> {
        match self.0.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => Ok(Inbound::Message {
                topic: publish.topic,
                payload: publish.payload.to_vec(),
            }),
            Ok(Event::Incoming(Packet::PubAck(ack))) => Ok(Inbound::PublishAck {
                packet_id: ack.pkid,
            }),
            Ok(Event::Incoming(Packet::Disconnect)) => Err("broker closed the session".into()),
            Ok(_) => Ok(Inbound::Other),
            Err(e) => Err(e.to_string()),
        }
    }
}

/// Maps a numeric QoS level (`0..=2`) onto [`QoS`].
pub fn qos_from_level(level: u8) -> Result<QoS, ConnectionError> {
    match level {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => Err(ConnectionError::Create(format!("invalid QoS level {other}"))),
    }
}

async fn tls_config(cfg: &ConnectionConfig) -> Result<TlsConfiguration, ConnectionError> {
    if cfg.ca_cert_path.is_empty() {
        return Err(ConnectionError::Create(
            "ssl is enabled but caCertPath is empty".into(),
        ));
    }
    let ca = read_pem("caCertPath", &cfg.ca_cert_path).await?;

    let client_auth = match (cfg.client_cert_path.is_empty(), cfg.client_key_path.is_empty()) {
        (true, true) => None,
        (false, false) => Some((
            read_pem("clientCertPath", &cfg.client_cert_path).await?,
            read_pem("clientKeyPath", &cfg.client_key_path).await?,
        )),
        _ => {
            return Err(ConnectionError::Create(
                "clientCertPath and clientKeyPath must be set together".into(),
            ))
        }
    };

    Ok(TlsConfiguration::Simple {
        ca,
        alpn: None,
        client_auth,
    })
}

async fn read_pem(field: &str, path: &str) -> Result<Vec<u8>, ConnectionError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| ConnectionError::Create(format!("cannot read {field} {path}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qos_levels_map_and_reject_out_of_range() {
        assert_eq!(qos_from_level(0).unwrap(), QoS::AtMostOnce);
        assert_eq!(qos_from_level(2).unwrap(), QoS::ExactlyOnce);
        assert_eq!(qos_from_level(3).unwrap_err().code(), -3);
    }

    #[tokio::test]
    async fn empty_client_id_gets_a_generated_one() {
        let opts = MqttConnector::options(&ConnectionConfig::default()).await.unwrap();
        let id = opts.client_id();
        assert!(id.starts_with("camvisor-"), "{id}");
        assert_eq!(id.len(), "camvisor-".len() + 8);

        let named = ConnectionConfig {
            client_id: "cam-07".into(),
            ..ConnectionConfig::default()
        };
        assert_eq!(MqttConnector::options(&named).await.unwrap().client_id(), "cam-07");
    }

    #[tokio::test]
    async fn ssl_without_trust_store_is_a_create_error() {
        let cfg = ConnectionConfig {
            ssl: true,
            ..ConnectionConfig::default()
        };
        let err = MqttConnector::options(&cfg)
            .await
            .err()
            .expect("ssl without caCertPath should fail");
        assert!(matches!(err, ConnectionError::Create(_)), "{err:?}");
    }

    #[tokio::test]
    async fn half_configured_client_auth_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let ca = dir.path().join("ca.pem");
        std::fs::write(&ca, b"-----BEGIN CERTIFICATE-----\n").unwrap();
        let cfg = ConnectionConfig {
            ssl: true,
            ca_cert_path: ca.display().to_string(),
            client_cert_path: "/tmp/only-cert.pem".into(),
            ..ConnectionConfig::default()
        };
        let err = tls_config(&cfg).await.err().expect("half client auth should fail");
        assert!(err.to_string().contains("must be set together"));
    }

    #[tokio::test]
    async fn unreachable_broker_fails_negotiation() {
        let cfg = ConnectionConfig {
            broker: "127.0.0.1".into(),
            port: 1,
            client_id: "cam-loopback".into(),
            ..ConnectionConfig::default()
        };
        let err = MqttConnector::new(Duration::from_secs(2))
            .connect(&cfg)
            .await
            .err()
            .expect("port 1 should refuse");
        assert!(matches!(err, ConnectionError::Negotiate(_)), "{err:?}");
    }
}
