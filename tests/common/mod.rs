//! Common test utilities for camvisor integration tests
//!
//! [`MockBroker`] implements the broker seam in memory: tests push inbound
//! events or drop the connection, and inspect what the manager published.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use camvisor::broker::{BrokerClient, BrokerEvents, Connector, Inbound, Session};
use camvisor::{ConnectionConfig, ConnectionError};
use rumqttc::QoS;
use tokio::sync::mpsc;

type EventTx = mpsc::UnboundedSender<Result<Inbound, String>>;

#[derive(Default)]
struct State {
    refuse: Option<String>,
    events: Option<EventTx>,
    connects: usize,
    last_config: Option<ConnectionConfig>,
    published: Vec<(String, QoS, bool, Vec<u8>)>,
    subscriptions: Vec<(String, QoS)>,
}

/// In-memory broker; clones share state.
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct MockBroker {
    state: Arc<Mutex<State>>,
}

#[allow(dead_code)]
impl MockBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Makes every following connect fail negotiation with `reason`.
    pub fn refuse(&self, reason: &str) {
        self.state().refuse = Some(reason.to_string());
    }

    pub fn accept(&self) {
        self.state().refuse = None;
    }

    pub fn connects(&self) -> usize {
        self.state().connects
    }

    pub fn last_config(&self) -> Option<ConnectionConfig> {
        self.state().last_config.clone()
    }

    pub fn published(&self) -> Vec<(String, QoS, bool, Vec<u8>)> {
        self.state().published.clone()
    }

    pub fn subscriptions(&self) -> Vec<(String, QoS)> {
        self.state().subscriptions.clone()
    }

    fn push(&self, event: Result<Inbound, String>) {
        if let Some(tx) = self.state().events.as_ref() {
            let _ = tx.send(event);
        }
    }

    /// Delivers an inbound message on the current session.
    pub fn deliver(&self, topic: &str, payload: &[u8]) {
        self.push(Ok(Inbound::Message {
            topic: topic.to_string(),
            payload: payload.to_vec(),
        }));
    }

    pub fn ack(&self, packet_id: u16) {
        self.push(Ok(Inbound::PublishAck { packet_id }));
    }

    /// Simulates the network dropping the current session.
    pub fn drop_connection(&self, reason: &str) {
        self.push(Err(reason.to_string()));
    }
}

#[async_trait]
impl Connector for MockBroker {
    async fn connect(&self, cfg: &ConnectionConfig) -> Result<Session, ConnectionError> {
        let mut state = self.state();
        state.connects += 1;
        state.last_config = Some(cfg.clone());
        if let Some(reason) = state.refuse.clone() {
            return Err(ConnectionError::Negotiate(reason));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        state.events = Some(tx);
        drop(state);

        Ok(Session {
            client: Box::new(MockClient {
                broker: self.clone(),
            }),
            events: Box::new(MockEvents { rx }),
        })
    }
}

struct MockClient {
    broker: MockBroker,
}

#[async_trait]
impl BrokerClient for MockClient {
    async fn publish(&self, topic: &str, qos: QoS, retain: bool, payload: Vec<u8>) -> Result<(), String> {
        self.broker
            .state()
            .published
            .push((topic.to_string(), qos, retain, payload));
        Ok(())
    }

    async fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), String> {
        self.broker
            .state()
            .subscriptions
            .push((topic.to_string(), qos));
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), String> {
        self.broker.push(Err("disconnect requested".into()));
        Ok(())
    }
}

struct MockEvents {
    rx: mpsc::UnboundedReceiver<Result<Inbound, String>>,
}

#[async_trait]
impl BrokerEvents for MockEvents {
    async fn next(&mut self) -> Result<Inbound, String> {
        self.rx
            .recv()
            .await
            .unwrap_or_else(|| Err("session closed".into()))
    }
}

/// Shared, ordered record of callback invocations.
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

#[allow(dead_code)]
impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.entries()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }
}

/// Polls `cond` every few milliseconds until it holds or `timeout` elapses.
#[allow(dead_code)]
pub async fn eventually<F>(timeout: Duration, mut cond: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}

/// Awaits `fut`, failing the test if it takes longer than one second.
#[allow(dead_code)]
pub async fn within<T>(fut: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(1), fut)
        .await
        .expect("operation timed out")
}
