//! # ConnectionManager: one logical broker connection.
//!
//! Owns the [`ConnectionState`] machine, the active [`ConnectionConfig`] and
//! the user callbacks. Requests (`connect`, `disconnect`, `publish`,
//! `subscribe`) run on the caller's task; broker notifications arrive on a
//! network task spawned per session.
//!
//! ## Architecture
//! ```text
//! caller ── connect() ──► [session lock] ─► Connector::connect(cfg)
//!                                             │ Ok(Session{client, events})
//!                                             ├─► state = Connected, on_connect()
//!                                             └─► spawn network_loop(events)
//!
//! network_loop:
//!   events.next() ─┬─ Message{topic, payload} ─► decode JSON ─┬─ ok  ─► on_message(topic, text)
//!                  │                                          └─ err ─► on_error("Message parsing error: ..")
//!                  ├─ PublishAck{packet_id} ──────────────────────────► on_publish_ack(id)
//!                  └─ Err(reason) ─► CAS Connected→Disconnected ─► on_error("Connection lost: .."), on_disconnect()
//! ```
//!
//! ## Rules
//! - Transitions are serialized by the session lock; the state itself is one atomic,
//!   so `state()` / `is_connected()` never block and never see a fifth value.
//! - `publish` / `subscribe` outside `Connected` fail with [`ConnectionError::NotConnected`]
//!   and touch nothing.
//! - `on_disconnect` fires exactly once per connected session, whichever side ends it,
//!   and always before the next session's `on_connect`.
//! - Dropping a pending `connect()` future resets `Connecting` back to `Disconnected`.
//! - Callbacks run on the network task: they must only enqueue work (e.g. `Mailbox::send`).
//! - No automatic reconnect; retry pacing belongs to the owning task.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use rumqttc::QoS;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::config::ConnectionConfig;
use super::error::{ConfigError, ConnectionError};
use super::mqtt::MqttConnector;
use super::state::{AtomicState, ConnectionState};
use super::transport::{BrokerClient, BrokerEvents, Connector, Inbound, Session};

/// How long a graceful disconnect may take to flush before the session is dropped.
const DISCONNECT_GRACE: Duration = Duration::from_millis(1000);

type ConnectCallback = Arc<dyn Fn() + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(&str) + Send + Sync>;
type MessageCallback = Arc<dyn Fn(&str, &str) + Send + Sync>;
type AckCallback = Arc<dyn Fn(u16) + Send + Sync>;

#[derive(Default)]
struct Callbacks {
    connect: Option<ConnectCallback>,
    disconnect: Option<ConnectCallback>,
    error: Option<ErrorCallback>,
    message: Option<MessageCallback>,
    publish_ack: Option<AckCallback>,
}

/// State shared with the network task.
struct Shared {
    state: AtomicState,
    callbacks: RwLock<Callbacks>,
}

impl Shared {
    fn callbacks(&self) -> RwLockReadGuard<'_, Callbacks> {
        self.callbacks.read().unwrap_or_else(|p| p.into_inner())
    }

    fn callbacks_mut(&self) -> RwLockWriteGuard<'_, Callbacks> {
        self.callbacks.write().unwrap_or_else(|p| p.into_inner())
    }

    // Each fire_* clones the callback out so user code never runs under the lock.

    fn fire_connect(&self) {
        let cb = self.callbacks().connect.clone();
        if let Some(cb) = cb {
            cb();
        }
    }

    fn fire_disconnect(&self) {
        let cb = self.callbacks().disconnect.clone();
        if let Some(cb) = cb {
            cb();
        }
    }

    fn fire_error(&self, reason: &str) {
        let cb = self.callbacks().error.clone();
        if let Some(cb) = cb {
            cb(reason);
        }
    }

    fn fire_message(&self, topic: &str, payload: &str) {
        let cb = self.callbacks().message.clone();
        if let Some(cb) = cb {
            cb(topic, payload);
        }
    }

    fn fire_publish_ack(&self, packet_id: u16) {
        let cb = self.callbacks().publish_ack.clone();
        if let Some(cb) = cb {
            cb(packet_id);
        }
    }
}

/// The live half of a session kept by the manager.
struct Active {
    client: Arc<dyn BrokerClient>,
    network: JoinHandle<()>,
}

/// Waits for a network task to finish its callbacks, aborting it after the grace period.
async fn join_network(mut network: JoinHandle<()>) {
    if tokio::time::timeout(DISCONNECT_GRACE, &mut network).await.is_err() {
        warn!("network task did not finish in time, aborting");
        network.abort();
    }
}

/// Puts `Connecting` back to `Disconnected` if a connect attempt is abandoned.
struct ConnectAttempt<'a>(&'a AtomicState);

impl Drop for ConnectAttempt<'_> {
    fn drop(&mut self) {
        if self
            .0
            .transition(ConnectionState::Connecting, ConnectionState::Disconnected)
        {
            debug!("connect attempt abandoned");
        }
    }
}

/// Maintains exactly one logical connection to a message broker.
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    shared: Arc<Shared>,
    config: RwLock<ConnectionConfig>,
    config_path: Option<PathBuf>,
    session: Mutex<Option<Active>>,
}

impl ConnectionManager {
    /// Creates a manager in `Disconnected` using `connector` and the default config.
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            shared: Arc::new(Shared {
                state: AtomicState::default(),
                callbacks: RwLock::new(Callbacks::default()),
            }),
            config: RwLock::new(ConnectionConfig::default()),
            config_path: None,
            session: Mutex::new(None),
        }
    }

    /// Manager backed by rumqttc.
    pub fn mqtt(connect_timeout: Duration) -> Self {
        Self::new(Arc::new(MqttConnector::new(connect_timeout)))
    }

    /// Reload the config from `path` on every `connect()`, falling back to
    /// [`ConnectionConfig::default`] when the file cannot be loaded.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> ConnectionState {
        self.shared.state.load()
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    // ---------------------------
    // Configuration
    // ---------------------------

    /// Returns a copy of the active config.
    pub fn config(&self) -> ConnectionConfig {
        self.config.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Replaces the active config; takes effect on the next `connect()`.
    pub fn set_config(&self, config: ConnectionConfig) {
        *self.config.write().unwrap_or_else(|p| p.into_inner()) = config;
    }

    /// Loads the `"MQTT"` section at `path` into the active config.
    ///
    /// On failure the active config is left untouched; the returned
    /// [`ConfigError::code`] tells open / missing-section / parse apart.
    pub fn load_config_from_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let cfg = ConnectionConfig::load(path)?;
        self.set_config(cfg);
        Ok(())
    }

    /// Writes the active config to `path`.
    pub fn save_config_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        self.config().save(path)
    }

    fn resolve_config(&self) -> ConnectionConfig {
        let Some(path) = &self.config_path else {
            return self.config();
        };
        if let Err(e) = self.load_config_from_file(path) {
            warn!(
                path = %path.display(),
                code = e.code(),
                error = %e,
                "broker config unavailable, using built-in defaults"
            );
            self.set_config(ConnectionConfig::default());
        }
        self.config()
    }

    // ---------------------------
    // Callbacks
    // ---------------------------

    /// Invoked after a session reaches `Connected`.
    pub fn on_connect(&self, cb: impl Fn() + Send + Sync + 'static) {
        debug!("registered on_connect callback");
        self.shared.callbacks_mut().connect = Some(Arc::new(cb));
    }

    /// Invoked once when a connected session ends (caller- or broker-initiated).
    pub fn on_disconnect(&self, cb: impl Fn() + Send + Sync + 'static) {
        debug!("registered on_disconnect callback");
        self.shared.callbacks_mut().disconnect = Some(Arc::new(cb));
    }

    /// Invoked with a reason for connect failures, lost connections and bad payloads.
    pub fn on_error(&self, cb: impl Fn(&str) + Send + Sync + 'static) {
        debug!("registered on_error callback");
        self.shared.callbacks_mut().error = Some(Arc::new(cb));
    }

    /// Invoked on the network task for every decoded inbound message.
    pub fn on_message(&self, cb: impl Fn(&str, &str) + Send + Sync + 'static) {
        debug!("registered on_message callback");
        self.shared.callbacks_mut().message = Some(Arc::new(cb));
    }

    /// Invoked when the broker acknowledges a publish.
    pub fn on_publish_ack(&self, cb: impl Fn(u16) + Send + Sync + 'static) {
        debug!("registered on_publish_ack callback");
        self.shared.callbacks_mut().publish_ack = Some(Arc::new(cb));
    }

    // ---------------------------
    // Lifecycle
    // ---------------------------

    /// Opens a session: `Disconnected → Connecting → Connected | Disconnected`.
    ///
    /// Fails with [`ConnectionError::AlreadyConnected`] without side effects when
    /// already connected. Create/negotiate failures fire `on_error` and leave the
    /// manager `Disconnected`. The future may be dropped part-way; the manager is
    /// then `Disconnected` again and no callback fires.
    pub async fn connect(&self) -> Result<(), ConnectionError> {
        let mut session = self.session.lock().await;
        if self.is_connected() {
            return Err(ConnectionError::AlreadyConnected);
        }
        // A lost session's network task may still be firing its loss callbacks.
        if let Some(stale) = session.take() {
            join_network(stale.network).await;
        }

        let cfg = self.resolve_config();
        self.shared.state.store(ConnectionState::Connecting);
        let _attempt = ConnectAttempt(&self.shared.state);
        info!(broker = %cfg.broker, port = cfg.port, ssl = cfg.ssl, "connecting to broker");

        match self.connector.connect(&cfg).await {
            Ok(Session { client, events }) => {
                self.shared.state.store(ConnectionState::Connected);
                info!(broker = %cfg.broker, "broker connected");
                self.shared.fire_connect();

                let network = tokio::spawn(network_loop(Arc::clone(&self.shared), events));
                *session = Some(Active {
                    client: Arc::from(client),
                    network,
                });
                Ok(())
            }
            Err(e) => {
                self.shared.state.store(ConnectionState::Disconnected);
                warn!(code = e.code(), error = %e, "broker connect failed");
                self.shared.fire_error(&e.to_string());
                Err(e)
            }
        }
    }

    /// Closes the session: `Connected → Disconnecting → Disconnected`, then `on_disconnect`.
    ///
    /// No-op when not connected.
    pub async fn disconnect(&self) {
        let mut session = self.session.lock().await;
        let active = session.take();

        if !self
            .shared
            .state
            .transition(ConnectionState::Connected, ConnectionState::Disconnecting)
        {
            if let Some(stale) = active {
                join_network(stale.network).await;
            }
            return;
        }

        if let Some(Active { client, network }) = active {
            if let Err(e) = client.disconnect().await {
                warn!(error = %e, "graceful disconnect request failed");
            }
            join_network(network).await;
        }

        self.shared.state.store(ConnectionState::Disconnected);
        info!("broker disconnected");
        self.shared.fire_disconnect();
    }

    // ---------------------------
    // Requests
    // ---------------------------

    /// Publishes `payload` as JSON on `topic` (QoS 1, not retained).
    pub async fn publish<T>(&self, topic: &str, payload: &T) -> Result<(), ConnectionError>
    where
        T: Serialize + ?Sized,
    {
        if !self.is_connected() {
            return Err(ConnectionError::NotConnected);
        }
        let bytes = serde_json::to_vec(payload).map_err(|e| {
            let err = ConnectionError::Encode(e.to_string());
            self.shared.fire_error(&format!("Publish error: {e}"));
            err
        })?;

        let client = self.client().await?;
        client
            .publish(topic, QoS::AtLeastOnce, false, bytes)
            .await
            .map_err(ConnectionError::Publish)
    }

    /// Subscribes to `topic` with QoS 1.
    pub async fn subscribe(&self, topic: &str) -> Result<(), ConnectionError> {
        if !self.is_connected() {
            return Err(ConnectionError::NotConnected);
        }
        let client = self.client().await?;
        client.subscribe(topic, QoS::AtLeastOnce).await.map_err(|e| {
            self.shared
                .fire_error(&format!("Subscribe to topic '{topic}' failed: {e}"));
            ConnectionError::Subscribe(e)
        })
    }

    async fn client(&self) -> Result<Arc<dyn BrokerClient>, ConnectionError> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|active| Arc::clone(&active.client))
            .ok_or(ConnectionError::NotConnected)
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(active) = self.session.get_mut().take() {
            active.network.abort();
        }
    }
}

/// Drives the event side of one session until the connection ends.
async fn network_loop(shared: Arc<Shared>, mut events: Box<dyn BrokerEvents>) {
    loop {
        match events.next().await {
            Ok(Inbound::Message { topic, payload }) => match decode_payload(&payload) {
                Ok(text) => shared.fire_message(&topic, &text),
                Err(e) => {
                    debug!(%topic, error = %e, "dropping undecodable message");
                    shared.fire_error(&format!("Message parsing error: {e}"));
                }
            },
            Ok(Inbound::PublishAck { packet_id }) => shared.fire_publish_ack(packet_id),
            Ok(Inbound::Other) => {}
            Err(reason) => {
                if shared
                    .state
                    .transition(ConnectionState::Connected, ConnectionState::Disconnected)
                {
                    warn!(%reason, "broker connection lost");
                    shared.fire_error(&format!("Connection lost: {reason}"));
                    shared.fire_disconnect();
                }
                break;
            }
        }
    }
}

/// JSON payload → text. Only a JSON string is accepted; objects, numbers and
/// the rest are reported like malformed input.
pub fn decode_payload(raw: &[u8]) -> Result<String, serde_json::Error> {
    serde_json::from_slice::<String>(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_strings_and_rejects_other_values() {
        assert_eq!(decode_payload(br#""reboot""#).unwrap(), "reboot");
        assert_eq!(decode_payload(br#" "with \"quotes\"" "#).unwrap(), r#"with "quotes""#);

        let err = decode_payload(br#"{ "cmd": "zoom", "level": 2 }"#).unwrap_err();
        assert!(err.to_string().contains("expected a string"), "{err}");
        assert!(decode_payload(b"42").is_err());
        assert!(decode_payload(b"null").is_err());
        assert!(decode_payload(b"not json").is_err());
    }

    struct Unreachable;

    #[async_trait::async_trait]
    impl Connector for Unreachable {
        async fn connect(&self, _cfg: &ConnectionConfig) -> Result<Session, ConnectionError> {
            Err(ConnectionError::Negotiate("refused".into()))
        }
    }

    #[tokio::test]
    async fn failed_connect_reports_error_and_stays_disconnected() {
        let cm = ConnectionManager::new(Arc::new(Unreachable));
        let errors = Arc::new(std::sync::Mutex::new(Vec::<String>::new()));
        {
            let errors = Arc::clone(&errors);
            cm.on_error(move |reason| errors.lock().unwrap().push(reason.to_string()));
        }

        let err = cm.connect().await.unwrap_err();
        assert_eq!(err, ConnectionError::Negotiate("refused".into()));
        assert_eq!(cm.state(), ConnectionState::Disconnected);
        assert_eq!(errors.lock().unwrap().as_slice(), ["connection failed: refused"]);
    }

    struct Stalled;

    #[async_trait::async_trait]
    impl Connector for Stalled {
        async fn connect(&self, _cfg: &ConnectionConfig) -> Result<Session, ConnectionError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn dropped_connect_returns_to_disconnected() {
        let cm = ConnectionManager::new(Arc::new(Stalled));
        let errors = Arc::new(std::sync::Mutex::new(Vec::<String>::new()));
        {
            let errors = Arc::clone(&errors);
            cm.on_error(move |reason| errors.lock().unwrap().push(reason.to_string()));
        }

        {
            let attempt = cm.connect();
            tokio::pin!(attempt);
            let pending = tokio::time::timeout(Duration::from_millis(20), &mut attempt).await;
            assert!(pending.is_err());
            assert_eq!(cm.state(), ConnectionState::Connecting);
        }
        assert_eq!(cm.state(), ConnectionState::Disconnected);
        assert!(errors.lock().unwrap().is_empty());

        // The session lock was released with the abandoned attempt.
        tokio::time::timeout(Duration::from_millis(100), cm.disconnect())
            .await
            .unwrap();
        assert_eq!(cm.publish("t", "x").await, Err(ConnectionError::NotConnected));
    }

    #[tokio::test]
    async fn requests_while_disconnected_are_rejected() {
        let cm = ConnectionManager::new(Arc::new(Unreachable));
        assert_eq!(cm.publish("t", "x").await, Err(ConnectionError::NotConnected));
        assert_eq!(cm.subscribe("t").await, Err(ConnectionError::NotConnected));
        cm.disconnect().await;
        assert_eq!(cm.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn missing_config_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cm = ConnectionManager::new(Arc::new(Unreachable))
            .with_config_path(dir.path().join("absent.json"));
        cm.set_config(ConnectionConfig {
            broker: "stale".into(),
            ..ConnectionConfig::default()
        });

        let _ = cm.connect().await;
        assert_eq!(cm.config(), ConnectionConfig::default());
    }
}
