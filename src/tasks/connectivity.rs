//! # Connectivity task: keeps the broker session up.
//!
//! Owns the [`ConnectionManager`] and is the only code that drives it. Broker
//! notifications are re-published into the [`Mailbox`] so no other task ever
//! touches the network side:
//!
//! ```text
//! on_connect              ─► Custom{"mqtt.connected", ""}
//! on_disconnect           ─► Custom{"mqtt.disconnected", ""}
//! on_error(reason)        ─► Error{-1, reason}
//! on_message(topic, text) ─► Custom{topic, text}
//!                            (all Mqtt ─► target)
//! ```
//!
//! ## Run loop
//! ```text
//! loop {
//!   not connected? ─► connect()       (abandoned when the token fires)
//!                      ├─ Ok  ─► failures = 0, subscribe(cfg.topic)
//!                      └─ Err ─► sleep(backoff.next(failures)), failures += 1
//!   sleep(interval)   (cancellable)
//! }
//! on exit: disconnect()
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::broker::ConnectionManager;
use crate::error::TaskError;
use crate::mailbox::{Envelope, Mailbox, Message, TaskIdentity};
use crate::policies::BackoffPolicy;

use super::task::Task;
use super::worker::Worker;

/// Custom message name posted after a session comes up.
pub const CONNECTED_EVENT: &str = "mqtt.connected";
/// Custom message name posted after a session ends.
pub const DISCONNECTED_EVENT: &str = "mqtt.disconnected";
/// Error code carried by forwarded broker errors.
pub const BROKER_ERROR: i32 = -1;

/// Drives a [`ConnectionManager`] and forwards its callbacks as envelopes.
pub struct ConnectivityTask {
    identity: TaskIdentity,
    manager: Arc<ConnectionManager>,
    interval: Duration,
    reconnect: BackoffPolicy,
    worker: Worker,
}

impl ConnectivityTask {
    /// Wires `manager`'s callbacks to `mailbox`, addressed from `Mqtt` to `target`.
    pub fn new(
        manager: Arc<ConnectionManager>,
        mailbox: Arc<Mailbox>,
        target: TaskIdentity,
        interval: Duration,
        reconnect: BackoffPolicy,
    ) -> Self {
        let identity = TaskIdentity::MQTT;
        let post = {
            let sender = identity.clone();
            move |message: Message| {
                mailbox.send(Envelope::new(sender.clone(), target.clone(), message));
            }
        };
        let post = Arc::new(post);

        {
            let post = Arc::clone(&post);
            manager.on_connect(move || post(Message::custom(CONNECTED_EVENT, "")));
        }
        {
            let post = Arc::clone(&post);
            manager.on_disconnect(move || post(Message::custom(DISCONNECTED_EVENT, "")));
        }
        {
            let post = Arc::clone(&post);
            manager.on_error(move |reason| post(Message::error(BROKER_ERROR, reason)));
        }
        manager.on_message(move |topic, payload| post(Message::custom(topic, payload)));
        manager.on_publish_ack(|packet_id| debug!(packet_id, "publish acknowledged"));

        Self {
            worker: Worker::new(identity.name()),
            identity,
            manager,
            interval,
            reconnect,
        }
    }

    /// The owned connection, for publishing from the owning side.
    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }
}

#[async_trait]
impl Task for ConnectivityTask {
    fn identity(&self) -> &TaskIdentity {
        &self.identity
    }

    fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    async fn start(&self) -> Result<(), TaskError> {
        let manager = Arc::clone(&self.manager);
        let interval = self.interval;
        let reconnect = self.reconnect;
        if self
            .worker
            .spawn(move |token| run(manager, interval, reconnect, token))
        {
            info!(task = %self.identity, "task started");
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), TaskError> {
        self.worker.shutdown().await
    }
}

async fn run(
    manager: Arc<ConnectionManager>,
    interval: Duration,
    reconnect: BackoffPolicy,
    token: CancellationToken,
) {
    let mut failures: u32 = 0;
    loop {
        if !manager.is_connected() {
            let attempt = tokio::select! {
                _ = token.cancelled() => break,
                attempt = manager.connect() => attempt,
            };
            match attempt {
                Ok(()) => {
                    failures = 0;
                    let topic = manager.config().topic;
                    if !topic.is_empty() {
                        match manager.subscribe(&topic).await {
                            Ok(()) => info!(%topic, "subscribed"),
                            Err(e) => warn!(%topic, error = %e, "subscribe failed"),
                        }
                    }
                }
                Err(e) => {
                    let delay = reconnect.next(failures);
                    failures = failures.saturating_add(1);
                    warn!(code = e.code(), error = %e, failures, ?delay, "broker unavailable, retrying");
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tokio::time::sleep(delay) => continue,
                    }
                }
            }
        }
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    manager.disconnect().await;
}
