mod common;

use std::sync::Arc;
use std::time::Duration;

use camvisor::{ConnectionConfig, ConnectionError, ConnectionManager, ConnectionState};
use common::{eventually, within, CallLog, MockBroker};
use rumqttc::QoS;

fn manager_with_log(broker: &MockBroker) -> (ConnectionManager, CallLog) {
    let cm = ConnectionManager::new(Arc::new(broker.clone()));
    let log = CallLog::default();
    {
        let log = log.clone();
        cm.on_connect(move || log.push("connect"));
    }
    {
        let log = log.clone();
        cm.on_disconnect(move || log.push("disconnect"));
    }
    {
        let log = log.clone();
        cm.on_error(move |reason| log.push(format!("error: {reason}")));
    }
    {
        let log = log.clone();
        cm.on_message(move |topic, payload| log.push(format!("message: {topic} {payload}")));
    }
    {
        let log = log.clone();
        cm.on_publish_ack(move |id| log.push(format!("ack: {id}")));
    }
    (cm, log)
}

#[tokio::test]
async fn connect_reaches_connected_and_fires_once() {
    let broker = MockBroker::new();
    let (cm, log) = manager_with_log(&broker);
    assert_eq!(cm.state(), ConnectionState::Disconnected);

    cm.connect().await.unwrap();
    assert_eq!(cm.state(), ConnectionState::Connected);
    assert!(cm.is_connected());
    assert_eq!(log.entries(), ["connect"]);

    let err = cm.connect().await.unwrap_err();
    assert_eq!(err, ConnectionError::AlreadyConnected);
    assert_eq!(err.code(), -1);
    assert_eq!(cm.state(), ConnectionState::Connected);
    assert_eq!(log.entries(), ["connect"]);
    assert_eq!(broker.connects(), 1);

    cm.disconnect().await;
}

#[tokio::test]
async fn requests_while_disconnected_have_no_side_effects() {
    let broker = MockBroker::new();
    let (cm, log) = manager_with_log(&broker);

    let publish = cm.publish("cam/status", "online").await.unwrap_err();
    let subscribe = cm.subscribe("cam/cmd").await.unwrap_err();
    assert_eq!(publish, ConnectionError::NotConnected);
    assert_eq!(subscribe, ConnectionError::NotConnected);

    assert_eq!(cm.state(), ConnectionState::Disconnected);
    assert!(log.entries().is_empty());
    assert!(broker.published().is_empty());
    assert!(broker.subscriptions().is_empty());
    assert_eq!(broker.connects(), 0);
}

#[tokio::test]
async fn publish_and_subscribe_use_qos1_json() {
    let broker = MockBroker::new();
    let (cm, _log) = manager_with_log(&broker);
    cm.connect().await.unwrap();

    cm.publish("cam/status", &serde_json::json!({ "battery": 87 }))
        .await
        .unwrap();
    cm.publish("cam/note", "hello").await.unwrap();
    cm.subscribe("cam/cmd").await.unwrap();

    let published = broker.published();
    assert_eq!(published.len(), 2);
    assert_eq!(published[0].0, "cam/status");
    assert_eq!(published[0].1, QoS::AtLeastOnce);
    assert!(!published[0].2);
    assert_eq!(published[0].3, br#"{"battery":87}"#);
    assert_eq!(published[1].3, br#""hello""#);
    assert_eq!(broker.subscriptions(), [("cam/cmd".to_string(), QoS::AtLeastOnce)]);

    cm.disconnect().await;
}

#[tokio::test]
async fn connection_loss_fires_error_then_disconnect_once() {
    let broker = MockBroker::new();
    let (cm, log) = manager_with_log(&broker);
    cm.connect().await.unwrap();

    broker.drop_connection("keep-alive timeout");
    assert!(eventually(Duration::from_secs(1), || log.count("disconnect") == 1).await);
    assert_eq!(cm.state(), ConnectionState::Disconnected);
    assert_eq!(
        log.entries(),
        ["connect", "error: Connection lost: keep-alive timeout", "disconnect"]
    );

    // A caller-side disconnect after the loss does not fire again.
    cm.disconnect().await;
    assert_eq!(log.count("disconnect"), 1);
    assert_eq!(cm.publish("t", "x").await, Err(ConnectionError::NotConnected));
}

#[tokio::test]
async fn caller_disconnect_fires_once_and_is_idempotent() {
    let broker = MockBroker::new();
    let (cm, log) = manager_with_log(&broker);
    cm.connect().await.unwrap();

    within(cm.disconnect()).await;
    within(cm.disconnect()).await;
    assert_eq!(cm.state(), ConnectionState::Disconnected);
    assert_eq!(log.entries(), ["connect", "disconnect"]);
}

#[tokio::test]
async fn reconnect_after_loss_opens_a_new_session() {
    let broker = MockBroker::new();
    let (cm, log) = manager_with_log(&broker);
    cm.connect().await.unwrap();
    broker.drop_connection("reset");
    assert!(eventually(Duration::from_secs(1), || !cm.is_connected()).await);

    cm.connect().await.unwrap();
    assert_eq!(broker.connects(), 2);
    assert_eq!(log.count("connect"), 2);

    broker.deliver("cam/cmd", br#""snapshot""#);
    assert!(eventually(Duration::from_secs(1), || log.count("message") == 1).await);
    cm.disconnect().await;
}

#[tokio::test]
async fn negotiation_failure_reports_error_and_stays_disconnected() {
    let broker = MockBroker::new();
    broker.refuse("not authorized");
    let (cm, log) = manager_with_log(&broker);

    let err = cm.connect().await.unwrap_err();
    assert_eq!(err.code(), -4);
    assert_eq!(cm.state(), ConnectionState::Disconnected);
    assert_eq!(log.entries(), ["error: connection failed: not authorized"]);

    broker.accept();
    cm.connect().await.unwrap();
    assert!(cm.is_connected());
    cm.disconnect().await;
}

#[tokio::test]
async fn inbound_payloads_are_decoded_or_reported() {
    let broker = MockBroker::new();
    let (cm, log) = manager_with_log(&broker);
    cm.connect().await.unwrap();

    broker.deliver("cam/cmd", br#""reboot""#);
    broker.deliver("cam/cmd", br#"{"zoom": 2}"#);
    broker.deliver("cam/cmd", b"42");
    broker.deliver("cam/cmd", b"{broken");
    broker.ack(7);

    assert!(eventually(Duration::from_secs(1), || log.count("ack") == 1).await);
    let entries = log.entries();
    assert_eq!(entries.len(), 6);
    assert_eq!(entries[1], "message: cam/cmd reboot");
    for rejected in &entries[2..5] {
        assert!(rejected.starts_with("error: Message parsing error: "), "{rejected}");
    }
    assert_eq!(entries[5], "ack: 7");
    assert_eq!(log.count("message"), 1);
    assert!(cm.is_connected());

    cm.disconnect().await;
}

#[tokio::test]
async fn config_file_without_mqtt_section_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("device.json");
    std::fs::write(&path, r#"{ "Video": { "fps": 30 } }"#).unwrap();

    let broker = MockBroker::new();
    let (cm, log) = manager_with_log(&broker);
    let err = cm.load_config_from_file(&path).unwrap_err();
    assert_eq!(err.code(), -2);
    assert_eq!(cm.state(), ConnectionState::Disconnected);
    assert_eq!(cm.config(), ConnectionConfig::default());
    assert!(log.entries().is_empty());
}

#[tokio::test]
async fn connect_reloads_config_file_each_time() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("MQTT.json");
    let cfg = ConnectionConfig {
        broker: "10.1.2.3".into(),
        client_id: "cam-07".into(),
        topic: "cam-07/cmd".into(),
        ..ConnectionConfig::default()
    };
    cfg.save(&path).unwrap();

    let broker = MockBroker::new();
    let cm = ConnectionManager::new(Arc::new(broker.clone())).with_config_path(&path);
    cm.connect().await.unwrap();
    assert_eq!(broker.last_config(), Some(cfg.clone()));
    cm.disconnect().await;

    std::fs::remove_file(&path).unwrap();
    cm.connect().await.unwrap();
    assert_eq!(broker.last_config(), Some(ConnectionConfig::default()));
    cm.disconnect().await;
}

#[tokio::test]
async fn save_config_round_trips_through_manager() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("MQTT.json");

    let cm = ConnectionManager::new(Arc::new(MockBroker::new()));
    cm.set_config(ConnectionConfig {
        port: 8883,
        ssl: true,
        ..ConnectionConfig::default()
    });
    cm.save_config_to_file(&path).unwrap();

    let other = ConnectionManager::new(Arc::new(MockBroker::new()));
    other.load_config_from_file(&path).unwrap();
    assert_eq!(other.config(), cm.config());
}
