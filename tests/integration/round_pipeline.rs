//! End-to-end round tests: bridge → poller → parser → sinks
//!
//! These tests use the real bridge client against a mock bridge and verify
//! that every well-formed status reaches both sinks within the round.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use switch_scanner::{SensorReading, devices::DeviceRegistry};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

async fn mount_device(mock_server: &MockServer, gw_id: &str, payload: Vec<u8>) {
    Mock::given(method("POST"))
        .and(path(format!("/devices/{gw_id}/refresh")))
        .respond_with(ResponseTemplate::new(204))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/devices/{gw_id}/status")))
        .and(header("X-DEVICE-KEY", format!("key-{gw_id}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(payload))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_three_devices_three_fanouts() {
    let mock_server = MockServer::start().await;
    mount_device(&mock_server, "a1", switch_payload(true, 150, 2300, 2400)).await;
    mount_device(&mock_server, "b2", switch_payload(false, 0, 0, 2390)).await;
    mount_device(&mock_server, "c3", switch_payload(true, 42, 105, 2310)).await;

    let configs = vec![
        create_test_device_config("a1", "Kettle"),
        create_test_device_config("b2", "Lamp"),
        create_test_device_config("c3", "Router"),
    ];
    let registry = DeviceRegistry::from_configs(&configs, Some(&mock_server.uri())).unwrap();
    let scanner = create_test_scanner(registry, Duration::from_secs(2));
    let mut rx = scanner.publisher.subscribe();

    let report = scanner.scheduler.run_round(1).await;
    assert_eq!(report.published, 3);

    // All three readings were published before the round returned
    let mut names = BTreeSet::new();
    for _ in 0..3 {
        let event = rx.try_recv().expect("reading published within the round");
        names.insert(event.reading.name.clone());
    }
    assert_eq!(
        names,
        BTreeSet::from(["Kettle".to_string(), "Lamp".to_string(), "Router".to_string()])
    );
    assert!(rx.try_recv().is_err());
    assert_eq!(scanner.exporter.device_count().await, 3);
}

#[tokio::test]
async fn test_reading_normalized_end_to_end() {
    let mock_server = MockServer::start().await;
    mount_device(
        &mock_server,
        "k1",
        br#"{"dps":{"18":150,"19":2300,"20":2400,"1":true}}"#.to_vec(),
    )
    .await;

    let configs = vec![create_test_device_config("k1", "Kettle")];
    let registry = DeviceRegistry::from_configs(&configs, Some(&mock_server.uri())).unwrap();
    let scanner = create_test_scanner(registry, Duration::from_secs(2));
    let mut rx = scanner.publisher.subscribe();

    scanner.scheduler.run_round(1).await;

    let event = rx.try_recv().unwrap();
    assert_eq!(
        event.reading,
        SensorReading {
            name: "Kettle".to_string(),
            switch: true,
            current_ma: 150.0,
            power_w: 230.0,
            voltage_v: 240.0,
            state: r#"{"dps":{"18":150,"19":2300,"20":2400,"1":true}}"#.to_string(),
        }
    );

    let rendered = scanner.exporter.render().await;
    assert!(rendered.contains("switch_power_watts{device=\"Kettle\"} 230"));
    assert!(rendered.contains("switch_voltage_volts{device=\"Kettle\"} 240"));
}

#[tokio::test]
async fn test_empty_status_produces_nothing() {
    let in_flight = Arc::new(InFlight::default());
    let quiet = FakeDevice::new("Quiet", Behaviour::Empty, in_flight.clone());
    let scanner = create_test_scanner(registry_of(&[quiet.clone()]), Duration::from_secs(1));
    let mut rx = scanner.publisher.subscribe();

    let report = scanner.scheduler.run_round(1).await;

    assert_eq!(report.empty, 1);
    assert_eq!(report.failed, 0);
    assert!(rx.try_recv().is_err());
    assert_eq!(scanner.exporter.device_count().await, 0);
}

#[tokio::test]
async fn test_refresh_precedes_every_status_request() {
    let in_flight = Arc::new(InFlight::default());
    let device = FakeDevice::new(
        "Heater",
        Behaviour::Payload(switch_payload(true, 1, 2, 3)),
        in_flight,
    );
    let scanner = create_test_scanner(registry_of(&[device.clone()]), Duration::from_secs(1));

    for round in 1..=3 {
        scanner.scheduler.run_round(round).await;
    }

    assert_eq!(device.polls(), 3);
    assert_eq!(
        device
            .refreshes
            .load(std::sync::atomic::Ordering::SeqCst),
        3
    );
}

async fn request_methods(mock_server: &MockServer) -> Vec<String> {
    mock_server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|request| request.method.as_str().to_string())
        .collect()
}

async fn mount_slow_refresh(mock_server: &MockServer, gw_id: &str, delay: Duration) {
    Mock::given(method("POST"))
        .and(path(format!("/devices/{gw_id}/refresh")))
        .respond_with(ResponseTemplate::new(204).set_delay(delay))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/devices/{gw_id}/status")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(switch_payload(true, 5, 50, 2300)))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_bridge_sees_refresh_before_status_every_round() {
    let mock_server = MockServer::start().await;
    mount_slow_refresh(&mock_server, "o1", Duration::from_millis(150)).await;

    let configs = vec![create_test_device_config("o1", "Oven")];
    let registry = DeviceRegistry::from_configs(&configs, Some(&mock_server.uri())).unwrap();
    let scanner = create_test_scanner(registry, Duration::from_secs(2));

    for round in 1..=5 {
        let report = scanner.scheduler.run_round(round).await;
        assert_eq!(report.published, 1);

        let expected = ["POST", "GET"].repeat(round as usize);
        assert_eq!(request_methods(&mock_server).await, expected);
    }
}

#[tokio::test]
async fn test_unanswered_refresh_does_not_outlive_round() {
    let mock_server = MockServer::start().await;
    // Acknowledges long after the trigger gives up
    mount_slow_refresh(&mock_server, "w1", Duration::from_millis(1500)).await;

    let configs = vec![create_test_device_config("w1", "Washer")];
    let registry = DeviceRegistry::from_configs(&configs, Some(&mock_server.uri())).unwrap();
    let scanner = create_test_scanner(registry, Duration::from_secs(2));

    for round in 1..=3 {
        let report = scanner.scheduler.run_round(round).await;
        assert_eq!(report.published, 1);

        // Nothing from this round reaches the bridge after it returned
        tokio::time::sleep(Duration::from_millis(100)).await;
        let expected = ["POST", "GET"].repeat(round as usize);
        assert_eq!(request_methods(&mock_server).await, expected);
    }
}
