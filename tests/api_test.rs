//! Integration tests for the observatory scan protocol

mod common;

use common::*;
use observatory_exporter::collector::ObservatoryClient;
use observatory_exporter::{MetricName, ObservatoryError, Target};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_scrape_polls_until_complete() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/scan"))
        .and(body_string_contains("target=example.com"))
        .respond_with(scan_id(42))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/results"))
        .and(query_param("id", "42"))
        .respond_with(result(50, json!(null)))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/results"))
        .and(query_param("id", "42"))
        .respond_with(result(100, grading(90, "A")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/certificate"))
        .and(query_param("id", "7"))
        .respond_with(certificate())
        .expect(1)
        .mount(&server)
        .await;

    let metrics = client(&server)
        .scrape(&Target::new("https://example.com"), false)
        .await
        .unwrap();

    assert_eq!(metrics.len(), 6);
    assert_eq!(metrics.get(MetricName::TlsEnabled), Some(1.0));
    assert_eq!(metrics.get(MetricName::CertIsTrusted), Some(1.0));
    assert_eq!(metrics.get(MetricName::CertExpiryDate), Some(NOT_AFTER as f64));
    assert_eq!(metrics.get(MetricName::CertStartDate), Some(NOT_BEFORE as f64));
    assert_eq!(metrics.get(MetricName::Score), Some(90.0));
    assert_eq!(metrics.get(MetricName::Grade), Some(4.0));
    assert!(!metrics.contains(MetricName::SslLevel));
}

#[tokio::test]
async fn test_rescan_flag_is_sent() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/scan"))
        .and(body_string_contains("rescan=true"))
        .respond_with(scan_id(42))
        .expect(1)
        .mount(&server)
        .await;
    mount_completed_scan(&server, json!([])).await;

    let metrics = client(&server)
        .scrape(&Target::new("example.com"), true)
        .await
        .unwrap();
    assert_eq!(metrics.len(), 4);
}

#[tokio::test]
async fn test_submit_status_error_carries_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/scan"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = client(&server)
        .scrape(&Target::new("example.com"), true)
        .await
        .unwrap_err();

    assert!(err.is_rate_limited());
    assert!(err.to_string().contains("Too Many Requests"));
}

#[tokio::test]
async fn test_malformed_submit_body_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/scan"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client(&server)
        .scrape(&Target::new("example.com"), false)
        .await
        .unwrap_err();

    assert!(matches!(err, ObservatoryError::Decode { .. }));
}

#[tokio::test]
async fn test_poll_status_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/scan"))
        .respond_with(scan_id(42))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/results"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .scrape(&Target::new("example.com"), false)
        .await
        .unwrap_err();

    assert_eq!(err.status().map(|s| s.as_u16()), Some(500));
}

#[tokio::test]
async fn test_poll_deadline_names_target() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/scan"))
        .respond_with(scan_id(42))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/results"))
        .respond_with(result(50, json!(null)))
        .mount(&server)
        .await;

    let err = client(&server)
        .with_polling(Duration::from_millis(10), Duration::from_millis(100))
        .scrape(&Target::new("slow.example.com"), false)
        .await
        .unwrap_err();

    match err {
        ObservatoryError::PollTimeout { target, .. } => assert_eq!(target, "slow.example.com"),
        other => panic!("Expected PollTimeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_certificate_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/scan"))
        .respond_with(scan_id(42))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/results"))
        .respond_with(result(100, json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/certificate"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client(&server)
        .scrape(&Target::new("example.com"), false)
        .await
        .unwrap_err();

    assert_eq!(err.status().map(|s| s.as_u16()), Some(404));
}

#[tokio::test]
async fn test_unreachable_observatory_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let api = url::Url::parse(&format!("http://{}/api/v1/", address)).unwrap();
    let client = ObservatoryClient::new(&api, Duration::from_secs(5)).unwrap();

    let err = client
        .scrape(&Target::new("example.com"), false)
        .await
        .unwrap_err();

    assert!(matches!(err, ObservatoryError::Transport { .. }));
}
