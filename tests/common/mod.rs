//! Fake observatory shared by the integration tests.

#![allow(dead_code)]

use observatory_exporter::collector::ObservatoryClient;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// 2024-01-01T00:00:00Z
pub const NOT_BEFORE: i64 = 1_704_067_200;
/// 2024-04-01T00:00:00Z
pub const NOT_AFTER: i64 = 1_711_929_600;

pub fn client(server: &MockServer) -> ObservatoryClient {
    let api = url::Url::parse(&format!("{}/api/v1/", server.uri())).unwrap();
    ObservatoryClient::new(&api, Duration::from_secs(5))
        .unwrap()
        .with_polling(Duration::from_millis(10), Duration::from_secs(5))
}

pub fn scan_id(id: i64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "scan_id": id }))
}

pub fn result(completion: i64, analysis: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": 42,
        "target": "example.com",
        "has_tls": true,
        "is_valid": true,
        "cert_id": 7,
        "completion_perc": completion,
        "analysis": analysis,
    }))
}

pub fn grading(score: i64, letter: &str) -> Value {
    json!([{
        "id": 1,
        "analyzer": "mozillaGradingWorker",
        "success": true,
        "result": { "grade": score, "lettergrade": letter },
    }])
}

pub fn certificate() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": 7,
        "validity": {
            "notBefore": "2024-01-01T00:00:00Z",
            "notAfter": "2024-04-01T00:00:00Z",
        },
    }))
}

/// Mounts a completed scan with id 42 and certificate 7 for every target.
pub async fn mount_completed_scan(server: &MockServer, analysis: Value) {
    Mock::given(method("POST"))
        .and(path("/api/v1/scan"))
        .respond_with(scan_id(42))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/results"))
        .and(query_param("id", "42"))
        .respond_with(result(100, analysis))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/certificate"))
        .and(query_param("id", "7"))
        .respond_with(certificate())
        .mount(server)
        .await;
}
