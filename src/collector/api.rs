//! JSON documents exchanged with the observatory API.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Reply to `POST /scan`.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanHandle {
    pub scan_id: i64,
}

/// Reply to `GET /results?id=<scan_id>`.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanResult {
    #[serde(default)]
    pub completion_perc: i64,
    #[serde(default)]
    pub has_tls: bool,
    #[serde(default)]
    pub is_valid: bool,
    #[serde(default)]
    pub cert_id: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub analysis: Vec<Analysis>,
}

impl ScanResult {
    pub fn is_complete(&self) -> bool {
        self.completion_perc >= 100
    }
}

/// Output of a single observatory analyzer.
///
/// `result` is analyzer specific and decoded lazily, so one malformed payload
/// only costs the metrics derived from it.
#[derive(Debug, Clone, Deserialize)]
pub struct Analysis {
    pub analyzer: String,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub result: serde_json::Value,
}

/// Reply to `GET /certificate?id=<cert_id>`.
#[derive(Debug, Clone, Deserialize)]
pub struct CertificateDetail {
    pub validity: Validity,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validity {
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

/// Payload of the `mozillaEvaluationWorker` analyzer.
#[derive(Debug, Deserialize)]
pub(crate) struct EvaluationData {
    pub level: String,
}

/// Payload of the `mozillaGradingWorker` analyzer.
#[derive(Debug, Deserialize)]
pub(crate) struct GradingData {
    #[serde(rename = "grade")]
    pub score: f64,
    pub lettergrade: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Analysis>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<Analysis>>::deserialize(deserializer)?.unwrap_or_default())
}
