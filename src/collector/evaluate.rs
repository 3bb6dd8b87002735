//! Turns a finished scan and its certificate into a [`MetricSet`].

use serde::de::DeserializeOwned;
use tracing::warn;

use super::api::{Analysis, CertificateDetail, EvaluationData, GradingData, ScanResult};
use crate::metrics::{MetricName, MetricSet};
use crate::Target;

pub const EVALUATION_ANALYZER: &str = "mozillaEvaluationWorker";
pub const GRADING_ANALYZER: &str = "mozillaGradingWorker";

/// Derives the metric set for `target`. Performs no I/O.
///
/// The four scan/certificate metrics are always present. `ssl_level`, `score`
/// and `grade` only appear when their analyzer succeeded and its payload
/// decoded; a payload that fails to decode is logged and skipped.
pub fn derive_metrics(target: &Target, scan: &ScanResult, cert: &CertificateDetail) -> MetricSet {
    let mut values = vec![
        (MetricName::TlsEnabled, bool_to_float(scan.has_tls)),
        (MetricName::CertIsTrusted, bool_to_float(scan.is_valid)),
        (
            MetricName::CertExpiryDate,
            cert.validity.not_after.timestamp() as f64,
        ),
        (
            MetricName::CertStartDate,
            cert.validity.not_before.timestamp() as f64,
        ),
    ];

    for analysis in scan.analysis.iter().filter(|a| a.success) {
        match analysis.analyzer.as_str() {
            EVALUATION_ANALYZER => {
                if let Some(data) = decode_payload::<EvaluationData>(target, analysis) {
                    values.push((MetricName::SslLevel, level_to_ordinal(&data.level)));
                }
            }
            GRADING_ANALYZER => {
                if let Some(data) = decode_payload::<GradingData>(target, analysis) {
                    values.push((MetricName::Score, data.score));
                    values.push((MetricName::Grade, grade_to_ordinal(&data.lettergrade)));
                }
            }
            _ => continue,
        }
    }

    values.into_iter().collect()
}

fn decode_payload<T: DeserializeOwned>(target: &Target, analysis: &Analysis) -> Option<T> {
    match serde_json::from_value(analysis.result.clone()) {
        Ok(data) => Some(data),
        Err(e) => {
            warn!(
                host = %target,
                analyzer = %analysis.analyzer,
                error = %e,
                "Skipping undecodable analysis result"
            );
            None
        }
    }
}

/// Maps a Mozilla compatibility level to its ordinal; unknown levels are -1.
pub fn level_to_ordinal(level: &str) -> f64 {
    match level.to_lowercase().as_str() {
        "bad" => 0.0,
        "non-compliant" => 1.0,
        "old" => 2.0,
        "intermediate" => 3.0,
        "modern" => 4.0,
        _ => -1.0,
    }
}

/// Maps a letter grade to its ordinal; unknown letters are 0, same as F.
pub fn grade_to_ordinal(letter: &str) -> f64 {
    match letter.to_uppercase().as_str() {
        "A" => 4.0,
        "B" => 3.0,
        "C" => 2.0,
        "D" => 1.0,
        _ => 0.0,
    }
}

fn bool_to_float(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}
