//! Client for the TLS Observatory scan API.
//!
//! A scrape of one target is three calls: submit a scan, poll its result
//! until it completes, then fetch the certificate the scan found. Only the
//! polling step loops; every other failure ends the scrape.
//!
//! # Submodules
//!
//! - `api` - JSON documents returned by the observatory
//! - `evaluate` - metric derivation from a finished scan

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;
use url::Url;

use crate::error::ObservatoryError;
use crate::metrics::MetricSet;
use crate::Target;

pub mod api;
pub mod evaluate;

use api::{CertificateDetail, ScanHandle, ScanResult};

/// Per-request timeout for every observatory call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Pause between two result polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// How long a scan may take to complete, measured from the first poll.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(120);

/// Runs the observatory protocol for one target at a time.
///
/// The client is cheap to share: the scheduler hands one instance to every
/// target task.
#[derive(Debug, Clone)]
pub struct ObservatoryClient {
    api_url: String,
    client: Client,
    poll_interval: Duration,
    poll_timeout: Duration,
}

impl ObservatoryClient {
    /// Creates a client for the API rooted at `api_url`.
    ///
    /// # Errors
    ///
    /// Returns `ObservatoryError::Client` if the HTTP client cannot be built.
    pub fn new(api_url: &Url, request_timeout: Duration) -> Result<Self, ObservatoryError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("observatory-exporter/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ObservatoryError::Client)?;

        Ok(ObservatoryClient {
            api_url: api_url.as_str().trim_end_matches('/').to_string(),
            client,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        })
    }

    /// Overrides the completion polling cadence and deadline.
    pub fn with_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.poll_timeout = timeout;
        self
    }

    /// Scans `target` and returns its metric set.
    ///
    /// With `rescan` set the observatory is asked to scan again even if it
    /// has a recent result; without it the observatory may answer from its
    /// own cache.
    pub async fn scrape(
        &self,
        target: &Target,
        rescan: bool,
    ) -> Result<MetricSet, ObservatoryError> {
        let handle = self.request_scan(target, rescan).await?;
        let scan = self.get_result(target, handle.scan_id).await?;
        let cert = self.get_certificate(scan.cert_id).await?;

        Ok(evaluate::derive_metrics(target, &scan, &cert))
    }

    async fn request_scan(
        &self,
        target: &Target,
        rescan: bool,
    ) -> Result<ScanHandle, ObservatoryError> {
        let endpoint = format!("{}/scan", self.api_url);

        let mut form = vec![("target", target.as_str())];
        if rescan {
            form.push(("rescan", "true"));
        }

        let response = self
            .client
            .post(&endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|source| transport(&endpoint, source))?;

        let handle: ScanHandle = decode(&endpoint, response).await?;
        debug!(host = %target, scan_id = handle.scan_id, rescan, "Scan submitted");
        Ok(handle)
    }

    async fn get_result(
        &self,
        target: &Target,
        scan_id: i64,
    ) -> Result<ScanResult, ObservatoryError> {
        let endpoint = format!("{}/results", self.api_url);
        let started = Instant::now();
        let deadline = started + self.poll_timeout;

        loop {
            let response = self
                .client
                .get(&endpoint)
                .query(&[("id", scan_id)])
                .send()
                .await
                .map_err(|source| transport(&endpoint, source))?;

            let scan: ScanResult = decode(&endpoint, response).await?;
            if scan.is_complete() {
                return Ok(scan);
            }

            if Instant::now() >= deadline {
                return Err(ObservatoryError::PollTimeout {
                    target: target.to_string(),
                    waited: started.elapsed(),
                });
            }

            debug!(
                host = %target,
                scan_id,
                completion = scan.completion_perc,
                "Scan still running"
            );
            sleep(self.poll_interval).await;
        }
    }

    async fn get_certificate(&self, cert_id: i64) -> Result<CertificateDetail, ObservatoryError> {
        let endpoint = format!("{}/certificate", self.api_url);

        let response = self
            .client
            .get(&endpoint)
            .query(&[("id", cert_id)])
            .send()
            .await
            .map_err(|source| transport(&endpoint, source))?;

        decode(&endpoint, response).await
    }
}

fn transport(endpoint: &str, source: reqwest::Error) -> ObservatoryError {
    ObservatoryError::Transport {
        endpoint: endpoint.to_string(),
        source,
    }
}

/// Checks the status, then decodes the JSON body of `response`.
async fn decode<T: DeserializeOwned>(
    endpoint: &str,
    response: Response,
) -> Result<T, ObservatoryError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ObservatoryError::Status {
            endpoint: endpoint.to_string(),
            status,
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|source| transport(endpoint, source))?;

    serde_json::from_slice(&body).map_err(|source| ObservatoryError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })
}
