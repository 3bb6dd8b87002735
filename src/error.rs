//! Error types for talking to the TLS Observatory.
//!
//! This module defines the errors that can end a single scrape of a target.
//! None of them is fatal to the exporter: the scheduler logs them and keeps
//! whatever was cached before.

use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Error type for a failed scrape of one target.
#[derive(Debug, Error)]
pub enum ObservatoryError {
    /// The HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Connection, TLS or per-request timeout failure
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        /// The endpoint that was called
        endpoint: String,
        /// The underlying reqwest error
        #[source]
        source: reqwest::Error,
    },

    /// The observatory answered with a non-2xx status
    #[error("{endpoint} returned HTTP {status}")]
    Status {
        /// The endpoint that was called
        endpoint: String,
        /// The status code, whose canonical reason is part of the message
        status: StatusCode,
    },

    /// The response body was not the expected JSON document
    #[error("failed to decode response from {endpoint}: {source}")]
    Decode {
        /// The endpoint that was called
        endpoint: String,
        /// The underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// The scan did not complete before the polling deadline
    #[error("failed to retrieve results in time for {target} (waited {waited:?})")]
    PollTimeout {
        /// The target whose scan was polled
        target: String,
        /// How long polling went on
        waited: Duration,
    },
}

impl ObservatoryError {
    /// HTTP status of a `Status` error.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the observatory refused the request with `429 Too Many Requests`.
    ///
    /// The scheduler reacts to this by retrying once without forcing a rescan.
    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(StatusCode::TOO_MANY_REQUESTS)
    }
}
