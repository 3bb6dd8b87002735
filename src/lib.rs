//! Prometheus exporter for TLS Observatory scan results.
//!
//! A background [`scheduler::Scheduler`] periodically asks the observatory to
//! scan every configured [`Target`], the [`collector::ObservatoryClient`] turns
//! each finished scan into a [`metrics::MetricSet`], and the latest set per
//! target is kept in a [`cache::Cache`]. On every pull the
//! [`metrics::prom::Exporter`] turns the cached sets into gauges labeled by
//! target.
//!
//! # Example
//!
//! ```no_run
//! use observatory_exporter::{Target, collector::ObservatoryClient};
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), observatory_exporter::ObservatoryError> {
//! let api = url::Url::parse("https://tls-observatory.services.mozilla.com/api/v1/").unwrap();
//! let client = ObservatoryClient::new(&api, Duration::from_secs(10))?;
//! let metrics = client.scrape(&Target::new("https://example.com"), false).await?;
//! for (name, value) in metrics.iter() {
//!     println!("{} = {}", name, value);
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;

pub mod cache;
pub mod collector;
pub mod config;
pub mod error;
pub mod metrics;
pub mod scheduler;
pub mod server;

pub use cache::Cache;
pub use error::ObservatoryError;
pub use metrics::{MetricName, MetricSet};

/// A host checked through the observatory.
///
/// Targets are normalized on construction: surrounding whitespace, a leading
/// `http://` or `https://` and a trailing `/` are removed, so
/// `https://example.com/` and `example.com` name the same cache entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Target(String);

impl Target {
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim();
        let host = ["https://", "http://"]
            .iter()
            .find_map(|scheme| strip_prefix_ignore_case(trimmed, scheme))
            .unwrap_or(trimmed);
        Target(host.trim_end_matches('/').to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Target {
    fn from(raw: String) -> Self {
        Target::new(&raw)
    }
}

impl From<&str> for Target {
    fn from(raw: &str) -> Self {
        Target::new(raw)
    }
}

impl From<Target> for String {
    fn from(target: Target) -> Self {
        target.0
    }
}
