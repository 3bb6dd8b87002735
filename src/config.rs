//! Configuration file management for observatory-exporter.
//!
//! This module handles loading, parsing, and merging configuration from TOML files
//! and command-line arguments. Settings can be specified in multiple places with
//! clear precedence rules, then validated into [`Settings`].
//!
//! # Configuration Precedence
//!
//! 1. Default values (lowest priority)
//! 2. Configuration file (observatory-exporter.toml or specified with --config)
//! 3. Command-line arguments (highest priority)
//!
//! # Example Configuration File
//!
//! ```toml
//! targets = ["example.com", "https://www.example.org"]
//!
//! [web]
//! listen_address = ":9229"
//!
//! [observatory]
//! api_url = "https://tls-observatory.services.mozilla.com/api/v1/"
//! interval = 3600
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::collector::{DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT, DEFAULT_REQUEST_TIMEOUT};
use crate::Target;

/// Configuration file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "observatory-exporter.toml";
pub const DEFAULT_API_URL: &str = "https://tls-observatory.services.mozilla.com/api/v1/";
pub const DEFAULT_LISTEN_ADDRESS: &str = ":9229";
pub const DEFAULT_INTERVAL_SECS: u64 = 60 * 60;

/// The observatory only rescans a target once per this window.
pub const RESCAN_WINDOW: Duration = Duration::from_secs(3 * 60);

/// Main configuration structure.
///
/// All fields are optional to support partial configuration and merging.
/// Missing values will be filled in by defaults or overridden by CLI arguments.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    /// Hosts to scan through the observatory
    pub targets: Option<Vec<String>>,
    /// Pull endpoint configuration
    pub web: Option<WebConfig>,
    /// Observatory API configuration
    pub observatory: Option<ObservatoryConfig>,
}

/// Pull endpoint configuration.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct WebConfig {
    /// Address to listen on, e.g. ":9229" or "127.0.0.1:9229"
    pub listen_address: Option<String>,
}

/// Observatory API configuration. Durations are in seconds.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ObservatoryConfig {
    /// Base URL of the observatory API
    pub api_url: Option<String>,
    /// Seconds between two refreshes of every target
    pub interval: Option<u64>,
    /// Timeout of a single API call
    pub request_timeout: Option<u64>,
    /// Pause between two result polls
    pub poll_interval: Option<u64>,
    /// Deadline for a scan to complete
    pub poll_timeout: Option<u64>,
}

/// Validated settings the exporter runs with.
#[derive(Debug, Clone)]
pub struct Settings {
    pub targets: Vec<Target>,
    pub listen_address: String,
    pub api_url: Url,
    pub interval: Duration,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully parsed configuration
    /// * `Err(ConfigError::Io)` - File could not be read
    /// * `Err(ConfigError::Parse)` - File contains invalid TOML
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;

        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        Ok(config)
    }

    /// Creates a configuration holding every default value.
    ///
    /// # Default Values
    ///
    /// - `targets`: None (must be provided)
    /// - `web.listen_address`: ":9229"
    /// - `observatory.api_url`: the public Mozilla TLS Observatory
    /// - `observatory.interval`: 3600
    /// - `observatory.request_timeout`: 10
    /// - `observatory.poll_interval`: 1
    /// - `observatory.poll_timeout`: 120
    pub fn defaults() -> Self {
        Config {
            targets: None,
            web: Some(WebConfig {
                listen_address: Some(DEFAULT_LISTEN_ADDRESS.to_string()),
            }),
            observatory: Some(ObservatoryConfig {
                api_url: Some(DEFAULT_API_URL.to_string()),
                interval: Some(DEFAULT_INTERVAL_SECS),
                request_timeout: Some(DEFAULT_REQUEST_TIMEOUT.as_secs()),
                poll_interval: Some(DEFAULT_POLL_INTERVAL.as_secs()),
                poll_timeout: Some(DEFAULT_POLL_TIMEOUT.as_secs()),
            }),
        }
    }

    /// Merges this configuration with another, prioritizing the other's values.
    ///
    /// For each field, if the `other` config has a value (Some), it overrides
    /// this config's value. If the `other` value is None, keeps the current value.
    pub fn merge_with(mut self, other: Config) -> Self {
        if other.targets.is_some() {
            self.targets = other.targets;
        }
        if let Some(other_web) = other.web {
            let web = self.web.get_or_insert_with(WebConfig::default);
            if other_web.listen_address.is_some() {
                web.listen_address = other_web.listen_address;
            }
        }
        if let Some(other_obs) = other.observatory {
            let obs = self.observatory.get_or_insert_with(ObservatoryConfig::default);
            if other_obs.api_url.is_some() {
                obs.api_url = other_obs.api_url;
            }
            if other_obs.interval.is_some() {
                obs.interval = other_obs.interval;
            }
            if other_obs.request_timeout.is_some() {
                obs.request_timeout = other_obs.request_timeout;
            }
            if other_obs.poll_interval.is_some() {
                obs.poll_interval = other_obs.poll_interval;
            }
            if other_obs.poll_timeout.is_some() {
                obs.poll_timeout = other_obs.poll_timeout;
            }
        }
        self
    }

    /// Creates a Config from command-line arguments for merging.
    ///
    /// Only provided arguments (Some values) will override other configurations.
    /// An empty target list counts as not provided.
    pub fn from_cli_args(
        targets: Vec<String>,
        listen_address: Option<String>,
        api_url: Option<String>,
        interval: Option<u64>,
    ) -> Self {
        Config {
            targets: if targets.is_empty() { None } else { Some(targets) },
            web: Some(WebConfig { listen_address }),
            observatory: Some(ObservatoryConfig {
                api_url,
                interval,
                ..ObservatoryConfig::default()
            }),
        }
    }

    /// Generates an example configuration file in TOML format.
    pub fn example_toml() -> String {
        let example = Config {
            targets: Some(vec![
                "example.com".to_string(),
                "https://www.example.org".to_string(),
            ]),
            ..Config::defaults()
        };

        toml::to_string_pretty(&example)
            .unwrap_or_else(|_| "# Error generating example".to_string())
    }

    /// Validates the merged configuration.
    ///
    /// # Errors
    ///
    /// `ConfigError::Validation` when no usable target is configured, the API
    /// URL does not parse, or a duration is zero.
    pub fn into_settings(self) -> Result<Settings, ConfigError> {
        let mut targets: Vec<Target> = Vec::new();
        for raw in self.targets.unwrap_or_default() {
            let target = Target::new(&raw);
            if target.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "invalid target url '{}'",
                    raw
                )));
            }
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
        if targets.is_empty() {
            return Err(ConfigError::Validation("no target url set".to_string()));
        }

        let web = self.web.unwrap_or_default();
        let obs = self.observatory.unwrap_or_default();

        let api_url = obs.api_url.as_deref().unwrap_or(DEFAULT_API_URL);
        let api_url = Url::parse(api_url)
            .map_err(|e| ConfigError::Validation(format!("invalid api url '{}': {}", api_url, e)))?;

        let interval = seconds("interval", obs.interval, DEFAULT_INTERVAL_SECS)?;
        if interval < RESCAN_WINDOW {
            warn!(
                interval = ?interval,
                "Interval is shorter than the observatory rescan window, forced rescans will be rate limited"
            );
        }

        Ok(Settings {
            targets,
            listen_address: listen_address(web.listen_address.as_deref()),
            api_url,
            interval,
            request_timeout: seconds(
                "request_timeout",
                obs.request_timeout,
                DEFAULT_REQUEST_TIMEOUT.as_secs(),
            )?,
            poll_interval: seconds(
                "poll_interval",
                obs.poll_interval,
                DEFAULT_POLL_INTERVAL.as_secs(),
            )?,
            poll_timeout: seconds(
                "poll_timeout",
                obs.poll_timeout,
                DEFAULT_POLL_TIMEOUT.as_secs(),
            )?,
        })
    }
}

fn seconds(field: &str, value: Option<u64>, default: u64) -> Result<Duration, ConfigError> {
    match value.unwrap_or(default) {
        0 => Err(ConfigError::Validation(format!(
            "{} must be greater than zero",
            field
        ))),
        secs => Ok(Duration::from_secs(secs)),
    }
}

/// `:9229` listens on every interface.
fn listen_address(value: Option<&str>) -> String {
    let address = value.unwrap_or(DEFAULT_LISTEN_ADDRESS);
    if address.starts_with(':') {
        format!("0.0.0.0{}", address)
    } else {
        address.to_string()
    }
}

/// Errors that can occur during configuration loading and parsing.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error (file not found, permission denied, etc.)
    #[error("IO Error: {0}")]
    Io(String),
    /// TOML parsing error (invalid syntax, type mismatch, etc.)
    #[error("Parse Error: {0}")]
    Parse(String),
    /// Validation error (missing required fields, invalid values, etc.)
    #[error("Validation Error: {0}")]
    Validation(String),
}
