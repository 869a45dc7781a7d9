//! Telemetry configuration
//!
//! Loaded from JSON (every field optional, falling back to [`Default`]) and
//! optionally overridden from the environment.

use crate::{types::Credentials, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Environment variable overriding the collector endpoint
pub const ENV_COLLECTOR: &str = "KINO_TELEMETRY_COLLECTOR";
/// Environment variable overriding the account id
pub const ENV_VID: &str = "KINO_TELEMETRY_VID";
/// Environment variable overriding the account token
pub const ENV_TOKEN: &str = "KINO_TELEMETRY_TOKEN";

/// What to do when the dispatch queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest queued event to make room
    DropOldest,
    /// Reject the incoming event
    DropNewest,
}

/// Dispatch queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Maximum number of queued, undelivered events
    pub capacity: usize,
    /// Overflow handling
    pub overflow: OverflowPolicy,
    /// How long `release` waits for queued events to drain (milliseconds)
    pub release_grace_ms: u64,
}

impl DispatchConfig {
    pub fn release_grace(&self) -> Duration {
        Duration::from_millis(self.release_grace_ms)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            overflow: OverflowPolicy::DropOldest,
            release_grace_ms: 2000,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Text,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `info` or `kino_telemetry=debug`
    pub filter: String,
    /// Format of the stdout layer
    pub format: LogFormat,
    /// Write log records to stdout
    pub stdout: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Text,
            stdout: true,
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Collector endpoint; events are only logged when unset
    pub collector_url: Option<Url>,
    /// Account credentials stamped on every event
    pub credentials: Credentials,
    /// Media player name/version reported in `Initialized`
    pub player_version: String,
    /// Streaming protocol reported in `Play`
    pub protocol: String,
    /// Collector request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Dispatch queue settings
    pub dispatch: DispatchConfig,
    /// Logging settings
    pub log: LogConfig,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            collector_url: None,
            credentials: Credentials::default(),
            player_version: format!("kino-player-{}", env!("CARGO_PKG_VERSION")),
            protocol: crate::tracker::DEFAULT_PROTOCOL.to_string(),
            request_timeout_ms: 10000,
            dispatch: DispatchConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl TelemetryConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Apply `KINO_TELEMETRY_*` environment overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(collector) = lookup(ENV_COLLECTOR) {
            let url = Url::parse(&collector)
                .map_err(|e| Error::config(format!("{ENV_COLLECTOR}: {e}")))?;
            self.collector_url = Some(url);
        }
        if let Some(vid) = lookup(ENV_VID) {
            self.credentials.vid = vid;
        }
        if let Some(token) = lookup(ENV_TOKEN) {
            self.credentials.token = token;
        }
        self.validate()
    }

    /// Check invariants that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.dispatch.capacity == 0 {
            return Err(Error::config("dispatch.capacity must be greater than zero"));
        }
        if let Some(url) = &self.collector_url {
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Error::config(format!(
                    "collector_url must be http or https, got {}",
                    url.scheme()
                )));
            }
        }
        if self.request_timeout_ms == 0 {
            return Err(Error::config("request_timeout_ms must be greater than zero"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
