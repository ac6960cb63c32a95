//! Export configuration surface.
//!
//! Plain data deserialized from TOML by the daemon. Validation beyond
//! shape (reachable URLs, writable paths) happens in the registry when
//! sinks are constructed; bad parameters there are fatal at startup.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use statline_model::MetricId;

use crate::sink::RetryPolicy;

fn default_interval_secs() -> u64 {
    30
}

fn default_export_timeout_secs() -> u64 {
    30
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_table() -> String {
    "metrics".to_string()
}

fn default_batch_size() -> usize {
    1000
}

fn default_max_size_bytes() -> u64 {
    100 * 1024 * 1024
}

fn default_max_backups() -> u32 {
    5
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_multiplier() -> f64 {
    1.0
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_enabled() -> bool {
    true
}

/// Top-level export configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// Logical system name stamped on every record.
    pub service: String,
    /// Host identifier; empty means auto-detect the machine hostname.
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Bound on each sink's export call per cycle.
    #[serde(default = "default_export_timeout_secs")]
    pub export_timeout_secs: u64,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

impl ExportConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn export_timeout(&self) -> Duration {
        Duration::from_secs(self.export_timeout_secs)
    }
}

/// Include/exclude metric-id lists, as numeric wire ids.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub include: Vec<MetricId>,
    #[serde(default)]
    pub exclude: Vec<MetricId>,
}

/// Retry shape shared by every sink type. A multiplier of 1.0 is a
/// fixed delay; anything larger is exponential backoff capped at
/// `max_delay_ms`.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::backoff(
            self.max_attempts,
            Duration::from_millis(self.initial_delay_ms),
            self.multiplier,
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

/// One sink entry, discriminated by its `type` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkConfig {
    Http {
        name: String,
        url: String,
        #[serde(default)]
        headers: HashMap<String, String>,
        #[serde(default = "default_request_timeout_secs")]
        timeout_secs: u64,
        #[serde(default)]
        retry: Option<RetryConfig>,
        #[serde(default = "default_enabled")]
        enabled: bool,
    },
    Postgres {
        name: String,
        connection_string: String,
        #[serde(default = "default_table")]
        table: String,
        #[serde(default = "default_batch_size")]
        batch_size: usize,
        #[serde(default)]
        retry: Option<RetryConfig>,
        #[serde(default = "default_enabled")]
        enabled: bool,
    },
    File {
        name: String,
        path: PathBuf,
        #[serde(default = "default_max_size_bytes")]
        max_size_bytes: u64,
        #[serde(default = "default_max_backups")]
        max_backups: u32,
        #[serde(default = "default_enabled")]
        enabled: bool,
    },
}

impl SinkConfig {
    pub fn name(&self) -> &str {
        match self {
            SinkConfig::Http { name, .. }
            | SinkConfig::Postgres { name, .. }
            | SinkConfig::File { name, .. } => name,
        }
    }

    pub fn enabled(&self) -> bool {
        match self {
            SinkConfig::Http { enabled, .. }
            | SinkConfig::Postgres { enabled, .. }
            | SinkConfig::File { enabled, .. } => *enabled,
        }
    }
}
