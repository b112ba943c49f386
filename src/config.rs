//! Configuration types for tickwatch
//!
//! Every section has defaults, so an empty file is a valid configuration.

use crate::history::DEFAULT_HISTORY_CAPACITY;
use crate::telemetry::LogFormat;
use serde::Deserialize;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Symbol catalog endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_url")]
    pub base_url: String,
    #[serde(default = "default_catalog_timeout")]
    pub timeout_secs: u64,
}

fn default_catalog_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_catalog_timeout() -> u64 {
    10
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_catalog_url(),
            timeout_secs: default_catalog_timeout(),
        }
    }
}

impl CatalogConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Per-symbol stream transport
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// Streams are opened at `{base_url}/{symbol}`
    #[serde(default = "default_stream_url")]
    pub base_url: String,
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

fn default_stream_url() -> String {
    "ws://localhost:8000/ws".to_string()
}
fn default_ping_interval() -> u64 {
    30
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_stream_url(),
            ping_interval_secs: default_ping_interval(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl StreamConfig {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }
}

/// Replacement of closed stream connections with exponential backoff
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReconnectConfig {
    /// Disabled by default: a closed stream stays closed until re-registered
    #[serde(default)]
    pub enabled: bool,
    /// Consecutive attempts before the symbol is left disconnected
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    5
}
fn default_initial_delay_ms() -> u64 {
    1_000
}
fn default_max_delay_ms() -> u64 {
    60_000
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl ReconnectConfig {
    /// Backoff before reconnect attempt `attempt` (zero-based), or `None`
    /// when reconnecting is disabled or attempts are exhausted
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if !self.enabled || attempt >= self.max_attempts {
            return None;
        }
        let initial = Duration::from_millis(self.initial_delay_ms);
        let factor = 2u32.saturating_pow(attempt);
        Some(
            initial
                .saturating_mul(factor)
                .min(Duration::from_millis(self.max_delay_ms)),
        )
    }
}

/// Aggregation core sizing
#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    /// Ticks kept per symbol
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Bound of the core's inbound event queue
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}
fn default_event_queue_capacity() -> usize {
    1024
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            event_queue_capacity: default_event_queue_capacity(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Serve Prometheus metrics on this port when set
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the runtime cannot work with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.aggregator.history_capacity == 0 {
            anyhow::bail!("aggregator.history_capacity must be at least 1");
        }
        if self.aggregator.event_queue_capacity == 0 {
            anyhow::bail!("aggregator.event_queue_capacity must be at least 1");
        }
        if self.stream.ping_interval_secs == 0 {
            anyhow::bail!("stream.ping_interval_secs must be at least 1");
        }
        Ok(())
    }
}
