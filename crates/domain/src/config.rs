//! Configuration structs
//!
//! Loaded by the infra crate from environment variables or a TOML file; see
//! `courier-infra::config` for the loading strategy.

use serde::{Deserialize, Serialize};

/// Top-level SDK configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourierConfig {
    /// Remote API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Authenticated-retry settings.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Device identity attached to every outgoing request.
    #[serde(default)]
    pub device: DeviceConfig,
}

/// Remote API settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL all relative endpoint paths are joined onto.
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { base_url: String::new(), timeout_secs: default_timeout_secs() }
    }
}

/// Authenticated-retry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum replays per individual request (exclusive bound).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Replay-delay increment added per successful refresh cycle, in
    /// milliseconds.
    #[serde(default = "default_delay_increment_ms")]
    pub delay_increment_ms: u64,

    /// Clamp for the cumulative replay delay, in milliseconds.
    #[serde(default = "default_max_replay_delay_ms")]
    pub max_replay_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            delay_increment_ms: default_delay_increment_ms(),
            max_replay_delay_ms: default_max_replay_delay_ms(),
        }
    }
}

/// Device identity settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Stable device identifier; omitted from requests when absent.
    #[serde(default)]
    pub device_id: Option<String>,

    /// BCP 47-ish locale tag sent in the `Locale` header.
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Platform name sent in the `Platform` header.
    #[serde(default = "default_platform")]
    pub platform: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self { device_id: None, locale: default_locale(), platform: default_platform() }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_delay_increment_ms() -> u64 {
    1_000
}

fn default_max_replay_delay_ms() -> u64 {
    30_000
}

fn default_locale() -> String {
    "en".to_string()
}

fn default_platform() -> String {
    std::env::consts::OS.to_string()
}
