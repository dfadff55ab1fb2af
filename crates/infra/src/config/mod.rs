//! Configuration loader
//!
//! Loads the SDK configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If the required variables are missing, falls back to loading from file
//! 3. Probes `./courier.toml` then `./config.toml`
//!
//! ## Environment Variables
//! - `COURIER_BASE_URL`: API base URL (required)
//! - `COURIER_TIMEOUT_SECS`: Per-request timeout in seconds
//! - `COURIER_MAX_RETRIES`: Maximum replays per request
//! - `COURIER_RETRY_DELAY_INCREMENT_MS`: Replay-delay increment per refresh cycle
//! - `COURIER_MAX_REPLAY_DELAY_MS`: Clamp for the cumulative replay delay
//! - `COURIER_DEVICE_ID`: Stable device identifier
//! - `COURIER_LOCALE`: Locale header value
//! - `COURIER_PLATFORM`: Platform header value

use std::path::{Path, PathBuf};

use courier_domain::{ApiConfig, CourierConfig, DataError, DeviceConfig, Result, RetryConfig};

/// Load configuration with automatic fallback strategy.
///
/// # Errors
/// Returns [`DataError::Config`] when neither the environment nor a probed
/// config file yields a usable configuration.
pub fn load() -> Result<CourierConfig> {
    dotenvy::dotenv().ok();
    match load_from_env() {
        Ok(config) => {
            tracing::info!("configuration loaded from environment variables");
            Ok(config)
        }
        Err(err) => {
            tracing::debug!(error = ?err, "environment incomplete, trying config file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables.
///
/// Only `COURIER_BASE_URL` is required; every other variable falls back to
/// its default.
///
/// # Errors
/// Returns [`DataError::Config`] when the base URL is missing or a variable
/// has an invalid value.
pub fn load_from_env() -> Result<CourierConfig> {
    let base_url = env_var("COURIER_BASE_URL")?;

    Ok(CourierConfig {
        api: ApiConfig {
            base_url,
            timeout_secs: env_parse("COURIER_TIMEOUT_SECS", ApiConfig::default().timeout_secs)?,
        },
        retry: RetryConfig {
            max_retries: env_parse("COURIER_MAX_RETRIES", RetryConfig::default().max_retries)?,
            delay_increment_ms: env_parse(
                "COURIER_RETRY_DELAY_INCREMENT_MS",
                RetryConfig::default().delay_increment_ms,
            )?,
            max_replay_delay_ms: env_parse(
                "COURIER_MAX_REPLAY_DELAY_MS",
                RetryConfig::default().max_replay_delay_ms,
            )?,
        },
        device: DeviceConfig {
            device_id: std::env::var("COURIER_DEVICE_ID").ok(),
            locale: std::env::var("COURIER_LOCALE")
                .unwrap_or_else(|_| DeviceConfig::default().locale),
            platform: std::env::var("COURIER_PLATFORM")
                .unwrap_or_else(|_| DeviceConfig::default().platform),
        },
    })
}

/// Load configuration from a TOML file.
///
/// If `path` is `None`, probes the default locations.
///
/// # Errors
/// Returns [`DataError::Config`] when no file is found or the file does not
/// parse.
pub fn load_from_file(path: Option<&Path>) -> Result<CourierConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => probe_config_paths()
            .into_iter()
            .find(|candidate| candidate.exists())
            .ok_or_else(|| DataError::Config("no config file found".to_string()))?,
    };

    let contents = std::fs::read_to_string(&path)
        .map_err(|err| DataError::Config(format!("cannot read {}: {err}", path.display())))?;
    let config: CourierConfig = toml::from_str(&contents)
        .map_err(|err| DataError::Config(format!("cannot parse {}: {err}", path.display())))?;

    if config.api.base_url.is_empty() {
        return Err(DataError::Config(format!("{}: api.base_url is required", path.display())));
    }

    tracing::info!(path = %path.display(), "configuration loaded from file");
    Ok(config)
}

fn probe_config_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("courier.toml"), PathBuf::from("config.toml")]
}

fn env_var(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| DataError::Config(format!("{name} is not set")))
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| DataError::Config(format!("{name} has an invalid value: {raw}"))),
        Err(_) => Ok(default),
    }
}
