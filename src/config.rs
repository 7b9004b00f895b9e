//! Configuration management for chaser-actions

use crate::{Error, Result};
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Action layer configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// CDP endpoint of the browser (e.g. "ws://localhost:9222")
    pub cdp_endpoint: String,

    /// Default explicit-wait timeout in milliseconds
    pub default_timeout_ms: u64,

    /// Interval between wait probes in milliseconds
    pub poll_interval_ms: u64,

    /// Forward action outcomes to the report sink
    pub reporting_enabled: bool,

    /// Attach a screenshot to passed steps
    pub screenshot_on_success: bool,

    /// Attach a screenshot to failed steps
    pub screenshot_on_failure: bool,

    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cdp_endpoint: "ws://localhost:9222".to_string(),
            default_timeout_ms: 30000,
            poll_interval_ms: 500,
            reporting_enabled: true,
            screenshot_on_success: false,
            screenshot_on_failure: true,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(endpoint) = env::var("CHASER_CDP_ENDPOINT") {
            config.cdp_endpoint = endpoint;
        }

        if let Ok(timeout) = env::var("CHASER_DEFAULT_TIMEOUT") {
            config.default_timeout_ms = timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid CHASER_DEFAULT_TIMEOUT"))?;
        }

        if let Ok(interval) = env::var("CHASER_POLL_INTERVAL") {
            config.poll_interval_ms = interval
                .parse()
                .map_err(|_| Error::configuration("Invalid CHASER_POLL_INTERVAL"))?;
        }

        if let Ok(reporting) = env::var("CHASER_REPORTING") {
            config.reporting_enabled = reporting
                .parse()
                .map_err(|_| Error::configuration("Invalid CHASER_REPORTING"))?;
        }

        if let Ok(on_success) = env::var("CHASER_SCREENSHOT_ON_SUCCESS") {
            config.screenshot_on_success = on_success
                .parse()
                .map_err(|_| Error::configuration("Invalid CHASER_SCREENSHOT_ON_SUCCESS"))?;
        }

        if let Ok(on_failure) = env::var("CHASER_SCREENSHOT_ON_FAILURE") {
            config.screenshot_on_failure = on_failure
                .parse()
                .map_err(|_| Error::configuration("Invalid CHASER_SCREENSHOT_ON_FAILURE"))?;
        }

        if let Ok(log_level) = env::var("CHASER_LOG_LEVEL") {
            config.log_level = log_level;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::configuration(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Error::configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Error::configuration("poll_interval_ms must be greater than zero"));
        }
        Ok(())
    }

    /// Default explicit-wait timeout
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Interval between wait probes
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
