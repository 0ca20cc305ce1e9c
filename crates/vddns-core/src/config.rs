//! Configuration types for the vddns system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::traits::ZoneId;

/// Main vddns configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// Zone API configuration
    pub zone_api: ZoneApiConfig,

    /// Zone holding the managed record
    pub zone_id: ZoneId,

    /// Name of the record to keep on the public IPv4 (e.g., "home")
    pub record_name: String,

    /// Public IP source configuration
    #[serde(default)]
    pub ip_source: IpSourceConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl DdnsConfig {
    /// Create a new configuration with defaults for the optional sections
    pub fn new(api_key: impl Into<String>, zone_id: ZoneId, record_name: impl Into<String>) -> Self {
        Self {
            zone_api: ZoneApiConfig::new(api_key),
            zone_id,
            record_name: record_name.into(),
            ip_source: IpSourceConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Parse a configuration from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, crate::Error> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, crate::Error> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.zone_id.0 <= 0 {
            return Err(crate::Error::config("Zone id must be a positive integer"));
        }

        if self.record_name.trim().is_empty() {
            return Err(crate::Error::config("Record name cannot be empty"));
        }

        self.zone_api.validate()?;
        self.ip_source.validate()?;
        self.engine.validate()?;

        Ok(())
    }
}

/// Which zone API platform to talk to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Live platform
    #[default]
    Production,
    /// Operational test and evaluation platform
    Testing,
}

/// Zone API configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ZoneApiConfig {
    /// Opaque API key passed to every call
    pub api_key: String,

    /// Target platform
    #[serde(default)]
    pub platform: Platform,

    /// Per-request deadline (in seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

// Keeps the API key out of logs
impl std::fmt::Debug for ZoneApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoneApiConfig")
            .field("api_key", &"<REDACTED>")
            .field("platform", &self.platform)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl ZoneApiConfig {
    /// Create a production configuration with the default timeout
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            platform: Platform::Production,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    /// Select the platform
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Request timeout as a `Duration`
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate the zone API configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.api_key.is_empty() {
            return Err(crate::Error::config("Zone API key cannot be empty"));
        }
        if self.request_timeout_secs == 0 {
            return Err(crate::Error::config("Zone API request timeout must be > 0"));
        }
        Ok(())
    }
}

/// Public IP source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpSourceConfig {
    /// URL returning the caller's address as plain text
    #[serde(default = "default_ip_source_url")]
    pub url: String,

    /// Per-request deadline (in seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl IpSourceConfig {
    /// Request timeout as a `Duration`
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate the IP source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.url.is_empty() {
            return Err(crate::Error::config("IP source URL cannot be empty"));
        }
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(crate::Error::config(format!(
                "IP source URL must use HTTP or HTTPS scheme. Got: {}",
                self.url
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(crate::Error::config("IP source request timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for IpSourceConfig {
    fn default() -> Self {
        Self {
            url: default_ip_source_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Delay between public IP checks (in seconds)
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,

    /// Consecutive failed updates before the failure is escalated
    ///
    /// The loop keeps polling either way; reaching the threshold only raises
    /// the log level and emits `EngineEvent::PersistentFailure`.
    /// Set to 0 to disable escalation.
    #[serde(default = "default_failure_alert_threshold")]
    pub failure_alert_threshold: u32,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Refresh interval as a `Duration`
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }

    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.refresh_secs == 0 {
            return Err(crate::Error::config("Refresh interval must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            refresh_secs: default_refresh_secs(),
            failure_alert_threshold: default_failure_alert_threshold(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_ip_source_url() -> String {
    "https://api.ipify.org".to_string()
}

fn default_refresh_secs() -> u64 {
    300
}

fn default_failure_alert_threshold() -> u32 {
    5
}

fn default_event_channel_capacity() -> usize {
    100
}
