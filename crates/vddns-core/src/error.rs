//! Error types for the vddns system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for vddns operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the vddns system
#[derive(Error, Debug)]
pub enum Error {
    /// Network or remote failure on a zone API call
    #[error("Zone API error ({api}): {message}")]
    ZoneApi {
        /// Zone API name
        api: String,
        /// Error message
        message: String,
    },

    /// No record with the requested name exists in the version
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// More than one record carries the requested name
    #[error("Ambiguous record: {count} records named {name}")]
    AmbiguousRecord {
        /// Record name that was looked up
        name: String,
        /// Number of matching records
        count: usize,
    },

    /// Cleanup of an orphaned version failed
    #[error("Rollback failed: {0}")]
    RollbackFailure(String),

    /// Public IP source errors
    #[error("IP source error: {0}")]
    IpSource(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a zone API error
    pub fn zone_api(api: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ZoneApi {
            api: api.into(),
            message: message.into(),
        }
    }

    /// Create a "record not found" error
    pub fn record_not_found(name: impl Into<String>) -> Self {
        Self::RecordNotFound(name.into())
    }

    /// Create an ambiguous record error
    pub fn ambiguous_record(name: impl Into<String>, count: usize) -> Self {
        Self::AmbiguousRecord {
            name: name.into(),
            count,
        }
    }

    /// Create a rollback failure error
    pub fn rollback_failure(msg: impl Into<String>) -> Self {
        Self::RollbackFailure(msg.into())
    }

    /// Create an IP source error
    pub fn ip_source(msg: impl Into<String>) -> Self {
        Self::IpSource(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Whether this error means the locator could not pick a single record
    pub fn is_record_lookup_miss(&self) -> bool {
        matches!(self, Self::RecordNotFound(_) | Self::AmbiguousRecord { .. })
    }
}
