// # HTTP IP Source
//
// Discovers the host's public IPv4 address by asking an external "what is
// my IP" service that answers with the address as plain text.
//
// ## Behavior
//
// - One GET per call; nothing is cached between calls
// - Only 2xx answers are accepted
// - IPv4-mapped IPv6 answers (`::ffff:a.b.c.d`) are unwrapped to IPv4
// - Any other IPv6 answer is rejected

use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::time::Duration;
use vddns_core::config::IpSourceConfig;
use vddns_core::traits::{PublicIpSource, parse_ipv4};
use vddns_core::{Error, Result};

/// HTTP-based public IPv4 source
#[derive(Debug)]
pub struct HttpIpSource {
    /// URL returning the caller's address as text
    url: String,

    /// HTTP client carrying the request timeout
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a new HTTP IP source
    ///
    /// # Parameters
    ///
    /// - `url`: URL to fetch the address from (e.g., "https://api.ipify.org")
    /// - `timeout`: Deadline for each request
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Create a source from the IP source section of the configuration
    pub fn from_config(config: &IpSourceConfig) -> Result<Self> {
        config.validate()?;
        Self::new(config.url.clone(), config.request_timeout())
    }

    /// The URL queried on each call
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PublicIpSource for HttpIpSource {
    async fn current_ipv4(&self) -> Result<Ipv4Addr> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::ip_source(format!("Request to {} failed: {}", self.url, e)))?;

        if !response.status().is_success() {
            return Err(Error::ip_source(format!(
                "{} answered with HTTP {}",
                self.url,
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::ip_source(format!("Failed to read response: {}", e)))?;

        let ip = parse_ipv4(&body)?;
        tracing::debug!("Public IPv4 from {}: {}", self.url, ip);
        Ok(ip)
    }

    fn source_name(&self) -> &str {
        &self.url
    }
}
