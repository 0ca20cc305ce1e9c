// # Public IP Source Trait
//
// Defines the interface for discovering the host's current public IPv4
// address.
//
// ## Implementations
//
// - HTTP plain-text echo services: `vddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use vddns_core::PublicIpSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* PublicIpSource implementation */;
//     println!("public address: {}", source.current_ipv4().await?);
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr};

/// Trait for public IP source implementations
///
/// # Trust Level: Semi-Trusted
///
/// IP sources are observers. They must not cache between calls, retry, or
/// decide whether an update is needed; the engine asks once per tick.
#[async_trait]
pub trait PublicIpSource: Send + Sync {
    /// Fetch the current public IPv4 address
    ///
    /// # Returns
    ///
    /// - `Ok(Ipv4Addr)`: The current address
    /// - `Err(Error)`: If the lookup failed or the answer was not IPv4
    async fn current_ipv4(&self) -> Result<Ipv4Addr, crate::Error>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &str {
        "unknown"
    }
}

/// Parse a textual address answer, accepting IPv4 only
///
/// IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) are unwrapped; every other
/// IPv6 address and anything unparsable is rejected.
pub fn parse_ipv4(text: &str) -> Result<Ipv4Addr, crate::Error> {
    let text = text.trim();
    let ip: IpAddr = text
        .parse()
        .map_err(|_| crate::Error::ip_source(format!("Invalid IP address: {:?}", text)))?;

    match ip {
        IpAddr::V4(v4) => Ok(v4),
        IpAddr::V6(v6) => v6
            .to_ipv4_mapped()
            .ok_or_else(|| crate::Error::ip_source(format!("Expected IPv4, got: {}", v6))),
    }
}
