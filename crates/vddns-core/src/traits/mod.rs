//! Core traits for the vddns system
//!
//! This module defines the abstract interfaces to the two remote collaborators.
//!
//! - [`ZoneApi`]: Versioned DNS zone management
//! - [`PublicIpSource`]: Discovery of the host's public IPv4 address

pub mod ip_source;
pub mod zone_api;

pub use ip_source::{PublicIpSource, parse_ipv4};
pub use zone_api::{NewRecord, RecordId, RecordInfo, VersionId, ZoneApi, ZoneId};
