// # Zone API Trait
//
// Defines the interface to a remote DNS-zone management API that uses
// copy-on-write versioning: records are only ever edited inside an inactive
// clone of the zone, which is then activated as a whole.
//
// ## Implementations
//
// - Gandi hosted DNS (XML-RPC): `vddns-zone-gandi` crate
//
// ## Usage
//
// ```rust,ignore
// use vddns_core::ZoneApi;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let api = /* ZoneApi implementation */;
//
//     let active = api.current_active_version(zone_id).await?;
//     let draft = api.clone_version(zone_id, active).await?;
//     // ... edit records in `draft` ...
//     api.activate_version(zone_id, draft).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

opaque_id!(
    /// Identifier of a DNS zone
    ZoneId
);

opaque_id!(
    /// Identifier of one snapshot of a zone's record set
    VersionId
);

opaque_id!(
    /// Identifier of a record, unique within a single version only
    ///
    /// Cloning a version assigns new ids, so a `RecordId` must never be
    /// carried from one version to another.
    RecordId
);

/// A DNS record as listed inside a specific version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordInfo {
    /// Id assigned by the zone API, valid for this version only
    pub id: RecordId,
    /// Record name relative to the zone (e.g., "www")
    pub name: String,
    /// Record type (e.g., "A")
    pub record_type: String,
    /// Record value (e.g., "1.2.3.4")
    pub value: String,
    /// Time-to-live in seconds
    pub ttl: u32,
}

impl RecordInfo {
    /// Drop the version-local id, keeping the record's content
    pub fn to_new_record(&self) -> NewRecord {
        NewRecord {
            name: self.name.clone(),
            record_type: self.record_type.clone(),
            value: self.value.clone(),
            ttl: self.ttl,
        }
    }
}

/// A record's content without an id
///
/// This is the payload of [`ZoneApi::add_record`] and the desired state
/// handed to an update transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecord {
    /// Record name relative to the zone
    pub name: String,
    /// Record type
    pub record_type: String,
    /// Record value
    pub value: String,
    /// Time-to-live in seconds
    pub ttl: u32,
}

impl NewRecord {
    /// Create a new record description
    pub fn new(
        name: impl Into<String>,
        record_type: impl Into<String>,
        value: impl Into<String>,
        ttl: u32,
    ) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.into(),
            value: value.into(),
            ttl,
        }
    }

    /// Same record with a different value
    pub fn with_value(&self, value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..self.clone()
        }
    }
}

/// Trait for versioned zone API implementations
///
/// Every method is a single remote call that can fail. Implementations
/// must not retry, cache, or reorder calls: the update transaction owns
/// ordering and compensation.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Version Lifecycle
///
/// A version is created by [`clone_version`](ZoneApi::clone_version),
/// mutated only while inactive, then either activated or deleted. Exactly
/// one version of a zone is active at any time.
#[async_trait]
pub trait ZoneApi: Send + Sync {
    /// Get the version currently published for the zone
    async fn current_active_version(&self, zone_id: ZoneId) -> Result<VersionId, crate::Error>;

    /// Create a new inactive version whose records equal `source`'s
    ///
    /// # Returns
    ///
    /// - `Ok(VersionId)`: The id of the new version
    /// - `Err(Error)`: If the clone could not be created
    async fn clone_version(
        &self,
        zone_id: ZoneId,
        source: VersionId,
    ) -> Result<VersionId, crate::Error>;

    /// Delete a version
    ///
    /// Callers using this for cleanup treat failure (including an already
    /// deleted version) as non-fatal.
    async fn delete_version(&self, zone_id: ZoneId, version: VersionId)
    -> Result<(), crate::Error>;

    /// Make `version` the active version of the zone
    async fn activate_version(
        &self,
        zone_id: ZoneId,
        version: VersionId,
    ) -> Result<(), crate::Error>;

    /// List every record of a version
    async fn list_records(
        &self,
        zone_id: ZoneId,
        version: VersionId,
    ) -> Result<Vec<RecordInfo>, crate::Error>;

    /// Add a record to an inactive version
    ///
    /// # Returns
    ///
    /// - `Ok(RecordInfo)`: The created record, carrying its new id
    /// - `Err(Error)`: If the record could not be added
    async fn add_record(
        &self,
        zone_id: ZoneId,
        version: VersionId,
        record: &NewRecord,
    ) -> Result<RecordInfo, crate::Error>;

    /// Delete a record from an inactive version
    async fn delete_record(
        &self,
        zone_id: ZoneId,
        version: VersionId,
        record_id: RecordId,
    ) -> Result<(), crate::Error>;

    /// Get the API name (for logging/debugging)
    fn api_name(&self) -> &'static str;
}
