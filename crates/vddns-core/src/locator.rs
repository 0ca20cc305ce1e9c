//! Name-based record lookup inside a zone version
//!
//! Record ids are only unique within one version, so the "same" record in a
//! freshly cloned version is always found again by name. The locator never
//! caches: each call lists the version's records anew.

use crate::error::{Error, Result};
use crate::traits::{RecordInfo, VersionId, ZoneApi, ZoneId};
use tracing::debug;

/// Finds a single record by exact name
pub struct RecordLocator<'a> {
    api: &'a dyn ZoneApi,
}

impl<'a> RecordLocator<'a> {
    /// Create a locator over a zone API
    pub fn new(api: &'a dyn ZoneApi) -> Self {
        Self { api }
    }

    /// Find the record named `name` in `version`
    ///
    /// # Returns
    ///
    /// - `Ok(RecordInfo)`: Exactly one record matched
    /// - `Err(Error::RecordNotFound)`: No record matched
    /// - `Err(Error::AmbiguousRecord)`: More than one record matched
    /// - `Err(Error)`: The listing call itself failed (propagated unchanged)
    pub async fn find(
        &self,
        zone_id: ZoneId,
        version: VersionId,
        name: &str,
    ) -> Result<RecordInfo> {
        let records = self.api.list_records(zone_id, version).await?;
        debug!(
            "Listed {} record(s) in zone {} version {}",
            records.len(),
            zone_id,
            version
        );
        select_by_name(records, name)
    }
}

/// Pick the only record whose name equals `name`
fn select_by_name(records: Vec<RecordInfo>, name: &str) -> Result<RecordInfo> {
    let mut matches = records.into_iter().filter(|r| r.name == name);

    match (matches.next(), matches.next()) {
        (Some(record), None) => Ok(record),
        (None, _) => Err(Error::record_not_found(name)),
        (Some(_), Some(_)) => Err(Error::ambiguous_record(name, 2 + matches.count())),
    }
}
