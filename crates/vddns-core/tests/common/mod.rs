//! Test doubles and common utilities for contract tests
//!
//! `FakeZoneApi` is an in-memory versioned zone that records every call and
//! can be told to fail chosen operations. Clones share state, so a test can
//! hand one clone to the engine and inspect another.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use vddns_core::error::{Error, Result};
use vddns_core::traits::{
    NewRecord, PublicIpSource, RecordId, RecordInfo, VersionId, ZoneApi, ZoneId,
};
use vddns_core::{DdnsConfig, ZoneState};

pub const ZONE: ZoneId = ZoneId(1234);
pub const V1: VersionId = VersionId(1);
pub const V2: VersionId = VersionId(2);

/// Operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    CurrentActiveVersion,
    CloneVersion,
    DeleteVersion,
    ActivateVersion,
    ListRecords,
    AddRecord,
    DeleteRecord,
}

/// One recorded zone API call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CurrentActiveVersion,
    CloneVersion(VersionId),
    DeleteVersion(VersionId),
    ActivateVersion(VersionId),
    ListRecords(VersionId),
    AddRecord(VersionId, NewRecord),
    DeleteRecord(VersionId, RecordId),
}

impl Call {
    /// Whether the call changes anything on the remote side
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Call::CurrentActiveVersion | Call::ListRecords(_))
    }
}

struct Zone {
    active: VersionId,
    versions: BTreeMap<VersionId, Vec<RecordInfo>>,
    next_version: i64,
    next_record: i64,
    calls: Vec<Call>,
    /// Records published by the active version when each call arrived
    visible_at_call: Vec<Vec<RecordInfo>>,
    failing: HashSet<Op>,
}

impl Zone {
    fn fresh_record(&mut self, record: &NewRecord) -> RecordInfo {
        let id = RecordId(self.next_record);
        self.next_record += 1;
        RecordInfo {
            id,
            name: record.name.clone(),
            record_type: record.record_type.clone(),
            value: record.value.clone(),
            ttl: record.ttl,
        }
    }

    fn active_records(&self) -> Vec<RecordInfo> {
        self.versions.get(&self.active).cloned().unwrap_or_default()
    }
}

/// In-memory copy-on-write zone with a call spy
#[derive(Clone)]
pub struct FakeZoneApi {
    zone_id: ZoneId,
    inner: Arc<Mutex<Zone>>,
}

impl FakeZoneApi {
    /// Create a zone whose active version `V1` holds `records`
    pub fn new(records: Vec<NewRecord>) -> Self {
        let mut zone = Zone {
            active: V1,
            versions: BTreeMap::new(),
            next_version: 2,
            next_record: 100,
            calls: Vec::new(),
            visible_at_call: Vec::new(),
            failing: HashSet::new(),
        };
        let seeded: Vec<RecordInfo> = records.iter().map(|r| zone.fresh_record(r)).collect();
        zone.versions.insert(V1, seeded);

        Self {
            zone_id: ZONE,
            inner: Arc::new(Mutex::new(zone)),
        }
    }

    /// Zone with a single `home` A record
    pub fn with_home(value: &str) -> Self {
        Self::new(vec![home(value)])
    }

    /// Make every future call of `op` fail
    pub fn fail_on(&self, op: Op) {
        self.inner.lock().unwrap().failing.insert(op);
    }

    /// Stop failing `op`
    pub fn heal(&self, op: Op) {
        self.inner.lock().unwrap().failing.remove(&op);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn mutating_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutating).collect()
    }

    pub fn deleted_versions(&self) -> Vec<VersionId> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::DeleteVersion(v) => Some(v),
                _ => None,
            })
            .collect()
    }

    pub fn visible_at_call(&self) -> Vec<Vec<RecordInfo>> {
        self.inner.lock().unwrap().visible_at_call.clone()
    }

    pub fn active_version(&self) -> VersionId {
        self.inner.lock().unwrap().active
    }

    pub fn active_records(&self) -> Vec<RecordInfo> {
        self.inner.lock().unwrap().active_records()
    }

    pub fn records_of(&self, version: VersionId) -> Option<Vec<RecordInfo>> {
        self.inner.lock().unwrap().versions.get(&version).cloned()
    }

    /// Ids of every version that still exists
    pub fn live_versions(&self) -> Vec<VersionId> {
        self.inner.lock().unwrap().versions.keys().copied().collect()
    }

    /// Record the call, then fail if `op` is marked failing
    fn enter(&self, zone_id: ZoneId, call: Call, op: Op) -> Result<std::sync::MutexGuard<'_, Zone>> {
        let mut zone = self.inner.lock().unwrap();
        let visible = zone.active_records();
        zone.visible_at_call.push(visible);
        zone.calls.push(call);

        if zone_id != self.zone_id {
            return Err(Error::zone_api("fake", format!("unknown zone {}", zone_id)));
        }
        if zone.failing.contains(&op) {
            return Err(Error::zone_api("fake", format!("injected {:?} failure", op)));
        }
        Ok(zone)
    }
}

#[async_trait::async_trait]
impl ZoneApi for FakeZoneApi {
    async fn current_active_version(&self, zone_id: ZoneId) -> Result<VersionId> {
        let zone = self.enter(zone_id, Call::CurrentActiveVersion, Op::CurrentActiveVersion)?;
        Ok(zone.active)
    }

    async fn clone_version(&self, zone_id: ZoneId, source: VersionId) -> Result<VersionId> {
        let mut zone = self.enter(zone_id, Call::CloneVersion(source), Op::CloneVersion)?;
        let records = zone
            .versions
            .get(&source)
            .cloned()
            .ok_or_else(|| Error::zone_api("fake", format!("no version {}", source)))?;

        let new_version = VersionId(zone.next_version);
        zone.next_version += 1;

        // Cloned records get fresh ids
        let cloned: Vec<RecordInfo> = records
            .iter()
            .map(|r| zone.fresh_record(&r.to_new_record()))
            .collect();
        zone.versions.insert(new_version, cloned);
        Ok(new_version)
    }

    async fn delete_version(&self, zone_id: ZoneId, version: VersionId) -> Result<()> {
        let mut zone = self.enter(zone_id, Call::DeleteVersion(version), Op::DeleteVersion)?;
        if zone.active == version {
            return Err(Error::zone_api("fake", "cannot delete the active version"));
        }
        zone.versions
            .remove(&version)
            .map(|_| ())
            .ok_or_else(|| Error::zone_api("fake", format!("no version {}", version)))
    }

    async fn activate_version(&self, zone_id: ZoneId, version: VersionId) -> Result<()> {
        let mut zone = self.enter(zone_id, Call::ActivateVersion(version), Op::ActivateVersion)?;
        if !zone.versions.contains_key(&version) {
            return Err(Error::zone_api("fake", format!("no version {}", version)));
        }
        zone.active = version;
        Ok(())
    }

    async fn list_records(&self, zone_id: ZoneId, version: VersionId) -> Result<Vec<RecordInfo>> {
        let zone = self.enter(zone_id, Call::ListRecords(version), Op::ListRecords)?;
        zone.versions
            .get(&version)
            .cloned()
            .ok_or_else(|| Error::zone_api("fake", format!("no version {}", version)))
    }

    async fn add_record(
        &self,
        zone_id: ZoneId,
        version: VersionId,
        record: &NewRecord,
    ) -> Result<RecordInfo> {
        let mut zone = self.enter(
            zone_id,
            Call::AddRecord(version, record.clone()),
            Op::AddRecord,
        )?;
        if zone.active == version {
            return Err(Error::zone_api("fake", "cannot edit the active version"));
        }
        if !zone.versions.contains_key(&version) {
            return Err(Error::zone_api("fake", format!("no version {}", version)));
        }
        let created = zone.fresh_record(record);
        if let Some(records) = zone.versions.get_mut(&version) {
            records.push(created.clone());
        }
        Ok(created)
    }

    async fn delete_record(
        &self,
        zone_id: ZoneId,
        version: VersionId,
        record_id: RecordId,
    ) -> Result<()> {
        let mut zone = self.enter(
            zone_id,
            Call::DeleteRecord(version, record_id),
            Op::DeleteRecord,
        )?;
        if zone.active == version {
            return Err(Error::zone_api("fake", "cannot edit the active version"));
        }
        let records = zone
            .versions
            .get_mut(&version)
            .ok_or_else(|| Error::zone_api("fake", format!("no version {}", version)))?;
        let before = records.len();
        records.retain(|r| r.id != record_id);
        if records.len() == before {
            return Err(Error::zone_api("fake", format!("no record {}", record_id)));
        }
        Ok(())
    }

    fn api_name(&self) -> &'static str {
        "fake"
    }
}

/// A public IP source whose answer the test controls
#[derive(Clone)]
pub struct FakeIpSource {
    answer: Arc<Mutex<Option<Ipv4Addr>>>,
    call_count: Arc<AtomicUsize>,
}

impl FakeIpSource {
    pub fn new(ip: &str) -> Self {
        Self {
            answer: Arc::new(Mutex::new(Some(ip.parse().unwrap()))),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A source that always fails
    pub fn unreachable() -> Self {
        Self {
            answer: Arc::new(Mutex::new(None)),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set(&self, ip: &str) {
        *self.answer.lock().unwrap() = Some(ip.parse().unwrap());
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PublicIpSource for FakeIpSource {
    async fn current_ipv4(&self) -> Result<Ipv4Addr> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let answer = *self.answer.lock().unwrap();
        answer.ok_or_else(|| Error::ip_source("service unreachable"))
    }

    fn source_name(&self) -> &str {
        "fake"
    }
}

/// The `home` A record used by most scenarios
pub fn home(value: &str) -> NewRecord {
    NewRecord::new("home", "A", value, 300)
}

/// Loop state matching a fresh `FakeZoneApi::with_home(value)`
pub fn home_state(value: &str) -> ZoneState {
    ZoneState::new(ZONE, V1, home(value))
}

/// Helper to create a minimal DdnsConfig for testing
pub fn minimal_config(record_name: &str) -> DdnsConfig {
    let mut config = DdnsConfig::new("test-key", ZONE, record_name);
    config.engine.refresh_secs = 1;
    config.engine.failure_alert_threshold = 3;
    config
}
