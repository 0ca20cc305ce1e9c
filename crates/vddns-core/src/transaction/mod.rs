//! Versioned zone-update transaction
//!
//! Replaces one record's value by cloning the active zone version, editing
//! the record inside the clone, activating the clone and retiring the old
//! version. Every step after the clone works on the inactive clone, so the
//! published record set only changes at the single activate call.
//!
//! ## States
//!
//! ```text
//! Start
//!   ─ clone ─────────▶ VersionCreated(new)        fail: Failed (nothing to undo)
//! VersionCreated
//!   ─ locate by name ─▶ OldRecordFound(record)    fail: RollbackAndFail(new)
//! OldRecordFound
//!   ─ delete record ──▶ RecordDeleted             fail: RollbackAndFail(new)
//! RecordDeleted
//!   ─ add record ─────▶ RecordAdded               fail: RollbackAndFail(new)
//! RecordAdded
//!   ─ activate ───────▶ VersionActive             fail: RollbackAndFail(new)
//! VersionActive
//!   ─ delete old version (best-effort) ─▶ Done(new)
//! RollbackAndFail(new)
//!   ─ delete new version (best-effort) ─▶ Failed
//! ```
//!
//! Nothing is retried. A failed attempt is repeated only by the poll loop on
//! a later tick.

use crate::error::Error;
use crate::locator::RecordLocator;
use crate::traits::{NewRecord, RecordInfo, VersionId, ZoneApi, ZoneId};
use std::fmt;
use tracing::{debug, error, info, warn};

/// Step of the transaction that can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Cloning the active version
    Clone,
    /// Finding the target record in the clone
    Locate,
    /// Deleting the old record from the clone
    DeleteRecord,
    /// Adding the updated record to the clone
    AddRecord,
    /// Activating the clone
    Activate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Clone => "clone",
            Stage::Locate => "locate",
            Stage::DeleteRecord => "delete-record",
            Stage::AddRecord => "add-record",
            Stage::Activate => "activate",
        };
        f.write_str(name)
    }
}

/// Why a transaction failed
#[derive(Debug)]
pub struct TransactionFailure {
    /// The step that failed
    pub stage: Stage,
    /// The error returned by that step
    pub error: Error,
    /// Set when deleting the orphaned clone also failed
    pub rollback_error: Option<Error>,
}

impl fmt::Display for TransactionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.error)?;
        if let Some(rollback) = &self.rollback_error {
            write!(f, " ({})", rollback)?;
        }
        Ok(())
    }
}

/// Result of one transaction attempt
///
/// All-or-nothing from the caller's side: either the zone now publishes the
/// new version, or it publishes exactly what it did before the attempt.
#[derive(Debug)]
pub enum UpdateOutcome {
    /// The new version is active
    Success(VersionId),
    /// The zone is unchanged
    Failure(TransactionFailure),
}

impl UpdateOutcome {
    /// Check if the update went through
    pub fn is_success(&self) -> bool {
        matches!(self, UpdateOutcome::Success(_))
    }

    /// The newly active version, if any
    pub fn new_version(&self) -> Option<VersionId> {
        match self {
            UpdateOutcome::Success(version) => Some(*version),
            UpdateOutcome::Failure(_) => None,
        }
    }
}

/// Internal transaction state
#[derive(Debug)]
enum TxState {
    Start,
    VersionCreated(VersionId),
    OldRecordFound {
        version: VersionId,
        record: RecordInfo,
    },
    RecordDeleted(VersionId),
    RecordAdded(VersionId),
    VersionActive(VersionId),
    RollbackAndFail {
        version: VersionId,
        stage: Stage,
        error: Error,
    },
    Done(VersionId),
    Failed(TransactionFailure),
}

/// One versioned update of a single record
///
/// ## Lifecycle
///
/// 1. Create with [`UpdateTransaction::new()`]
/// 2. Consume with [`UpdateTransaction::execute()`]
///
/// Remote calls are awaited strictly one after another.
pub struct UpdateTransaction<'a> {
    api: &'a dyn ZoneApi,
    zone_id: ZoneId,
    active_version: VersionId,
    desired: NewRecord,
}

impl<'a> UpdateTransaction<'a> {
    /// Create a transaction
    ///
    /// # Parameters
    ///
    /// - `api`: Zone API to run against
    /// - `zone_id`: Zone holding the record
    /// - `active_version`: The zone's currently active version
    /// - `desired`: The record as it should read afterwards; it is matched
    ///   by `desired.name`
    pub fn new(
        api: &'a dyn ZoneApi,
        zone_id: ZoneId,
        active_version: VersionId,
        desired: NewRecord,
    ) -> Self {
        Self {
            api,
            zone_id,
            active_version,
            desired,
        }
    }

    /// Run the transaction to completion
    pub async fn execute(self) -> UpdateOutcome {
        let mut state = TxState::Start;

        loop {
            state = match state {
                TxState::Done(version) => return UpdateOutcome::Success(version),
                TxState::Failed(failure) => return UpdateOutcome::Failure(failure),
                other => self.advance(other).await,
            };
        }
    }

    /// Perform the remote call belonging to `state` and return the next state
    async fn advance(&self, state: TxState) -> TxState {
        let api = self.api;
        let zone = self.zone_id;

        match state {
            TxState::Start => match api.clone_version(zone, self.active_version).await {
                Ok(version) => {
                    debug!(
                        "Cloned zone {} version {} into {}",
                        zone, self.active_version, version
                    );
                    TxState::VersionCreated(version)
                }
                Err(e) => {
                    error!("Failed to create new version: {}", e);
                    TxState::Failed(TransactionFailure {
                        stage: Stage::Clone,
                        error: e,
                        rollback_error: None,
                    })
                }
            },

            TxState::VersionCreated(version) => {
                match RecordLocator::new(api)
                    .find(zone, version, &self.desired.name)
                    .await
                {
                    Ok(record) => TxState::OldRecordFound { version, record },
                    Err(e) => self.rollback_and_fail(version, Stage::Locate, e),
                }
            }

            TxState::OldRecordFound { version, record } => {
                match api.delete_record(zone, version, record.id).await {
                    Ok(()) => {
                        debug!(
                            "Deleted record {} (id {}) from version {}",
                            record.name, record.id, version
                        );
                        TxState::RecordDeleted(version)
                    }
                    Err(e) => self.rollback_and_fail(version, Stage::DeleteRecord, e),
                }
            }

            TxState::RecordDeleted(version) => {
                match api.add_record(zone, version, &self.desired).await {
                    Ok(added) => {
                        debug!(
                            "Added record {} = {} (id {}) to version {}",
                            added.name, added.value, added.id, version
                        );
                        TxState::RecordAdded(version)
                    }
                    Err(e) => self.rollback_and_fail(version, Stage::AddRecord, e),
                }
            }

            TxState::RecordAdded(version) => match api.activate_version(zone, version).await {
                Ok(()) => {
                    info!("Activated zone {} version {}", zone, version);
                    TxState::VersionActive(version)
                }
                Err(e) => self.rollback_and_fail(version, Stage::Activate, e),
            },

            TxState::VersionActive(version) => {
                if let Err(e) = api.delete_version(zone, self.active_version).await {
                    warn!(
                        "Failed to delete previous version {} of zone {}: {}",
                        self.active_version, zone, e
                    );
                }
                TxState::Done(version)
            }

            TxState::RollbackAndFail {
                version,
                stage,
                error: step_error,
            } => {
                let rollback_error = match api.delete_version(zone, version).await {
                    Ok(()) => {
                        debug!("Rolled back: deleted version {} of zone {}", version, zone);
                        None
                    }
                    Err(e) => {
                        warn!(
                            "Failed to delete orphaned version {} of zone {}: {}",
                            version, zone, e
                        );
                        Some(Error::rollback_failure(format!(
                            "version {} left behind: {}",
                            version, e
                        )))
                    }
                };
                TxState::Failed(TransactionFailure {
                    stage,
                    error: step_error,
                    rollback_error,
                })
            }

            terminal @ (TxState::Done(_) | TxState::Failed(_)) => terminal,
        }
    }

    fn rollback_and_fail(&self, version: VersionId, stage: Stage, error: Error) -> TxState {
        error!(
            "Update of {} in zone {} failed at {}: {}",
            self.desired.name, self.zone_id, stage, error
        );
        TxState::RollbackAndFail {
            version,
            stage,
            error,
        }
    }
}

/// Run one transaction
///
/// Shorthand for `UpdateTransaction::new(..).execute()`.
pub async fn update_record(
    api: &dyn ZoneApi,
    zone_id: ZoneId,
    active_version: VersionId,
    desired: NewRecord,
) -> UpdateOutcome {
    UpdateTransaction::new(api, zone_id, active_version, desired)
        .execute()
        .await
}
