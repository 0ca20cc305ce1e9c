//! Poll loop engine
//!
//! The DdnsEngine is responsible for:
//! - Reading the zone's active version and registered record at startup
//! - Polling the public IP source on a fixed interval
//! - Deciding whether the registered value is stale
//! - Running one update transaction per detected change
//! - Carrying the authoritative zone state from one tick to the next
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐
//! │ PublicIpSource │─── observed IPv4 ───┐
//! └────────────────┘                     │
//!                                        ▼
//!                               ┌──────────────┐
//!        ZoneState ───────────▶ │  DdnsEngine  │ ───────────▶ ZoneState
//!                               └──────────────┘
//!                                        │
//!                     ┌──────────────────┼──────────────────┐
//!                     ▼                  ▼                  ▼
//!             ┌──────────────┐  ┌─────────────────┐  ┌─────────────┐
//!             │should_update │  │UpdateTransaction│  │   Events    │
//!             │  (decide)    │  │ (ZoneApi calls) │  │  (notify)   │
//!             └──────────────┘  └─────────────────┘  └─────────────┘
//! ```
//!
//! ## Tick Flow
//!
//! 1. Read the current public IPv4
//! 2. Compare with the registered value
//! 3. If changed, run an update transaction against the active version
//! 4. On success, advance the state to the new version and value
//! 5. On failure, keep the state so the next tick retries the same baseline

use crate::config::DdnsConfig;
use crate::detector::should_update;
use crate::error::Result;
use crate::locator::RecordLocator;
use crate::traits::{NewRecord, PublicIpSource, VersionId, ZoneApi, ZoneId};
use crate::transaction::{UpdateOutcome, UpdateTransaction};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, error, info, warn};

/// State carried from one tick to the next
///
/// Passed into [`DdnsEngine::tick`] by value and returned updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneState {
    /// Zone holding the record
    pub zone_id: ZoneId,
    /// The zone's active version as last confirmed by this process
    pub active_version: VersionId,
    /// The record as currently registered; `record.value` is the registered value
    pub record: NewRecord,
    /// Failed update transactions since the last success
    pub consecutive_failures: u32,
    /// When this process last changed the record
    pub last_updated: Option<DateTime<Utc>>,
}

impl ZoneState {
    /// Create a state from a known active version and record
    pub fn new(zone_id: ZoneId, active_version: VersionId, record: NewRecord) -> Self {
        Self {
            zone_id,
            active_version,
            record,
            consecutive_failures: 0,
            last_updated: None,
        }
    }

    /// The value currently registered in the active version
    pub fn registered_value(&self) -> &str {
        &self.record.value
    }
}

/// Events emitted by the DdnsEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine bootstrapped and is about to poll
    Started {
        record_name: String,
        active_version: VersionId,
        registered_value: String,
    },

    /// Observed address differs from the registered value
    IpChangeDetected {
        record_name: String,
        registered_value: String,
        observed: String,
    },

    /// Observed address equals the registered value
    UpdateSkipped {
        record_name: String,
        current_value: String,
    },

    /// Update transaction succeeded
    UpdateSucceeded {
        record_name: String,
        value: String,
        previous_version: VersionId,
        new_version: VersionId,
    },

    /// Update transaction failed; the zone is unchanged
    UpdateFailed {
        record_name: String,
        error: String,
        consecutive_failures: u32,
    },

    /// Failures reached the configured alert threshold
    PersistentFailure {
        record_name: String,
        consecutive_failures: u32,
    },

    /// Public IP lookup failed
    IpLookupFailed { error: String },

    /// Engine stopped
    Stopped { reason: String },
}

/// Poll loop engine
///
/// ## Lifecycle
///
/// 1. Create with [`DdnsEngine::new()`]
/// 2. Start with [`DdnsEngine::run()`]
/// 3. Engine runs until a shutdown signal is received
///
/// ## Threading
///
/// Ticks run one at a time on a single task; at most one update transaction
/// is in flight, so no internal locking is needed.
pub struct DdnsEngine {
    /// Versioned zone API
    zone_api: Box<dyn ZoneApi>,

    /// Public IP source
    ip_source: Box<dyn PublicIpSource>,

    /// Zone holding the record
    zone_id: ZoneId,

    /// Managed record name
    record_name: String,

    /// Delay between ticks
    refresh: Duration,

    /// Consecutive failures before escalation (0 = never)
    failure_alert_threshold: u32,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl DdnsEngine {
    /// Create a new engine
    ///
    /// # Parameters
    ///
    /// - `zone_api`: Zone API implementation
    /// - `ip_source`: Public IP source implementation
    /// - `config`: vddns configuration
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        zone_api: Box<dyn ZoneApi>,
        ip_source: Box<dyn PublicIpSource>,
        config: DdnsConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let engine = Self {
            zone_api,
            ip_source,
            zone_id: config.zone_id,
            record_name: config.record_name,
            refresh: config.engine.refresh_interval(),
            failure_alert_threshold: config.engine.failure_alert_threshold,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Read the active version and the registered record from the zone
    ///
    /// # Returns
    ///
    /// - `Ok(ZoneState)`: The starting state for the poll loop
    /// - `Err(Error)`: The zone or the record could not be read
    pub async fn bootstrap(&self) -> Result<ZoneState> {
        let active_version = self
            .zone_api
            .current_active_version(self.zone_id)
            .await
            .inspect_err(|e| error!("Could not get current version: {}", e))?;

        let record = RecordLocator::new(self.zone_api.as_ref())
            .find(self.zone_id, active_version, &self.record_name)
            .await
            .inspect_err(|e| error!("Could not get current record: {}", e))?;

        info!(
            "Current registered value of {}: {} (zone {}, version {})",
            record.name, record.value, self.zone_id, active_version
        );

        Ok(ZoneState::new(
            self.zone_id,
            active_version,
            record.to_new_record(),
        ))
    }

    /// Run one poll iteration
    ///
    /// Never fails: lookup and update errors are logged and reported as
    /// events, and the returned state tells the caller what is registered.
    pub async fn tick(&self, mut state: ZoneState) -> ZoneState {
        let observed = match self.ip_source.current_ipv4().await {
            Ok(ip) => ip.to_string(),
            Err(e) => {
                error!(
                    "Failed to get public IP from {}: {}",
                    self.ip_source.source_name(),
                    e
                );
                self.emit_event(EngineEvent::IpLookupFailed {
                    error: e.to_string(),
                });
                return state;
            }
        };

        if !should_update(state.registered_value(), &observed) {
            debug!(
                "Record {} already has value {}, skipping update",
                state.record.name, observed
            );
            self.emit_event(EngineEvent::UpdateSkipped {
                record_name: state.record.name.clone(),
                current_value: observed,
            });
            return state;
        }

        info!(
            "Public IP changed: {} -> {}",
            state.registered_value(),
            observed
        );
        self.emit_event(EngineEvent::IpChangeDetected {
            record_name: state.record.name.clone(),
            registered_value: state.registered_value().to_string(),
            observed: observed.clone(),
        });

        let desired = state.record.with_value(observed);
        let outcome = UpdateTransaction::new(
            self.zone_api.as_ref(),
            state.zone_id,
            state.active_version,
            desired.clone(),
        )
        .execute()
        .await;

        match outcome {
            UpdateOutcome::Success(new_version) => {
                info!(
                    "Updated {} records with IP {} (version {} -> {})",
                    self.zone_api.api_name(),
                    desired.value,
                    state.active_version,
                    new_version
                );
                self.emit_event(EngineEvent::UpdateSucceeded {
                    record_name: desired.name.clone(),
                    value: desired.value.clone(),
                    previous_version: state.active_version,
                    new_version,
                });

                state.active_version = new_version;
                state.record = desired;
                state.consecutive_failures = 0;
                state.last_updated = Some(Utc::now());
            }
            UpdateOutcome::Failure(failure) => {
                state.consecutive_failures = state.consecutive_failures.saturating_add(1);
                warn!(
                    "Update of {} failed ({} in a row): {}",
                    desired.name, state.consecutive_failures, failure
                );
                self.emit_event(EngineEvent::UpdateFailed {
                    record_name: desired.name.clone(),
                    error: failure.to_string(),
                    consecutive_failures: state.consecutive_failures,
                });
                self.check_escalation(&state);
            }
        }

        state
    }

    /// Run the engine
    ///
    /// Bootstraps, then ticks immediately and once per refresh interval
    /// until ctrl-c.
    ///
    /// # Returns
    ///
    /// - `Ok(ZoneState)`: Clean shutdown, with the last carried state
    /// - `Err(Error)`: Bootstrap failed
    pub async fn run(&self) -> Result<ZoneState> {
        self.run_internal(None).await
    }

    /// Internal run implementation that accepts an optional shutdown signal
    async fn run_internal(
        &self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<ZoneState> {
        let mut state = self.bootstrap().await?;

        self.emit_event(EngineEvent::Started {
            record_name: state.record.name.clone(),
            active_version: state.active_version,
            registered_value: state.registered_value().to_string(),
        });

        let mut interval = tokio::time::interval(self.refresh);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = IntervalStream::new(interval);

        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for ctrl-c: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
        };
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                Some(_) = ticks.next() => {
                    state = self.tick(state).await;
                }

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    self.emit_event(EngineEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    break;
                }
            }
        }

        Ok(state)
    }

    /// Escalate when consecutive failures hit a multiple of the threshold
    fn check_escalation(&self, state: &ZoneState) {
        let threshold = self.failure_alert_threshold;
        if threshold == 0 || state.consecutive_failures % threshold != 0 {
            return;
        }

        error!(
            "Record {} has failed to update {} times in a row; check the API key and zone id",
            state.record.name, state.consecutive_failures
        );
        self.emit_event(EngineEvent::PersistentFailure {
            record_name: state.record.name.clone(),
            consecutive_failures: state.consecutive_failures,
        });
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }

    /// Run the engine until `shutdown_rx` fires
    ///
    /// With `None` this behaves like [`DdnsEngine::run()`]. Embedders that
    /// handle their own signals (SIGTERM as well as SIGINT) pass a receiver.
    pub async fn run_with_shutdown(
        &self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<ZoneState> {
        self.run_internal(shutdown_rx).await
    }
}
