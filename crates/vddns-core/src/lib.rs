// # vddns-core
//
// Core library for keeping one DNS record of a versioned zone on the host's
// public IPv4 address.
//
// ## Architecture Overview
//
// - **ZoneApi**: Trait for a copy-on-write zone API (clone, edit, activate, delete versions)
// - **PublicIpSource**: Trait for discovering the current public IPv4
// - **RecordLocator**: Finds a record by name inside a given version
// - **UpdateTransaction**: Clone → edit → activate → retire, with rollback of the clone on failure
// - **DdnsEngine**: Poll loop carrying the active version and registered value across ticks
//
// ## Design Principles
//
// 1. **Live version untouched**: every edit happens on an inactive clone
// 2. **Compensation is explicit**: each failure path names its rollback step
// 3. **Injected collaborators**: both remote services sit behind traits, so tests need no network
// 4. **State by value**: the loop state goes into each tick and comes back out

pub mod config;
pub mod detector;
pub mod engine;
pub mod error;
pub mod locator;
pub mod traits;
pub mod transaction;

// Re-export core types for convenience
pub use config::{DdnsConfig, EngineConfig, IpSourceConfig, Platform, ZoneApiConfig};
pub use detector::should_update;
pub use engine::{DdnsEngine, EngineEvent, ZoneState};
pub use error::{Error, Result};
pub use locator::RecordLocator;
pub use traits::{NewRecord, PublicIpSource, RecordId, RecordInfo, VersionId, ZoneApi, ZoneId};
pub use transaction::{Stage, TransactionFailure, UpdateOutcome, UpdateTransaction};
