//! Point-in-time snapshots of a control block.
//!
//! A snapshot records what the block looks like between steps: phase, the
//! names of the wired routines, and the engine counters. Routines themselves
//! are opaque callables and cannot be serialized, so a snapshot is a
//! diagnostic record for logs and dashboards; it cannot be loaded back into a
//! live block.

use crate::core::{Phase, Routine};
use crate::engine::{ControlBlock, StepStats};
use chrono::{DateTime, Utc};
use parking_lot::lock_api::RawMutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod error;

pub use error::SnapshotError;

/// Version identifier for snapshot format
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable view of a control block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Snapshot format version
    pub version: u32,

    /// Identifier of the block the snapshot was taken from
    pub id: Uuid,

    /// Instance name from the block's configuration
    pub name: String,

    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,

    pub initialized: bool,

    /// Decoded phase, `None` when the stored code is not a known phase
    pub phase: Option<Phase>,

    /// Raw phase code as stored in the block
    pub phase_code: u8,

    pub entry_state: Option<String>,
    pub previous_state: Option<String>,
    pub current_state: Option<String>,
    pub next_state: Option<String>,

    /// Action that the next transition or termination will run
    pub pending_action: Option<String>,

    pub stats: StepStats,
}

impl<M: RawMutex> ControlBlock<M> {
    /// Capture the block's current shape.
    ///
    /// Taken under the guard, so the references and phase are consistent
    /// with each other.
    pub fn snapshot(&self) -> Snapshot {
        let slots = self.acquire();
        let mut stats = slots.stats;
        stats.contended = self.contention_count();

        let wiring = slots.wiring.as_ref();
        let name_of = |routine: Option<&Routine>| routine.map(|r| r.name().to_string());

        Snapshot {
            version: SNAPSHOT_VERSION,
            id: self.id(),
            name: self.config().name.clone(),
            taken_at: Utc::now(),
            initialized: wiring.is_some(),
            phase: Phase::try_from(slots.phase).ok(),
            phase_code: slots.phase,
            entry_state: name_of(wiring.map(|w| &w.entry_state)),
            previous_state: name_of(wiring.map(|w| &w.previous)),
            current_state: name_of(wiring.map(|w| &w.current)),
            next_state: name_of(wiring.map(|w| &w.next)),
            pending_action: name_of(wiring.map(|w| &w.pending_action)),
            stats,
        }
    }
}

impl Snapshot {
    /// Encode as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    /// Decode from JSON, rejecting unknown format versions.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Snapshot = serde_json::from_str(json)
            .map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))?;
        snapshot.check_version()
    }

    /// Encode in the compact binary format.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        bincode::serialize(self).map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    /// Decode from the compact binary format, rejecting unknown versions.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Snapshot = bincode::deserialize(bytes)
            .map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))?;
        snapshot.check_version()
    }

    fn check_version(self) -> Result<Self, SnapshotError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: self.version,
                supported: SNAPSHOT_VERSION,
            });
        }
        Ok(self)
    }
}
