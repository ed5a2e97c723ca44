//! Aggregated snapshot types - the unified view consumers read.
//!
//! An [`AggregateSnapshot`] is produced once per successful refresh cycle
//! and replaced wholesale, so readers never observe a torn mix of old and
//! new per-unit data.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{CrossSourceStats, DerivedRecord};

/// The merged view of one physical unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    /// Unit identity in the primary queue source's namespace.
    pub id: String,
    /// Display label.
    pub label: String,
    /// Live patients, in arrival order (ascending).
    pub patients: Vec<DerivedRecord>,
    /// Visits completed today.
    pub total_attended_today: u64,
    /// Average wait in minutes over today's completed visits.
    pub average_wait_today: u32,
    /// Reception and digital-channel counters, when mapped and available.
    pub cross: CrossSourceStats,
}

impl UnitSnapshot {
    /// An empty snapshot for a configured unit with no current patients.
    pub fn empty(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            patients: Vec::new(),
            total_attended_today: 0,
            average_wait_today: 0,
            cross: CrossSourceStats::no_data(),
        }
    }

    /// Number of patients currently in the waiting/serving sequence.
    pub fn queue_len(&self) -> usize {
        self.patients.len()
    }
}

/// The independent upstream sources merged each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    /// Live queue rows from the primary queue system.
    LiveQueue = 0,
    /// Completed-today rows from the primary queue system's history.
    CompletedToday = 1,
    /// Reception-side counters.
    Reception = 2,
    /// Digital-channel counters.
    DigitalChannel = 3,
}

impl SourceId {
    /// All sources, in bit order.
    pub const ALL: [SourceId; 4] = [
        SourceId::LiveQueue,
        SourceId::CompletedToday,
        SourceId::Reception,
        SourceId::DigitalChannel,
    ];
}

/// Bitset recording which fetchers succeeded in one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcesOk(u8);

impl SourcesOk {
    /// No source succeeded.
    pub fn none() -> Self {
        Self(0)
    }

    /// Mark a source as having succeeded this cycle.
    pub fn set(&mut self, source: SourceId) {
        self.0 |= 1 << source as u8;
    }

    /// Whether the given source succeeded this cycle.
    pub fn contains(&self, source: SourceId) -> bool {
        self.0 & (1 << source as u8) != 0
    }

    /// Whether at least one source succeeded.
    pub fn any(&self) -> bool {
        self.0 != 0
    }

    /// Iterate over the sources that succeeded.
    pub fn iter(&self) -> impl Iterator<Item = SourceId> + '_ {
        SourceId::ALL.into_iter().filter(|s| self.contains(*s))
    }
}

/// The complete merged view produced by one aggregation cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSnapshot {
    /// When this snapshot was committed. Only advances on cycles where at
    /// least one fetcher succeeded.
    pub captured_at: DateTime<Utc>,
    /// Which fetchers contributed to this snapshot.
    pub sources_ok: SourcesOk,
    /// Malformed or duplicate rows skipped while merging.
    pub skipped_records: u32,
    /// Per-unit views, keyed by unit identity.
    pub units: BTreeMap<String, UnitSnapshot>,
}

impl AggregateSnapshot {
    /// Get the snapshot for a specific unit.
    pub fn unit(&self, id: &str) -> Option<&UnitSnapshot> {
        self.units.get(id)
    }

    /// Total live patients across every unit.
    pub fn total_patients(&self) -> usize {
        self.units.values().map(|u| u.queue_len()).sum()
    }
}

/// Whether the monitoring pipeline has produced a fresh snapshot recently.
///
/// `Stale` means too much time has passed since the last successful commit,
/// regardless of whether fetch attempts are still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Staleness {
    Fresh,
    Stale,
}

impl Staleness {
    pub fn is_stale(&self) -> bool {
        matches!(self, Staleness::Stale)
    }
}
