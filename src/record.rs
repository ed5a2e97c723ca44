//! Per-patient record types and cross-source statistics.
//!
//! A [`SourceRecord`] is one raw row as returned by an upstream fetcher.
//! The deriver ([`crate::derive`]) turns it into a [`DerivedRecord`] with
//! computed wait time, display-ready arrival, status and priority flags.
//! Cross-source counters from the reception and digital-channel systems
//! live in [`CrossSourceStats`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One raw live-queue row from an upstream source.
///
/// Records are immutable once fetched and live for a single refresh cycle.
/// Timestamps are kept as the raw strings the source produced
/// (`YYYY-MM-DD HH:MM:SS`); parsing happens in the deriver so that a
/// garbled timestamp degrades a single field instead of dropping the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Source-assigned stable identity for this visit.
    pub id: String,
    /// Unit (physical location) the visit belongs to.
    pub unit: String,
    /// Patient display name.
    pub patient: String,
    /// Service or specialty requested.
    pub service: String,
    /// Responsible professional.
    pub professional: String,
    /// Raw arrival timestamp; may be empty or unparsable.
    pub arrival: String,
    /// Raw service-start/departure timestamp, if the visit has completed.
    pub departure: Option<String>,
    /// Source-specific status code (e.g. `Espera`).
    pub status: String,
    /// Free-text age field, when the source provides one.
    pub age: Option<String>,
}

/// Whether a live patient is still waiting or already being served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatientStatus {
    Waiting,
    InService,
}

/// Priority flags inferred from free-text fields.
///
/// These are heuristic signals, not authoritative data: false negatives
/// are expected when the source data is noisy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityFlags {
    pub elderly: bool,
    pub wheelchair: bool,
    pub pregnant: bool,
}

impl PriorityFlags {
    /// True if any priority signal was detected.
    pub fn any(&self) -> bool {
        self.elderly || self.wheelchair || self.pregnant
    }
}

/// A [`SourceRecord`] with computed display and monitoring fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedRecord {
    pub id: String,
    pub patient: String,
    pub service: String,
    pub professional: String,
    /// Whole minutes waited since arrival; 0 when arrival is unknown.
    pub wait_minutes: u32,
    /// Time-of-day arrival (`HH:MM`), or the placeholder when unparsable.
    pub arrival_display: String,
    pub status: PatientStatus,
    pub priority: PriorityFlags,
}

/// Reception-side counters for one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceptionUnitStats {
    /// Patients currently queued at reception.
    pub queue_len: u64,
    /// Average reception wait in minutes.
    pub avg_wait_minutes: u32,
    /// Patients that passed through reception today.
    pub attended_today: u64,
}

/// Full reception fetch result: network-wide totals plus per-unit counters
/// keyed by the reception system's own unit identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceptionSnapshot {
    /// Queue length summed across every unit.
    pub total_queue: u64,
    /// Network-wide average wait in minutes.
    pub avg_wait_minutes: u32,
    /// Per-unit counters, keyed by reception-side unit id.
    pub per_unit: BTreeMap<String, ReceptionUnitStats>,
}

/// Digital-channel counters for one conversation group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitalGroupStats {
    /// Conversations awaiting a first response.
    pub queue_len: u64,
    /// Average first-response wait in seconds.
    pub avg_wait_secs: u64,
}

/// Digital-channel fetch result keyed by group id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitalSnapshot {
    pub groups: BTreeMap<String, DigitalGroupStats>,
}

/// Cross-source counters attached to a unit via the identity mapper.
///
/// `None` means the unit had no mapping (or the source failed this cycle)
/// and must be rendered as "no data" - never as a fabricated zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossSourceStats {
    pub reception: Option<ReceptionUnitStats>,
    pub digital: Option<DigitalGroupStats>,
}

impl CrossSourceStats {
    /// The defined "no data" value for unmapped or failed lookups.
    pub fn no_data() -> Self {
        Self::default()
    }

    /// True if neither source contributed data for this unit.
    pub fn is_empty(&self) -> bool {
        self.reception.is_none() && self.digital.is_none()
    }
}
