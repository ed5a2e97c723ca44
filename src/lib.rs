//! # clinicwatch
//!
//! Unified live-queue monitoring for multi-unit clinics.
//!
//! Three independent upstream systems each hold one view of queue state:
//! the primary queue system (per-patient rows), the reception system
//! (per-unit counters) and a digital channel (per-group conversation
//! counters). This crate merges them into one consistent
//! [`AggregateSnapshot`] per refresh cycle and tracks whether that
//! snapshot has gone stale, independently of the refresh cadence itself.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        ClinicMonitor                         │
//! │                                                              │
//! │  refresh task (15s)          staleness task (5s)             │
//! │  ┌─────────────────┐         ┌────────────────────┐          │
//! │  │ source fetchers │         │ now - last commit  │          │
//! │  │ (concurrent,    │         │ > 300s ? → Stale   │          │
//! │  │  per-timeout)   │         └────────────────────┘          │
//! │  └───────┬─────────┘                                         │
//! │          ▼                                                   │
//! │  mapping ─▶ derive ─▶ aggregate ─▶ Arc swap of snapshot      │
//! └──────────────────────────────────────────────────────────────┘
//!                       consumers: snapshot() / staleness()
//! ```
//!
//! - [`source`]: fetcher traits ([`QueueSource`], [`ReceptionSource`],
//!   [`DigitalSource`]) - the only coupling points to concrete backends -
//!   plus channel-backed implementations for in-process wiring
//! - [`mapping`]: static identity tables between the sources' unit
//!   id namespaces, with an explicit "unmapped" result
//! - [`derive`]: wait time, arrival display, waiting/in-service
//!   classification and priority inference, computed once per cycle
//! - [`aggregate`]: merges one cycle's per-source results into per-unit
//!   views, tolerating any subset of sources failing
//! - [`monitor`]: the two periodic tasks and the non-blocking read API
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use clinicwatch::{
//!     ChannelDigitalSource, ChannelQueueSource, ChannelReceptionSource,
//!     ClinicMonitor, MonitorConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let (queue_feed, queue) = ChannelQueueSource::create("queue-db");
//!     let (reception_tx, reception) = ChannelReceptionSource::create("reception-api");
//!     let (digital_tx, digital) = ChannelDigitalSource::create("chat-api");
//!
//!     let monitor = ClinicMonitor::new(
//!         MonitorConfig::default(),
//!         Arc::new(queue),
//!         Arc::new(reception),
//!         Arc::new(digital),
//!     );
//!     let handle = monitor.start();
//!
//!     // ... producers push data through queue_feed / reception_tx / digital_tx;
//!     // consumers read monitor.snapshot() and monitor.staleness() ...
//!
//!     handle.stop();
//! }
//! ```
//!
//! ## Failure semantics
//!
//! Nothing here is fatal: a malformed row is skipped and counted, a failed
//! or slow fetcher is omitted for that cycle only, and a cycle where every
//! source fails leaves the previous snapshot in place. Failures surface to
//! consumers only through the staleness signal and the per-source success
//! bits - stale-but-present data beats no data.

pub mod aggregate;
pub mod config;
pub mod derive;
pub mod mapping;
pub mod monitor;
pub mod record;
pub mod snapshot;
pub mod source;

pub use aggregate::{Aggregator, CycleInput};
pub use config::{MonitorConfig, UnitConfig};
pub use mapping::IdentityMapper;
pub use monitor::{ClinicMonitor, MonitorHandle};
pub use record::{
    CrossSourceStats, DerivedRecord, DigitalGroupStats, DigitalSnapshot, PatientStatus,
    PriorityFlags, ReceptionSnapshot, ReceptionUnitStats, SourceRecord,
};
pub use snapshot::{AggregateSnapshot, SourceId, SourcesOk, Staleness, UnitSnapshot};
pub use source::{
    ChannelDigitalSource, ChannelQueueFeed, ChannelQueueSource, ChannelReceptionSource,
    DigitalSource, FetchError, FetchResult, QueueSource, ReceptionSource,
};
