//! Fetcher abstraction for the upstream sources.
//!
//! Each trait is the sole point of coupling to one concrete storage or
//! query backend; implementations can be swapped without touching the
//! mapper, deriver, aggregator or monitor. Every fetch is all-or-nothing:
//! a fetcher returns a complete result for the cycle or a [`FetchError`],
//! never a partial one.

mod channel;

pub use channel::{
    ChannelDigitalSource, ChannelQueueFeed, ChannelQueueSource, ChannelReceptionSource,
};

use async_trait::async_trait;
use thiserror::Error;

use crate::record::{DigitalSnapshot, ReceptionSnapshot, SourceRecord};

/// Errors that can occur while fetching from an upstream source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure (connection refused, broken pipe, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The source answered but the payload could not be decoded.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// The fetch did not complete within the per-fetcher timeout.
    #[error("fetch timed out")]
    Timeout,

    /// The source has no data to offer yet (e.g. a channel that has not
    /// received its first value).
    #[error("source not ready")]
    NotReady,
}

/// Result alias for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Primary queue system: live rows plus today's completed visits.
///
/// `fetch_live` must return rows in ascending arrival order; the
/// aggregator preserves insertion order rather than re-sorting, so rows
/// with unparsable arrival timestamps keep their source position.
#[async_trait]
pub trait QueueSource: Send + Sync {
    /// Rows currently waiting or in service.
    async fn fetch_live(&self) -> FetchResult<Vec<SourceRecord>>;

    /// Rows completed today, used for daily totals and averages. Completed
    /// visits leave the live list, so this is a separate query, not a
    /// derivation of `fetch_live`.
    async fn fetch_completed_today(&self) -> FetchResult<Vec<SourceRecord>>;

    /// Human-readable description of the backend, for logs.
    fn description(&self) -> &str;
}

/// Reception system: per-unit queue counters in its own id namespace.
#[async_trait]
pub trait ReceptionSource: Send + Sync {
    async fn fetch_stats(&self) -> FetchResult<ReceptionSnapshot>;

    fn description(&self) -> &str;
}

/// Digital channel: per-group conversation counters.
#[async_trait]
pub trait DigitalSource: Send + Sync {
    async fn fetch_stats(&self) -> FetchResult<DigitalSnapshot>;

    fn description(&self) -> &str;
}
