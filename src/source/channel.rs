//! Channel-backed fetcher implementations.
//!
//! Each source here reads the most recent value pushed into a tokio
//! `watch` channel. This is the in-process wiring used by tests and by
//! embedders that already have the upstream data flowing through their
//! own pipeline: the producer pushes complete results, the monitor polls
//! them like any other fetcher. A channel that has not received its first
//! value (or was reset with `clear`) reports [`FetchError::NotReady`],
//! which the cycle treats as that source failing.

use async_trait::async_trait;
use tokio::sync::watch;

use super::{DigitalSource, FetchError, FetchResult, QueueSource, ReceptionSource};
use crate::record::{DigitalSnapshot, ReceptionSnapshot, SourceRecord};

fn latest<T: Clone>(rx: &watch::Receiver<Option<T>>) -> FetchResult<T> {
    rx.borrow().clone().ok_or(FetchError::NotReady)
}

/// Producer side of a [`ChannelQueueSource`].
#[derive(Debug)]
pub struct ChannelQueueFeed {
    live: watch::Sender<Option<Vec<SourceRecord>>>,
    completed: watch::Sender<Option<Vec<SourceRecord>>>,
}

impl ChannelQueueFeed {
    /// Publish the current live queue rows (ascending arrival order).
    pub fn send_live(&self, rows: Vec<SourceRecord>) {
        let _ = self.live.send(Some(rows));
    }

    /// Publish today's completed visits.
    pub fn send_completed(&self, rows: Vec<SourceRecord>) {
        let _ = self.completed.send(Some(rows));
    }

    /// Drop published data so the next fetch fails with `NotReady`.
    /// Useful for simulating an outage.
    pub fn clear(&self) {
        let _ = self.live.send(None);
        let _ = self.completed.send(None);
    }
}

/// Queue source backed by watch channels.
#[derive(Debug)]
pub struct ChannelQueueSource {
    live: watch::Receiver<Option<Vec<SourceRecord>>>,
    completed: watch::Receiver<Option<Vec<SourceRecord>>>,
    description: String,
}

impl ChannelQueueSource {
    /// Create a feed/source pair.
    pub fn create(description: &str) -> (ChannelQueueFeed, Self) {
        let (live_tx, live_rx) = watch::channel(None);
        let (completed_tx, completed_rx) = watch::channel(None);
        (
            ChannelQueueFeed {
                live: live_tx,
                completed: completed_tx,
            },
            Self {
                live: live_rx,
                completed: completed_rx,
                description: format!("channel: {description}"),
            },
        )
    }
}

#[async_trait]
impl QueueSource for ChannelQueueSource {
    async fn fetch_live(&self) -> FetchResult<Vec<SourceRecord>> {
        latest(&self.live)
    }

    async fn fetch_completed_today(&self) -> FetchResult<Vec<SourceRecord>> {
        latest(&self.completed)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Reception source backed by a watch channel.
#[derive(Debug)]
pub struct ChannelReceptionSource {
    stats: watch::Receiver<Option<ReceptionSnapshot>>,
    description: String,
}

impl ChannelReceptionSource {
    /// Create a sender/source pair.
    pub fn create(
        description: &str,
    ) -> (watch::Sender<Option<ReceptionSnapshot>>, Self) {
        let (tx, rx) = watch::channel(None);
        (
            tx,
            Self {
                stats: rx,
                description: format!("channel: {description}"),
            },
        )
    }
}

#[async_trait]
impl ReceptionSource for ChannelReceptionSource {
    async fn fetch_stats(&self) -> FetchResult<ReceptionSnapshot> {
        latest(&self.stats)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Digital-channel source backed by a watch channel.
#[derive(Debug)]
pub struct ChannelDigitalSource {
    stats: watch::Receiver<Option<DigitalSnapshot>>,
    description: String,
}

impl ChannelDigitalSource {
    /// Create a sender/source pair.
    pub fn create(description: &str) -> (watch::Sender<Option<DigitalSnapshot>>, Self) {
        let (tx, rx) = watch::channel(None);
        (
            tx,
            Self {
                stats: rx,
                description: format!("channel: {description}"),
            },
        )
    }
}

#[async_trait]
impl DigitalSource for ChannelDigitalSource {
    async fn fetch_stats(&self) -> FetchResult<DigitalSnapshot> {
        latest(&self.stats)
    }

    fn description(&self) -> &str {
        &self.description
    }
}
