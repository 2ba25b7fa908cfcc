//! Dashboard session.
//!
//! A [`DashboardSession`] owns everything an admin dashboard shows: the
//! local copy of the ledger, the statistics derived from it and the push
//! channel status. It is the only writer of its [`RecordStore`]; channel
//! events are applied one at a time in the order they arrived.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::LedgerApi;
use crate::channel::{ChannelEvent, ChannelState};
use crate::record::CheckInRecord;
use crate::stats::{self, Stats};
use crate::store::RecordStore;

/// A visible change to the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// The channel status changed.
    Status(ChannelState),
    /// A pushed record was appended.
    Appended(CheckInRecord),
    /// The store was replaced by a bulk fetch.
    Reseeded,
    /// The channel will reconnect after `delay`.
    Retrying {
        /// Drop count so far.
        attempt: u64,
        /// Time until the reconnect.
        delay: Duration,
    },
}

/// State of one admin dashboard.
pub struct DashboardSession {
    ledger: Arc<dyn LedgerApi>,
    store: RecordStore,
    stats: Stats,
    status: ChannelState,
    seen_drop: bool,
    resync_on_reconnect: bool,
}

impl std::fmt::Debug for DashboardSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardSession")
            .field("records", &self.store.len())
            .field("stats", &self.stats)
            .field("status", &self.status)
            .field("resync_on_reconnect", &self.resync_on_reconnect)
            .finish_non_exhaustive()
    }
}

impl DashboardSession {
    /// Create an empty session reading from `ledger`.
    ///
    /// With `resync_on_reconnect`, the ledger is fetched again every time
    /// the channel comes back after a drop, so check-ins made while
    /// disconnected show up.
    #[must_use]
    pub fn new(ledger: Arc<dyn LedgerApi>, resync_on_reconnect: bool) -> Self {
        Self {
            ledger,
            store: RecordStore::new(),
            stats: Stats::default(),
            status: ChannelState::Connecting,
            seen_drop: false,
            resync_on_reconnect,
        }
    }

    /// The local copy of the ledger.
    #[must_use]
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Statistics for the current store contents.
    #[must_use]
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Last known channel status.
    #[must_use]
    pub fn status(&self) -> ChannelState {
        self.status
    }

    /// Replace the store and recompute statistics.
    pub fn reseed(&mut self, records: Vec<CheckInRecord>) {
        self.store.reseed(records);
        self.stats = stats::recompute(self.store.snapshot());
    }

    /// Append one record and recompute statistics.
    pub fn append(&mut self, record: CheckInRecord) {
        self.store.append(record);
        self.stats = stats::recompute(self.store.snapshot());
    }

    /// Bulk fetch the ledger and reseed.
    ///
    /// A failed fetch is logged and leaves the store as it was.
    pub async fn load(&mut self) -> Option<Change> {
        match self.ledger.list_records().await {
            Ok(records) => {
                info!(count = records.len(), "Loaded ledger records");
                self.reseed(records);
                Some(Change::Reseeded)
            }
            Err(e) => {
                warn!(error = %e, "Failed to load ledger records");
                None
            }
        }
    }

    /// Apply one channel event.
    pub async fn handle(&mut self, event: ChannelEvent) -> Vec<Change> {
        match event {
            ChannelEvent::CheckIn(record) => {
                self.append(record.clone());
                vec![Change::Appended(record)]
            }
            ChannelEvent::RetryScheduled { attempt, delay } => {
                vec![Change::Retrying { attempt, delay }]
            }
            ChannelEvent::State(state) => {
                let resumed = state == ChannelState::Live && self.seen_drop;
                if state == ChannelState::Disconnected {
                    self.seen_drop = true;
                }
                self.status = state;

                let mut changes = vec![Change::Status(state)];
                if resumed && self.resync_on_reconnect {
                    debug!("Channel resumed, resyncing ledger");
                    changes.extend(self.load().await);
                }
                changes
            }
        }
    }

    /// Load the ledger, then apply channel events until the channel ends.
    ///
    /// `on_change` sees the session after every change. Start the channel
    /// before calling this so pushes made during the initial fetch are
    /// queued rather than lost; they are applied after the reseed.
    pub async fn run<F>(&mut self, events: &mut mpsc::Receiver<ChannelEvent>, mut on_change: F)
    where
        F: FnMut(&Self, &Change),
    {
        if let Some(change) = self.load().await {
            on_change(&*self, &change);
        }

        while let Some(event) = events.recv().await {
            for change in self.handle(event).await {
                on_change(&*self, &change);
            }
        }
    }
}
