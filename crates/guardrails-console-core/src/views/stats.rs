//! Stats view: polls aggregate statistics on a fixed interval.
//!
//! Independent of the event bus and of audit pagination. A failed poll keeps
//! the last snapshot on screen; only a missing API key blanks it.

use crate::error::ConsoleError;
use crate::gateway::GatewayApi;
use crate::models::AggregateStats;
use crate::views::Teardown;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Latest known statistics plus freshness bookkeeping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsPanel {
    snapshot: Option<AggregateStats>,
    updated_at: Option<DateTime<Utc>>,
    consecutive_failures: u32,
}

impl StatsPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<&AggregateStats> {
        self.snapshot.as_ref()
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// True when the shown snapshot is older than the last poll attempt.
    pub fn is_stale(&self) -> bool {
        self.consecutive_failures > 0 && self.snapshot.is_some()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn apply(&mut self, result: Result<AggregateStats, ConsoleError>) {
        match result {
            Ok(stats) => {
                self.snapshot = Some(stats);
                self.updated_at = Some(Utc::now());
                self.consecutive_failures = 0;
            }
            Err(ConsoleError::AuthMissing) => {
                tracing::debug!("no API key; stats cleared");
                *self = Self::default();
            }
            Err(e) => {
                self.consecutive_failures += 1;
                tracing::warn!(
                    error = %e,
                    failures = self.consecutive_failures,
                    "failed to fetch stats"
                );
            }
        }
    }
}

/// Background poller feeding a [`StatsPanel`].
pub struct StatsView;

impl StatsView {
    /// Fetch immediately, then every `interval`.
    pub fn spawn(client: Arc<dyn GatewayApi>, interval: Duration) -> StatsHandle {
        Self::spawn_until(client, interval, Teardown::never())
    }

    /// Like [`StatsView::spawn`], but stops and blanks the panel when
    /// `teardown` fires.
    pub fn spawn_until(
        client: Arc<dyn GatewayApi>,
        interval: Duration,
        mut teardown: Teardown,
    ) -> StatsHandle {
        let (snapshot_tx, snapshot_rx) = watch::channel(StatsPanel::new());

        let task = tokio::spawn(async move {
            let mut panel = StatsPanel::new();
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = teardown.fired() => {
                        snapshot_tx.send_replace(StatsPanel::default());
                        break;
                    }
                    _ = ticker.tick() => {
                        // Teardown preempts an in-flight poll.
                        let result = tokio::select! {
                            _ = teardown.fired() => {
                                snapshot_tx.send_replace(StatsPanel::default());
                                break;
                            }
                            result = client.fetch_stats() => result,
                        };
                        panel.apply(result);
                        snapshot_tx.send_replace(panel.clone());
                    }
                }
            }
            tracing::debug!("stats view stopped");
        });

        StatsHandle {
            snapshots: snapshot_rx,
            task: Some(task),
        }
    }
}

/// Handle to a running [`StatsView`]. Dropping it stops polling.
pub struct StatsHandle {
    snapshots: watch::Receiver<StatsPanel>,
    task: Option<JoinHandle<()>>,
}

impl StatsHandle {
    pub fn snapshot(&self) -> StatsPanel {
        self.snapshots.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<StatsPanel> {
        self.snapshots.clone()
    }

    /// Stop polling, abandoning any fetch in flight.
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for StatsHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
