//! Periodic reconciliation of the board with the service of record.
//!
//! [`SyncScheduler::start`] performs one blocking fetch, then keeps a
//! background task that re-fetches today's check-ins on a fixed interval and
//! replaces the store's snapshot with each successful result.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, warn};

use super::notices::Notices;
use super::store::{ReplaceOutcome, StateStore};
use crate::api::CheckInService;
use crate::error::Result;

const MIN_INTERVAL: Duration = Duration::from_millis(100);

/// What the board should show about an in-flight fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    /// Initial fetch; the board is not usable yet.
    Loading,
    /// Background fetch; the board stays interactive.
    Refreshing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    Blocking,
    Silent,
}

pub struct SyncScheduler {
    service: Arc<dyn CheckInService>,
    store: Arc<StateStore>,
    notices: Arc<Notices>,
    interval: Duration,
    state: watch::Sender<SyncState>,
}

impl std::fmt::Debug for SyncScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncScheduler")
            .field("interval", &self.interval)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl SyncScheduler {
    pub fn new(
        service: Arc<dyn CheckInService>,
        store: Arc<StateStore>,
        notices: Arc<Notices>,
        interval: Duration,
    ) -> Self {
        let (state, _) = watch::channel(SyncState::Idle);
        Self {
            service,
            store,
            notices,
            interval: interval.max(MIN_INTERVAL),
            state,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Fetches today's check-ins once and reconciles them into the store.
    ///
    /// A failure raises the banner and leaves the last good snapshot in
    /// place; a success clears the banner.
    pub async fn refresh(&self, mode: FetchMode) -> Result<ReplaceOutcome> {
        self.state.send_replace(match mode {
            FetchMode::Blocking => SyncState::Loading,
            FetchMode::Silent => SyncState::Refreshing,
        });
        let fetched = self.service.list_today().await;
        self.state.send_replace(SyncState::Idle);

        match fetched {
            Ok(records) => {
                self.notices.clear_banner();
                Ok(self.store.replace_all(records))
            }
            Err(e) => {
                warn!(error = %e, ?mode, "check-in fetch failed");
                self.notices
                    .set_banner(format!("Could not load check-ins: {}", e.user_message()));
                Err(e.into())
            }
        }
    }

    /// Manual refresh, same as a background tick.
    pub async fn refresh_now(&self) -> Result<ReplaceOutcome> {
        self.refresh(FetchMode::Silent).await
    }

    /// Runs the initial blocking fetch, then spawns the recurring one.
    ///
    /// A failed initial fetch is surfaced like any other; polling starts
    /// regardless so the board recovers on its own.
    pub async fn start(self: Arc<Self>) -> SyncHandle {
        let _ = self.refresh(FetchMode::Blocking).await;

        let (shutdown, mut stopped) = watch::channel(false);
        let scheduler = self.clone();
        let task = tokio::spawn(async move {
            let period = scheduler.interval;
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    // also fires when the handle is dropped
                    _ = stopped.changed() => break,
                    _ = ticker.tick() => {
                        let _ = scheduler.refresh(FetchMode::Silent).await;
                    }
                }
            }
            debug!("sync loop stopped");
        });

        SyncHandle { shutdown, task }
    }
}

/// Owns the recurring fetch. Dropping it stops the timer as well.
#[derive(Debug)]
pub struct SyncHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Cancels the timer and waits for the loop to exit. A fetch already
    /// in flight is allowed to complete first.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "sync loop ended abnormally");
        }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}
