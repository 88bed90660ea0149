//! In-process cache of the check-ins shown on the board.
//!
//! The store is the single source of truth for rendering. It only changes
//! through two operations: [`StateStore::replace_all`], used by periodic
//! reconciliation, and [`StateStore::patch`], used once the service has
//! confirmed a transition. Every content change is announced on a broadcast
//! channel.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::checkin::{CheckInId, CheckInPatch, CheckInRecord, Status, order};

const EVENT_CAPACITY: usize = 64;

/// Change notification emitted by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// The whole snapshot was replaced.
    Replaced { revision: u64, count: usize },
    /// A single record was patched.
    Patched { revision: u64, id: CheckInId },
}

/// What `replace_all` did with its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    /// The snapshot was swapped in and differed from the previous one.
    Replaced { count: usize },
    /// The snapshot was identical to the stored one.
    Unchanged,
    /// Empty input; the previous snapshot was kept.
    Ignored,
}

/// Why a patch was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchRejection {
    /// The patch would move the status backwards.
    StatusRegression { from: Status, to: Status },
    /// The patch sets STARTED without carrying a groomer.
    StartedWithoutGroomer,
    /// The result would be FINISHED with no groomer on the record.
    FinishedWithoutGroomer,
    /// The result would be FINISHED with no finish time.
    FinishedWithoutTimestamp,
    /// The patch attaches a groomer to a record that is still WAITING.
    GroomerWhileWaiting,
}

impl fmt::Display for PatchRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchRejection::StatusRegression { from, to } => {
                write!(f, "status cannot go from {from} back to {to}")
            }
            PatchRejection::StartedWithoutGroomer => write!(f, "STARTED requires a groomer"),
            PatchRejection::FinishedWithoutGroomer => write!(f, "FINISHED requires a groomer"),
            PatchRejection::FinishedWithoutTimestamp => {
                write!(f, "FINISHED requires a finish time")
            }
            PatchRejection::GroomerWhileWaiting => {
                write!(f, "a WAITING check-in cannot have a groomer")
            }
        }
    }
}

/// What `patch` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    Applied(CheckInRecord),
    Unchanged,
    /// The id is not on the board; nothing was added.
    Missing,
    Rejected(PatchRejection),
}

/// The board split into its three columns, each in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BoardColumns {
    pub waiting: Vec<CheckInRecord>,
    pub started: Vec<CheckInRecord>,
    pub finished: Vec<CheckInRecord>,
}

impl BoardColumns {
    pub fn column(&self, status: Status) -> &[CheckInRecord] {
        match status {
            Status::Waiting => &self.waiting,
            Status::Started => &self.started,
            Status::Finished => &self.finished,
        }
    }

    pub fn len(&self) -> usize {
        self.waiting.len() + self.started.len() + self.finished.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
struct Snapshot {
    records: BTreeMap<CheckInId, CheckInRecord>,
    revision: u64,
}

pub struct StateStore {
    inner: RwLock<Snapshot>,
    events: broadcast::Sender<StoreEvent>,
}

impl fmt::Debug for StateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.read();
        f.debug_struct("StateStore")
            .field("records", &snapshot.records.len())
            .field("revision", &snapshot.revision)
            .finish()
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies `patch` to a copy of `current`, enforcing the record invariants.
fn merge(current: &CheckInRecord, patch: &CheckInPatch) -> Result<CheckInRecord, PatchRejection> {
    let mut next = current.clone();

    if let Some(status) = patch.status {
        if status < current.status {
            return Err(PatchRejection::StatusRegression {
                from: current.status,
                to: status,
            });
        }
        let entering_started = status == Status::Started && current.status != Status::Started;
        if entering_started && patch.groomer.is_none() {
            return Err(PatchRejection::StartedWithoutGroomer);
        }
        next.status = status;
    }

    if let Some(groomer) = &patch.groomer {
        if !next.status.requires_groomer() {
            return Err(PatchRejection::GroomerWhileWaiting);
        }
        next.groomer = Some(groomer.clone());
    }
    if next.status == Status::Finished {
        if next.groomer.is_none() {
            return Err(PatchRejection::FinishedWithoutGroomer);
        }
        // set once, never altered
        if next.finished_at.is_none() {
            next.finished_at = patch.finished_at;
        }
        if next.finished_at.is_none() {
            return Err(PatchRejection::FinishedWithoutTimestamp);
        }
    }

    if let Some(priority) = patch.priority {
        next.priority = priority;
    }
    if let Some(services) = &patch.services {
        next.services = services.clone();
    }
    if let Some(observations) = &patch.observations {
        next.observations = Some(observations.clone());
    }
    if let Some(perfume) = patch.perfume_requested {
        next.perfume_requested = perfume;
    }
    if let Some(decoration) = patch.decoration_requested {
        next.decoration_requested = decoration;
    }
    if let Some(modified) = patch.was_modified {
        next.was_modified = modified;
    }

    Ok(next)
}

impl StateStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: RwLock::new(Snapshot::default()),
            events,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Snapshot> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Snapshot> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: StoreEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    /// Overwrites the whole snapshot with `records`.
    ///
    /// Empty input keeps the previous snapshot so a transient bad fetch does
    /// not blank the board. Duplicate ids keep the last occurrence.
    pub fn replace_all(&self, records: Vec<CheckInRecord>) -> ReplaceOutcome {
        if records.is_empty() {
            debug!("empty snapshot ignored, keeping previous board");
            return ReplaceOutcome::Ignored;
        }

        let fresh: BTreeMap<CheckInId, CheckInRecord> =
            records.into_iter().map(|r| (r.id, r)).collect();
        let count = fresh.len();

        let revision = {
            let mut snapshot = self.write();
            if snapshot.records == fresh {
                return ReplaceOutcome::Unchanged;
            }
            snapshot.records = fresh;
            snapshot.revision += 1;
            snapshot.revision
        };

        info!(count, revision, "board snapshot replaced");
        self.publish(StoreEvent::Replaced { revision, count });
        ReplaceOutcome::Replaced { count }
    }

    /// Merges `patch` into the record with `id`.
    ///
    /// An unknown id is a no-op: a late confirmation for a record that has
    /// left the board must not bring it back.
    pub fn patch(&self, id: CheckInId, patch: &CheckInPatch) -> PatchOutcome {
        let (record, revision) = {
            let mut snapshot = self.write();
            let Some(current) = snapshot.records.get(&id) else {
                debug!(id, "patch for check-in not on the board ignored");
                return PatchOutcome::Missing;
            };

            let next = match merge(current, patch) {
                Ok(next) => next,
                Err(reason) => {
                    warn!(id, %reason, "patch rejected");
                    return PatchOutcome::Rejected(reason);
                }
            };
            if &next == current {
                return PatchOutcome::Unchanged;
            }

            snapshot.records.insert(id, next.clone());
            snapshot.revision += 1;
            (next, snapshot.revision)
        };

        self.publish(StoreEvent::Patched { revision, id });
        PatchOutcome::Applied(record)
    }

    pub fn get(&self, id: CheckInId) -> Option<CheckInRecord> {
        self.read().records.get(&id).cloned()
    }

    /// Owned copy of every record, by id.
    pub fn all(&self) -> Vec<CheckInRecord> {
        self.read().records.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of content changes so far.
    pub fn revision(&self) -> u64 {
        self.read().revision
    }

    /// The board grouped by status, each column in display order.
    pub fn columns(&self) -> BoardColumns {
        let snapshot = self.read();
        let column =
            |status: Status| order(snapshot.records.values().filter(|r| r.status == status));
        BoardColumns {
            waiting: column(Status::Waiting),
            started: column(Status::Started),
            finished: column(Status::Finished),
        }
    }
}
