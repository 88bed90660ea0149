//! User-visible failure notifications.
//!
//! Failed fetches raise a single banner that stays until a fetch succeeds.
//! Failed transitions raise dismissible alerts, one per failure.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

/// Identifier of a dismissible alert.
pub type NoticeId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: NoticeId,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct NoticeState {
    banner: Option<String>,
    alerts: Vec<Notice>,
}

#[derive(Debug, Default)]
pub struct Notices {
    state: Mutex<NoticeState>,
}

impl Notices {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, NoticeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Raises a dismissible alert and returns its id.
    pub fn alert(&self, message: impl Into<String>) -> NoticeId {
        let notice = Notice {
            id: Uuid::new_v4(),
            message: message.into(),
            raised_at: Utc::now(),
        };
        warn!(message = %notice.message, "alert raised");
        let id = notice.id;
        self.lock().alerts.push(notice);
        id
    }

    /// Removes an alert. Returns `false` if it was already gone.
    pub fn dismiss(&self, id: NoticeId) -> bool {
        let mut state = self.lock();
        let before = state.alerts.len();
        state.alerts.retain(|n| n.id != id);
        state.alerts.len() != before
    }

    /// Snapshot of the outstanding alerts, oldest first.
    pub fn alerts(&self) -> Vec<Notice> {
        self.lock().alerts.clone()
    }

    pub fn set_banner(&self, message: impl Into<String>) {
        self.lock().banner = Some(message.into());
    }

    pub fn clear_banner(&self) {
        self.lock().banner = None;
    }

    pub fn banner(&self) -> Option<String> {
        self.lock().banner.clone()
    }
}
