use std::sync::Arc;

use tracing::debug;

use super::engine::{IgnoreReason, TransitionEngine, TransitionOutcome, TransitionRequest};
use crate::checkin::{CheckInId, Status};
use crate::error::Result;

/// A card released over a column. Columns map one-to-one onto statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropGesture {
    pub id: CheckInId,
    pub from: Status,
    pub to: Status,
}

impl DropGesture {
    pub fn new(id: CheckInId, from: Status, to: Status) -> Self {
        Self { id, from, to }
    }

    /// The transition this gesture asks for, or `None` for a drop back onto
    /// the same column. Order inside a column is not user-controlled.
    pub fn to_request(self) -> Option<TransitionRequest> {
        (self.from != self.to).then(|| TransitionRequest::new(self.id, self.to))
    }
}

/// Turns drop gestures into transition requests.
#[derive(Debug, Clone)]
pub struct DragDropController {
    engine: Arc<TransitionEngine>,
}

impl DragDropController {
    pub fn new(engine: Arc<TransitionEngine>) -> Self {
        Self { engine }
    }

    /// Issues at most one transition request for `gesture`.
    pub async fn drop_card(&self, gesture: DropGesture) -> Result<TransitionOutcome> {
        match gesture.to_request() {
            Some(request) => self.engine.request_transition(request).await,
            None => {
                debug!(id = gesture.id, "same-column drop ignored");
                Ok(TransitionOutcome::Ignored(IgnoreReason::SameColumn))
            }
        }
    }

    /// Drops the card onto `to`, taking its source column from the store.
    pub async fn move_card(&self, id: CheckInId, to: Status) -> Result<TransitionOutcome> {
        let Some(record) = self.engine.store().get(id) else {
            return Ok(TransitionOutcome::Ignored(IgnoreReason::UnknownCheckIn));
        };
        self.drop_card(DropGesture::new(id, record.status, to)).await
    }
}
