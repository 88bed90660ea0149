//! The check-in workflow engine behind the board.

pub mod dragdrop;
pub mod engine;
pub mod gate;
pub mod notices;
pub mod store;
pub mod sync;

pub use dragdrop::{DragDropController, DropGesture};
pub use engine::{IgnoreReason, TransitionEngine, TransitionOutcome, TransitionRequest};
pub use gate::{
    AssignmentRequest, ChannelPrompt, GateDecision, GroomerAssignmentGate, GroomerPrompt,
    PendingAssignment,
};
pub use notices::{Notice, NoticeId, Notices};
pub use store::{
    BoardColumns, PatchOutcome, PatchRejection, ReplaceOutcome, StateStore, StoreEvent,
};
pub use sync::{FetchMode, SyncHandle, SyncScheduler, SyncState};

use std::sync::Arc;
use std::time::Duration;

use crate::api::CheckInService;

/// The engine's components wired together around one store.
#[derive(Debug, Clone)]
pub struct Board {
    pub store: Arc<StateStore>,
    pub notices: Arc<Notices>,
    pub engine: Arc<TransitionEngine>,
    pub dragdrop: DragDropController,
    pub sync: Arc<SyncScheduler>,
}

impl Board {
    pub fn new(
        service: Arc<dyn CheckInService>,
        prompt: Arc<dyn GroomerPrompt>,
        poll_interval: Duration,
    ) -> Self {
        let store = Arc::new(StateStore::new());
        let notices = Arc::new(Notices::new());
        let gate = GroomerAssignmentGate::new(service.clone(), prompt);
        let engine = Arc::new(TransitionEngine::new(
            service.clone(),
            store.clone(),
            notices.clone(),
            gate,
        ));
        let sync = Arc::new(SyncScheduler::new(
            service,
            store.clone(),
            notices.clone(),
            poll_interval,
        ));
        Self {
            dragdrop: DragDropController::new(engine.clone()),
            store,
            notices,
            engine,
            sync,
        }
    }
}
