//! Groomer assignment gate.
//!
//! Starting a check-in needs a groomer, and picking one is a human decision.
//! The gate fetches the current roster, hands it to a [`GroomerPrompt`] and
//! suspends until the prompt answers with a selection or a cancellation.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::api::CheckInService;
use crate::checkin::{CheckInId, CheckInRecord, Groomer};
use crate::error::{BoardError, Result};

/// What the prompt is asked to decide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentRequest {
    pub check_in: CheckInId,
    pub pet_name: String,
    pub current: Option<Groomer>,
    pub roster: Vec<Groomer>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Selected(Groomer),
    Cancelled,
}

/// The human side of the gate. May wait indefinitely.
#[async_trait]
pub trait GroomerPrompt: Send + Sync {
    async fn choose(&self, request: AssignmentRequest) -> GateDecision;
}

/// A request waiting for an answer from whoever owns the receiving end.
#[derive(Debug)]
pub struct PendingAssignment {
    pub request: AssignmentRequest,
    reply: oneshot::Sender<GateDecision>,
}

impl PendingAssignment {
    pub fn select(self, groomer: Groomer) {
        let _ = self.reply.send(GateDecision::Selected(groomer));
    }

    pub fn cancel(self) {
        let _ = self.reply.send(GateDecision::Cancelled);
    }
}

/// Forwards requests over a channel; a dropped request counts as cancelled.
#[derive(Debug, Clone)]
pub struct ChannelPrompt {
    requests: mpsc::Sender<PendingAssignment>,
}

impl ChannelPrompt {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<PendingAssignment>) {
        let (requests, rx) = mpsc::channel(buffer);
        (Self { requests }, rx)
    }
}

#[async_trait]
impl GroomerPrompt for ChannelPrompt {
    async fn choose(&self, request: AssignmentRequest) -> GateDecision {
        let (reply, answer) = oneshot::channel();
        if self
            .requests
            .send(PendingAssignment { request, reply })
            .await
            .is_err()
        {
            debug!("no one is listening for groomer prompts");
            return GateDecision::Cancelled;
        }
        answer.await.unwrap_or(GateDecision::Cancelled)
    }
}

pub struct GroomerAssignmentGate {
    service: Arc<dyn CheckInService>,
    prompt: Arc<dyn GroomerPrompt>,
}

impl std::fmt::Debug for GroomerAssignmentGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroomerAssignmentGate").finish_non_exhaustive()
    }
}

impl GroomerAssignmentGate {
    pub fn new(service: Arc<dyn CheckInService>, prompt: Arc<dyn GroomerPrompt>) -> Self {
        Self { service, prompt }
    }

    /// Presents the roster for `record` and waits for the decision.
    ///
    /// The roster is fetched fresh on every opening. A selection that is not
    /// in that roster is refused.
    pub async fn open(&self, record: &CheckInRecord) -> Result<GateDecision> {
        let roster = self.service.list_groomers().await?;
        debug!(id = record.id, groomers = roster.len(), "groomer gate opened");

        let request = AssignmentRequest {
            check_in: record.id,
            pet_name: record.pet_name.clone(),
            current: record.groomer.clone(),
            roster: roster.clone(),
        };

        match self.prompt.choose(request).await {
            GateDecision::Selected(choice) => {
                let known = choice
                    .id
                    .and_then(|id| roster.into_iter().find(|g| g.id == Some(id)));
                let Some(groomer) = known else {
                    return Err(BoardError::UnknownGroomer(choice.label()));
                };
                info!(id = record.id, groomer = %groomer.name, "groomer selected");
                Ok(GateDecision::Selected(groomer))
            }
            GateDecision::Cancelled => {
                debug!(id = record.id, "groomer gate cancelled");
                Ok(GateDecision::Cancelled)
            }
        }
    }
}
