use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::gate::{GateDecision, GroomerAssignmentGate};
use super::notices::Notices;
use super::store::{PatchOutcome, StateStore};
use crate::api::CheckInService;
use crate::checkin::{CheckInId, CheckInPatch, CheckInRecord, Groomer, Status};
use crate::error::{BoardError, Result};

/// A request to move one check-in to another stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    pub id: CheckInId,
    pub target: Status,
    /// Groomer chosen up front; when absent a start goes through the gate.
    pub groomer: Option<Groomer>,
}

impl TransitionRequest {
    pub fn new(id: CheckInId, target: Status) -> Self {
        Self {
            id,
            target,
            groomer: None,
        }
    }

    pub fn with_groomer(mut self, groomer: Groomer) -> Self {
        self.groomer = Some(groomer);
        self
    }
}

/// Why a request was ignored. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The check-in is not on the board.
    UnknownCheckIn,
    /// `from → to` is not a sanctioned edge.
    InvalidEdge { from: Status, to: Status },
    /// Source and destination column are the same.
    SameColumn,
    /// The record moved on while the gate was open.
    Stale { now: Status },
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::UnknownCheckIn => write!(f, "check-in is not on the board"),
            IgnoreReason::InvalidEdge { from, to } => {
                write!(f, "no transition from {from} to {to}")
            }
            IgnoreReason::SameColumn => write!(f, "card dropped on its own column"),
            IgnoreReason::Stale { now } => write!(f, "check-in is already {now}"),
        }
    }
}

/// Result of a transition request that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The service confirmed the change and the store was patched.
    Applied(CheckInRecord),
    /// Nothing happened.
    Ignored(IgnoreReason),
    /// The groomer gate was cancelled; nothing happened.
    Cancelled,
}

impl TransitionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied(_))
    }
}

/// Validates and executes stage changes.
///
/// No local state is touched before the service confirms: a card stays in
/// its column until the call resolves, and on failure it stays put.
pub struct TransitionEngine {
    service: Arc<dyn CheckInService>,
    store: Arc<StateStore>,
    notices: Arc<Notices>,
    gate: GroomerAssignmentGate,
}

impl fmt::Debug for TransitionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionEngine")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl TransitionEngine {
    pub fn new(
        service: Arc<dyn CheckInService>,
        store: Arc<StateStore>,
        notices: Arc<Notices>,
        gate: GroomerAssignmentGate,
    ) -> Self {
        Self {
            service,
            store,
            notices,
            gate,
        }
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// Executes `request`.
    ///
    /// Invalid edges and unknown ids are ignored. Service failures are raised
    /// as an alert and returned as `Err`; the store is left untouched.
    pub async fn request_transition(
        &self,
        request: TransitionRequest,
    ) -> Result<TransitionOutcome> {
        let result = self.execute(request).await;
        if let Err(e) = &result {
            self.notices.alert(e.user_message());
        }
        result
    }

    /// Reopens the gate for a WAITING check-in.
    ///
    /// Starting is the only operation that attaches a groomer, so a
    /// confirmed choice goes through the same path as a drag to Started.
    pub async fn assign_groomer(&self, id: CheckInId) -> Result<TransitionOutcome> {
        self.request_transition(TransitionRequest::new(id, Status::Started))
            .await
    }

    async fn execute(&self, request: TransitionRequest) -> Result<TransitionOutcome> {
        let Some(record) = self.store.get(request.id) else {
            debug!(id = request.id, "transition for unknown check-in ignored");
            return Ok(TransitionOutcome::Ignored(IgnoreReason::UnknownCheckIn));
        };

        if !record.status.can_advance_to(request.target) {
            let reason = IgnoreReason::InvalidEdge {
                from: record.status,
                to: request.target,
            };
            debug!(id = record.id, %reason, "transition ignored");
            return Ok(TransitionOutcome::Ignored(reason));
        }

        match request.target {
            Status::Started => self.start(record, request.groomer).await,
            Status::Finished => self.finish(record).await,
            // WAITING is never a valid target
            Status::Waiting => Ok(TransitionOutcome::Ignored(IgnoreReason::InvalidEdge {
                from: record.status,
                to: request.target,
            })),
        }
    }

    async fn start(
        &self,
        record: CheckInRecord,
        groomer: Option<Groomer>,
    ) -> Result<TransitionOutcome> {
        let groomer = match groomer {
            Some(g) => g,
            None => match self.gate.open(&record).await? {
                GateDecision::Selected(g) => g,
                GateDecision::Cancelled => return Ok(TransitionOutcome::Cancelled),
            },
        };

        // the board may have been reconciled while the gate was open
        match self.store.get(record.id) {
            None => return Ok(TransitionOutcome::Ignored(IgnoreReason::UnknownCheckIn)),
            Some(current) if current.status != Status::Waiting => {
                return Ok(TransitionOutcome::Ignored(IgnoreReason::Stale {
                    now: current.status,
                }));
            }
            Some(_) => {}
        }

        let Some(groomer_id) = groomer.id else {
            return Err(BoardError::UnknownGroomer(groomer.label()));
        };
        let mut confirmed = self
            .service
            .start_check_in(record.id, groomer_id)
            .await
            .inspect_err(|e| warn!(id = record.id, error = %e, "start failed"))?;
        if confirmed.groomer.is_none() {
            confirmed.groomer = Some(groomer);
        }
        self.commit(record.id, confirmed)
    }

    async fn finish(&self, record: CheckInRecord) -> Result<TransitionOutcome> {
        let requested_at = Utc::now();
        let mut confirmed = self
            .service
            .finish_check_in(record.id)
            .await
            .inspect_err(|e| warn!(id = record.id, error = %e, "finish failed"))?;
        if confirmed.finished_at.is_none() {
            confirmed.finished_at = Some(requested_at);
        }
        if confirmed.groomer.is_none() {
            confirmed.groomer = record.groomer;
        }
        self.commit(record.id, confirmed)
    }

    /// Patches the store with the service's confirmed record.
    ///
    /// A refused patch is an error: the service has already moved on.
    fn commit(&self, id: CheckInId, confirmed: CheckInRecord) -> Result<TransitionOutcome> {
        match self.store.patch(id, &CheckInPatch::confirmed(&confirmed)) {
            PatchOutcome::Applied(record) => {
                info!(id, status = %record.status, "transition confirmed");
                Ok(TransitionOutcome::Applied(record))
            }
            PatchOutcome::Unchanged => Ok(TransitionOutcome::Applied(
                self.store.get(id).unwrap_or(confirmed),
            )),
            PatchOutcome::Missing => Ok(TransitionOutcome::Ignored(IgnoreReason::UnknownCheckIn)),
            PatchOutcome::Rejected(reason) => {
                warn!(id, %reason, "service confirmation rejected by store");
                Err(BoardError::ConfirmationRejected { id, reason })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::gate::GroomerPrompt;
    use crate::board::store::{PatchRejection, ReplaceOutcome};
    use crate::checkin::{Priority, normalize_checkin};
    use serde_json::json;
    use crate::test_support::{Call, FixedPrompt, MockService, service};

    fn ana() -> Groomer {
        Groomer::new(9, "Ana")
    }

    struct Harness {
        service: Arc<MockService>,
        store: Arc<StateStore>,
        notices: Arc<Notices>,
        engine: TransitionEngine,
    }

    fn harness(records: Vec<CheckInRecord>, prompt: Arc<dyn GroomerPrompt>) -> Harness {
        harness_with(service(records, vec![ana(), Groomer::new(10, "Bia")]), prompt)
    }

    fn harness_with(service: Arc<MockService>, prompt: Arc<dyn GroomerPrompt>) -> Harness {
        let store = Arc::new(StateStore::new());
        assert!(matches!(
            store.replace_all(service.snapshot()),
            ReplaceOutcome::Replaced { .. }
        ));
        let notices = Arc::new(Notices::new());
        let gate = GroomerAssignmentGate::new(service.clone(), prompt);
        let engine = TransitionEngine::new(service.clone(), store.clone(), notices.clone(), gate);
        Harness {
            service,
            store,
            notices,
            engine,
        }
    }

    fn started(id: CheckInId) -> CheckInRecord {
        CheckInRecord::new(id, "Luna")
            .with_status(Status::Started)
            .with_groomer(ana())
    }

    #[tokio::test]
    async fn drag_to_started_with_gate_selection() {
        let prompt = Arc::new(FixedPrompt::select(ana()));
        let h = harness(
            vec![CheckInRecord::new(1, "Thor").with_priority(Priority::High)],
            prompt.clone(),
        );

        let outcome = h
            .engine
            .request_transition(TransitionRequest::new(1, Status::Started))
            .await
            .unwrap();

        assert!(outcome.is_applied());
        assert!(h.service.calls().contains(&Call::Start(1, 9)));
        let record = h.store.get(1).unwrap();
        assert_eq!(record.status, Status::Started);
        assert_eq!(record.groomer.as_ref().map(|g| g.name.as_str()), Some("Ana"));
        assert_eq!(prompt.requests().len(), 1);
    }

    #[tokio::test]
    async fn supplied_groomer_skips_the_gate() {
        let prompt = Arc::new(FixedPrompt::cancel());
        let h = harness(vec![CheckInRecord::new(1, "Thor")], prompt.clone());

        let outcome = h
            .engine
            .request_transition(TransitionRequest::new(1, Status::Started).with_groomer(ana()))
            .await
            .unwrap();

        assert!(outcome.is_applied());
        assert!(prompt.requests().is_empty());
        assert_eq!(h.service.count(|c| matches!(c, Call::ListGroomers)), 0);
    }

    #[tokio::test]
    async fn cancelled_gate_changes_nothing() {
        let h = harness(vec![CheckInRecord::new(1, "Thor")], Arc::new(FixedPrompt::cancel()));
        let before = h.store.revision();

        let outcome = h
            .engine
            .request_transition(TransitionRequest::new(1, Status::Started))
            .await
            .unwrap();

        assert_eq!(outcome, TransitionOutcome::Cancelled);
        assert_eq!(h.store.revision(), before);
        assert_eq!(h.store.get(1).unwrap().status, Status::Waiting);
        assert_eq!(h.service.count(|c| matches!(c, Call::Start(..))), 0);
    }

    #[tokio::test]
    async fn started_back_to_waiting_is_ignored() {
        let h = harness(vec![started(2)], Arc::new(FixedPrompt::cancel()));

        let outcome = h
            .engine
            .request_transition(TransitionRequest::new(2, Status::Waiting))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            TransitionOutcome::Ignored(IgnoreReason::InvalidEdge {
                from: Status::Started,
                to: Status::Waiting
            })
        );
        assert_eq!(h.store.get(2).unwrap().status, Status::Started);
        assert!(h.service.calls().is_empty());
        assert!(h.notices.alerts().is_empty());
    }

    #[tokio::test]
    async fn waiting_straight_to_finished_is_ignored() {
        let h = harness(vec![CheckInRecord::new(1, "Thor")], Arc::new(FixedPrompt::select(ana())));

        let outcome = h
            .engine
            .request_transition(TransitionRequest::new(1, Status::Finished))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            TransitionOutcome::Ignored(IgnoreReason::InvalidEdge { .. })
        ));
        assert_eq!(h.store.get(1).unwrap().status, Status::Waiting);
        assert!(h.service.calls().is_empty());
    }

    #[tokio::test]
    async fn finished_never_moves_again() {
        let finished = CheckInRecord {
            finished_at: Some(Utc::now()),
            ..started(3).with_status(Status::Finished)
        };
        let h = harness(vec![finished], Arc::new(FixedPrompt::select(ana())));

        for target in Status::ALL {
            let outcome = h
                .engine
                .request_transition(TransitionRequest::new(3, target))
                .await
                .unwrap();
            assert!(matches!(outcome, TransitionOutcome::Ignored(_)));
        }
        assert_eq!(h.store.get(3).unwrap().status, Status::Finished);
    }

    #[tokio::test]
    async fn unknown_id_is_ignored() {
        let h = harness(vec![CheckInRecord::new(1, "Thor")], Arc::new(FixedPrompt::cancel()));
        let outcome = h
            .engine
            .request_transition(TransitionRequest::new(99, Status::Started))
            .await
            .unwrap();
        assert_eq!(outcome, TransitionOutcome::Ignored(IgnoreReason::UnknownCheckIn));
    }

    #[tokio::test]
    async fn network_failure_on_start_leaves_record_untouched() {
        let h = harness(vec![CheckInRecord::new(1, "Thor")], Arc::new(FixedPrompt::select(ana())));
        h.service.set_fail_start(true);
        let before = h.store.get(1).unwrap();

        let err = h
            .engine
            .request_transition(TransitionRequest::new(1, Status::Started))
            .await
            .unwrap_err();

        assert!(matches!(err, BoardError::Api(ref e) if e.is_transport()));
        let after = h.store.get(1).unwrap();
        assert_eq!(after, before);
        assert_eq!(after.status, Status::Waiting);
        assert!(after.groomer.is_none());
        assert!(after.finished_at.is_none());
        assert_eq!(h.notices.alerts().len(), 1);
    }

    #[tokio::test]
    async fn finish_sets_finished_at() {
        let h = harness(vec![started(2)], Arc::new(FixedPrompt::cancel()));

        let outcome = h
            .engine
            .request_transition(TransitionRequest::new(2, Status::Finished))
            .await
            .unwrap();

        let TransitionOutcome::Applied(record) = outcome else {
            panic!("expected finish to apply");
        };
        assert_eq!(record.status, Status::Finished);
        assert!(record.finished_at.is_some());
        assert_eq!(record.groomer, Some(ana()));
        assert!(h.service.calls().contains(&Call::Finish(2)));
    }

    #[tokio::test]
    async fn finish_card_whose_groomer_is_known_by_name_only() {
        let polled = normalize_checkin(&json!({
            "idCheckin": 2,
            "status": "INICIADO",
            "groomerNome": "Ana"
        }))
        .unwrap();
        let h = harness(vec![polled], Arc::new(FixedPrompt::cancel()));

        let outcome = h
            .engine
            .request_transition(TransitionRequest::new(2, Status::Finished))
            .await
            .unwrap();

        assert!(outcome.is_applied());
        let record = h.store.get(2).unwrap();
        assert_eq!(record.status, Status::Finished);
        assert_eq!(record.groomer, Some(Groomer::named("Ana")));
        assert!(record.finished_at.is_some());
        assert!(h.notices.alerts().is_empty());
    }

    #[tokio::test]
    async fn refused_finish_confirmation_is_an_error() {
        // a STARTED record the service listed without any groomer
        let orphan = CheckInRecord::new(2, "Luna").with_status(Status::Started);
        let h = harness(vec![orphan], Arc::new(FixedPrompt::cancel()));

        let err = h
            .engine
            .request_transition(TransitionRequest::new(2, Status::Finished))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BoardError::ConfirmationRejected {
                id: 2,
                reason: PatchRejection::FinishedWithoutGroomer
            }
        ));
        assert!(h.service.calls().contains(&Call::Finish(2)));
        assert_eq!(h.store.get(2).unwrap().status, Status::Started);
        assert_eq!(h.notices.alerts().len(), 1);
    }

    #[tokio::test]
    async fn start_confirmed_as_waiting_is_an_error() {
        let h = harness(vec![CheckInRecord::new(1, "Thor")], Arc::new(FixedPrompt::cancel()));
        h.service.confirm_start_as(Status::Waiting);

        let err = h
            .engine
            .request_transition(TransitionRequest::new(1, Status::Started).with_groomer(ana()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BoardError::ConfirmationRejected {
                reason: PatchRejection::GroomerWhileWaiting,
                ..
            }
        ));
        assert_eq!(h.store.get(1).unwrap().groomer, None);
        assert_eq!(h.notices.alerts().len(), 1);
    }

    #[tokio::test]
    async fn name_only_groomer_cannot_start() {
        let h = harness(vec![CheckInRecord::new(1, "Thor")], Arc::new(FixedPrompt::cancel()));

        let err = h
            .engine
            .request_transition(
                TransitionRequest::new(1, Status::Started).with_groomer(Groomer::named("Ana")),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, BoardError::UnknownGroomer(ref g) if g == "Ana"));
        assert_eq!(h.service.count(|c| matches!(c, Call::Start(..))), 0);
    }

    #[tokio::test]
    async fn failed_finish_raises_alert_and_keeps_started() {
        let h = harness(vec![started(2)], Arc::new(FixedPrompt::cancel()));
        h.service.set_fail_finish(true);

        let result = h
            .engine
            .request_transition(TransitionRequest::new(2, Status::Finished))
            .await;

        assert!(result.is_err());
        let record = h.store.get(2).unwrap();
        assert_eq!(record.status, Status::Started);
        assert!(record.finished_at.is_none());
        assert_eq!(h.notices.alerts().len(), 1);
    }

    #[tokio::test]
    async fn service_rejection_is_surfaced() {
        let h = harness(vec![CheckInRecord::new(1, "Thor")], Arc::new(FixedPrompt::cancel()));

        let err = h
            .engine
            .request_transition(
                TransitionRequest::new(1, Status::Started).with_groomer(Groomer::new(55, "Nobody")),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, BoardError::Api(_)));
        assert_eq!(h.notices.alerts()[0].message, "Groomer não encontrado");
        assert_eq!(h.store.get(1).unwrap().status, Status::Waiting);
    }

    #[tokio::test]
    async fn confirmation_without_groomer_keeps_chosen_one() {
        let service = Arc::new(
            MockService::new()
                .with_records(vec![CheckInRecord::new(1, "Thor")])
                .with_roster(vec![ana()])
                .omitting_groomer_on_start(),
        );
        let h = harness_with(service, Arc::new(FixedPrompt::select(ana())));

        h.engine
            .request_transition(TransitionRequest::new(1, Status::Started))
            .await
            .unwrap();

        let record = h.store.get(1).unwrap();
        assert_eq!(record.status, Status::Started);
        assert_eq!(record.groomer, Some(ana()));
    }

    #[tokio::test]
    async fn record_moved_while_gate_open_is_stale() {
        let store_slot: Arc<std::sync::OnceLock<Arc<StateStore>>> = Arc::default();
        let slot = store_slot.clone();
        let prompt = FixedPrompt::select(ana()).with_hook(move || {
            if let Some(store) = slot.get() {
                // another client started it meanwhile
                store.replace_all(vec![started(1)]);
            }
        });
        let h = harness(vec![CheckInRecord::new(1, "Thor")], Arc::new(prompt));
        let _ = store_slot.set(h.store.clone());

        let outcome = h
            .engine
            .request_transition(TransitionRequest::new(1, Status::Started))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            TransitionOutcome::Ignored(IgnoreReason::Stale {
                now: Status::Started
            })
        );
        assert_eq!(h.service.count(|c| matches!(c, Call::Start(..))), 0);
    }

    #[tokio::test]
    async fn assign_groomer_goes_through_gate() {
        let prompt = Arc::new(FixedPrompt::select(Groomer::new(10, "Bia")));
        let h = harness(vec![CheckInRecord::new(1, "Thor")], prompt.clone());

        let outcome = h.engine.assign_groomer(1).await.unwrap();

        assert!(outcome.is_applied());
        assert_eq!(prompt.requests().len(), 1);
        assert_eq!(h.store.get(1).unwrap().groomer, Some(Groomer::new(10, "Bia")));
    }

    #[tokio::test]
    async fn stale_reconciliation_then_confirmation_converges() {
        let h = harness(vec![CheckInRecord::new(1, "Thor")], Arc::new(FixedPrompt::cancel()));

        h.engine
            .request_transition(TransitionRequest::new(1, Status::Started).with_groomer(ana()))
            .await
            .unwrap();

        // a poll issued before the start landed arrives late with the old state
        h.store.replace_all(vec![CheckInRecord::new(1, "Thor")]);
        assert_eq!(h.store.get(1).unwrap().status, Status::Waiting);

        // the next poll carries server truth again
        h.store.replace_all(h.service.snapshot());
        assert_eq!(h.store.get(1).unwrap().status, Status::Started);
    }
}
