//! Test doubles shared by the board tests.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use crate::api::{ApiError, CheckInService};
use crate::board::gate::{AssignmentRequest, GateDecision, GroomerPrompt};
use crate::checkin::{CheckInId, CheckInRecord, Groomer, GroomerId, Status};

/// A genuine transport error without touching the network.
pub fn transport_error() -> ApiError {
    let err = reqwest::Client::new()
        .get("not a url")
        .build()
        .expect_err("invalid url must fail to build");
    ApiError::Transport(err)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListToday,
    ListByDate(NaiveDate),
    ListGroomers,
    Start(CheckInId, GroomerId),
    Finish(CheckInId),
}

#[derive(Debug, Default)]
struct ServiceState {
    records: Vec<CheckInRecord>,
    roster: Vec<Groomer>,
    calls: Vec<Call>,
    fail_list: bool,
    fail_roster: bool,
    fail_start: bool,
    fail_finish: bool,
    omit_groomer_on_start: bool,
    start_status: Option<Status>,
}

/// In-memory check-in service that behaves like the real one: start and
/// finish move its own copy of the record forward and return it.
#[derive(Debug, Default)]
pub struct MockService {
    state: Mutex<ServiceState>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ServiceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_records(self, records: Vec<CheckInRecord>) -> Self {
        self.lock().records = records;
        self
    }

    pub fn with_roster(self, roster: Vec<Groomer>) -> Self {
        self.lock().roster = roster;
        self
    }

    pub fn failing_roster(self) -> Self {
        self.lock().fail_roster = true;
        self
    }

    pub fn omitting_groomer_on_start(self) -> Self {
        self.lock().omit_groomer_on_start = true;
        self
    }

    pub fn set_records(&self, records: Vec<CheckInRecord>) {
        self.lock().records = records;
    }

    /// Makes start confirmations report `status` instead of STARTED.
    pub fn confirm_start_as(&self, status: Status) {
        self.lock().start_status = Some(status);
    }

    pub fn set_fail_list(&self, fail: bool) {
        self.lock().fail_list = fail;
    }

    pub fn set_fail_start(&self, fail: bool) {
        self.lock().fail_start = fail;
    }

    pub fn set_fail_finish(&self, fail: bool) {
        self.lock().fail_finish = fail;
    }

    /// The service's current records, without recording a call.
    pub fn snapshot(&self) -> Vec<CheckInRecord> {
        self.lock().records.clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn count(&self, wanted: fn(&Call) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| wanted(c)).count()
    }
}

#[async_trait]
impl CheckInService for MockService {
    async fn list_today(&self) -> Result<Vec<CheckInRecord>, ApiError> {
        let mut state = self.lock();
        state.calls.push(Call::ListToday);
        if state.fail_list {
            return Err(transport_error());
        }
        Ok(state.records.clone())
    }

    async fn list_by_date(&self, date: NaiveDate) -> Result<Vec<CheckInRecord>, ApiError> {
        let mut state = self.lock();
        state.calls.push(Call::ListByDate(date));
        Ok(state.records.clone())
    }

    async fn list_groomers(&self) -> Result<Vec<Groomer>, ApiError> {
        let mut state = self.lock();
        state.calls.push(Call::ListGroomers);
        if state.fail_roster {
            return Err(transport_error());
        }
        Ok(state.roster.clone())
    }

    async fn start_check_in(
        &self,
        id: CheckInId,
        groomer_id: GroomerId,
    ) -> Result<CheckInRecord, ApiError> {
        let mut state = self.lock();
        state.calls.push(Call::Start(id, groomer_id));
        if state.fail_start {
            return Err(transport_error());
        }
        let groomer = state
            .roster
            .iter()
            .find(|g| g.id == Some(groomer_id))
            .cloned()
            .ok_or_else(|| ApiError::Rejected {
                status: 400,
                message: "Groomer não encontrado".into(),
            })?;
        let omit = state.omit_groomer_on_start;
        let reported = state.start_status;
        let record = state
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ApiError::Rejected {
                status: 404,
                message: "Check-in não encontrado".into(),
            })?;
        record.status = Status::Started;
        record.groomer = Some(groomer);
        let mut confirmed = record.clone();
        if omit {
            confirmed.groomer = None;
        }
        if let Some(status) = reported {
            confirmed.status = status;
        }
        Ok(confirmed)
    }

    async fn finish_check_in(&self, id: CheckInId) -> Result<CheckInRecord, ApiError> {
        let mut state = self.lock();
        state.calls.push(Call::Finish(id));
        if state.fail_finish {
            return Err(transport_error());
        }
        let record = state
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ApiError::Rejected {
                status: 404,
                message: "Check-in não encontrado".into(),
            })?;
        record.status = Status::Finished;
        record.finished_at = Some(Utc::now());
        Ok(record.clone())
    }
}

type Hook = Box<dyn Fn() + Send + Sync>;

/// Prompt that always gives the same answer, optionally running a hook
/// first to simulate something happening while the human decides.
pub struct FixedPrompt {
    decision: GateDecision,
    hook: Option<Hook>,
    seen: Mutex<Vec<AssignmentRequest>>,
}

impl FixedPrompt {
    pub fn select(groomer: Groomer) -> Self {
        Self {
            decision: GateDecision::Selected(groomer),
            hook: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn cancel() -> Self {
        Self {
            decision: GateDecision::Cancelled,
            hook: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn requests(&self) -> Vec<AssignmentRequest> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl GroomerPrompt for FixedPrompt {
    async fn choose(&self, request: AssignmentRequest) -> GateDecision {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        if let Some(hook) = &self.hook {
            hook();
        }
        self.decision.clone()
    }
}

/// Shorthand for the common `Arc<MockService>` setup.
pub fn service(records: Vec<CheckInRecord>, roster: Vec<Groomer>) -> Arc<MockService> {
    Arc::new(MockService::new().with_records(records).with_roster(roster))
}
