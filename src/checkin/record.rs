use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a check-in as assigned by the check-in service. Never reused.
pub type CheckInId = i64;

/// Identifier of a groomer in the roster.
pub type GroomerId = i64;

/// The three work stages of a check-in.
///
/// Each check-in flows through: WAITING → STARTED → FINISHED
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Status {
    Waiting,
    Started,
    Finished,
}

impl Status {
    /// All statuses in board column order.
    pub const ALL: [Status; 3] = [Status::Waiting, Status::Started, Status::Finished];

    /// The single status reachable from this one, if any.
    pub fn next(self) -> Option<Status> {
        match self {
            Status::Waiting => Some(Status::Started),
            Status::Started => Some(Status::Finished),
            Status::Finished => None,
        }
    }

    /// Whether `self → target` is one of the sanctioned edges.
    pub fn can_advance_to(self, target: Status) -> bool {
        self.next() == Some(target)
    }

    /// Whether a record in this status must carry a groomer.
    pub fn requires_groomer(self) -> bool {
        matches!(self, Status::Started | Status::Finished)
    }

    /// Column heading used by the board.
    pub fn label(self) -> &'static str {
        match self {
            Status::Waiting => "Waiting",
            Status::Started => "Started",
            Status::Finished => "Finished",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Waiting => write!(f, "WAITING"),
            Status::Started => write!(f, "STARTED"),
            Status::Finished => write!(f, "FINISHED"),
        }
    }
}

/// Error returned when a status name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for Status {
    type Err = UnknownStatus;

    /// Accepts both the service's wire names and the English names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "AGUARDANDO" | "WAITING" => Ok(Status::Waiting),
            "INICIADO" | "STARTED" => Ok(Status::Started),
            "FINALIZADO" | "FINISHED" => Ok(Status::Finished),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// Urgency of a check-in. Drives the ordering within a column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    #[default]
    Normal,
}

impl Priority {
    /// Sort rank, lower sorts first.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Normal => 2,
        }
    }

    /// Lenient parse; anything unrecognised is `Normal`.
    pub fn parse_lenient(s: &str) -> Priority {
        match s.trim().to_uppercase().as_str() {
            "ALTA" | "HIGH" => Priority::High,
            "MEDIA" | "MÉDIA" | "MEDIUM" => Priority::Medium,
            _ => Priority::Normal,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "HIGH"),
            Priority::Medium => write!(f, "MEDIUM"),
            Priority::Normal => write!(f, "NORMAL"),
        }
    }
}

/// A staff member who can be assigned to a check-in.
///
/// Roster entries always carry an id. A groomer attached to a listed
/// check-in is usually known by name only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Groomer {
    pub id: Option<GroomerId>,
    pub name: String,
}

impl Groomer {
    pub fn new(id: GroomerId, name: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
        }
    }

    /// A groomer known only by name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    /// The id when known, the name otherwise.
    pub fn label(&self) -> String {
        match self.id {
            Some(id) => id.to_string(),
            None => self.name.clone(),
        }
    }
}

/// Canonical in-memory shape of one check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInRecord {
    pub id: CheckInId,
    pub pet_name: String,
    pub tutor_name: String,
    pub breed_name: String,
    pub status: Status,
    pub priority: Priority,
    pub groomer: Option<Groomer>,
    pub services: Vec<String>,
    pub observations: Option<String>,
    pub perfume_requested: bool,
    pub decoration_requested: bool,
    pub was_modified: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl CheckInRecord {
    /// A fresh WAITING check-in with every optional field at its default.
    pub fn new(id: CheckInId, pet_name: impl Into<String>) -> Self {
        Self {
            id,
            pet_name: pet_name.into(),
            tutor_name: String::new(),
            breed_name: String::new(),
            status: Status::Waiting,
            priority: Priority::Normal,
            groomer: None,
            services: Vec::new(),
            observations: None,
            perfume_requested: true,
            decoration_requested: true,
            was_modified: false,
            created_at: None,
            finished_at: None,
        }
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_groomer(mut self, groomer: Groomer) -> Self {
        self.groomer = Some(groomer);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// True when the record satisfies the groomer and finish-time invariants.
    pub fn is_consistent(&self) -> bool {
        self.status.requires_groomer() == self.groomer.is_some()
            && (self.status == Status::Finished) == self.finished_at.is_some()
    }
}

/// Partial update applied to a stored record.
///
/// `None` leaves the field untouched. `created_at` is deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckInPatch {
    pub status: Option<Status>,
    pub groomer: Option<Groomer>,
    pub finished_at: Option<DateTime<Utc>>,
    pub priority: Option<Priority>,
    pub services: Option<Vec<String>>,
    pub observations: Option<String>,
    pub perfume_requested: Option<bool>,
    pub decoration_requested: Option<bool>,
    pub was_modified: Option<bool>,
}

impl CheckInPatch {
    /// The fields a server-confirmed record is authoritative for.
    pub fn confirmed(record: &CheckInRecord) -> Self {
        Self {
            status: Some(record.status),
            groomer: record.groomer.clone(),
            finished_at: record.finished_at,
            priority: Some(record.priority),
            services: Some(record.services.clone()),
            observations: record.observations.clone(),
            perfume_requested: Some(record.perfume_requested),
            decoration_requested: Some(record.decoration_requested),
            was_modified: Some(record.was_modified),
        }
    }
}
