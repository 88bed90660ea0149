//! Check-in data model: the canonical record, the payload normalizer and the
//! in-column ordering policy.

pub mod normalize;
pub mod ordering;
mod record;

pub use normalize::{normalize_checkin, normalize_checkins, normalize_groomers};
pub use ordering::order;
pub use record::{
    CheckInId, CheckInPatch, CheckInRecord, Groomer, GroomerId, Priority, Status, UnknownStatus,
};
