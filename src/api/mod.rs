//! Boundary to the external check-in service.

pub mod client;
pub mod error;
pub mod types;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::checkin::{CheckInId, CheckInRecord, Groomer, GroomerId};

pub use client::HttpCheckInService;
pub use error::ApiError;

/// Operations the board needs from the check-in service of record.
///
/// Implementations return records already normalized into the canonical
/// shape; the service's response to a start/finish call is the confirmed
/// state of the record.
#[async_trait]
pub trait CheckInService: Send + Sync {
    /// Today's check-ins.
    async fn list_today(&self) -> Result<Vec<CheckInRecord>, ApiError>;

    /// Check-ins created on the given day.
    async fn list_by_date(&self, date: NaiveDate) -> Result<Vec<CheckInRecord>, ApiError>;

    /// The groomer roster.
    async fn list_groomers(&self) -> Result<Vec<Groomer>, ApiError>;

    /// WAITING → STARTED with the given groomer.
    async fn start_check_in(
        &self,
        id: CheckInId,
        groomer_id: GroomerId,
    ) -> Result<CheckInRecord, ApiError>;

    /// STARTED → FINISHED.
    async fn finish_check_in(&self, id: CheckInId) -> Result<CheckInRecord, ApiError>;
}
