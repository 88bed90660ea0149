//! Check-in workflow board for a grooming shop.
//!
//! Check-ins move through WAITING → STARTED → FINISHED. A groomer must be
//! assigned before work starts, every stage change is confirmed by the
//! check-in service before the local board reflects it, and a background
//! poll keeps the board reconciled with the service of record.

pub mod api;
pub mod board;
pub mod checkin;
pub mod config;
pub mod error;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{BoardError, Result};
