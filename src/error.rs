use thiserror::Error;

use crate::api::ApiError;
use crate::board::PatchRejection;
use crate::checkin::CheckInId;

/// Result type alias for board operations.
pub type Result<T> = std::result::Result<T, BoardError>;

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Check-in service error: {0}")]
    Api(#[from] ApiError),

    /// Carries the groomer's id, or its name when the id is unknown.
    #[error("Groomer {0} is not in the roster")]
    UnknownGroomer(String),

    /// The service applied the change but the board could not take it in.
    /// The next poll brings the board back in line.
    #[error("Check-in {id} changed on the service but the board refused it: {reason}")]
    ConfirmationRejected { id: CheckInId, reason: PatchRejection },
}

impl BoardError {
    /// Message suitable for a user-facing notification.
    pub fn user_message(&self) -> String {
        match self {
            BoardError::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}
