use actix::MailboxError;

use crate::domain::order::OrderError;
use crate::persistence::StoreError;
use crate::remote::RemoteError;

// ============================================================================
// Tracker Errors - What callers of the tracker boundary can see
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Failed to connect to order controller: {0}")]
    ConnectionFailure(#[source] RemoteError),

    #[error("Remote {command} failed: {source}")]
    RemoteCommand {
        command: &'static str,
        #[source]
        source: RemoteError,
    },

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Order tracker is not running: {0}")]
    Unavailable(#[from] MailboxError),
}

impl TrackerError {
    pub fn remote(command: &'static str, source: RemoteError) -> Self {
        TrackerError::RemoteCommand { command, source }
    }

    /// The order error behind this failure, if any.
    pub fn as_order_error(&self) -> Option<&OrderError> {
        match self {
            TrackerError::Order(e) => Some(e),
            _ => None,
        }
    }
}

pub type TrackerResult<T> = Result<T, TrackerError>;
