use airpump_serial::SerialError;
use thiserror::Error;

use crate::SessionState;

/// Session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Inflation target is not a positive, finite PSI value.
    #[error("Invalid inflation target: {0}")]
    InvalidTarget(f64),

    /// The customer action is not available in the current state.
    #[error("Cannot {action} in state {state}")]
    InvalidTransition {
        state: SessionState,
        action: &'static str,
    },

    /// Writing a command to the controller failed.
    #[error(transparent)]
    Serial(#[from] SerialError),
}

impl SessionError {
    pub(crate) fn invalid_transition(state: SessionState, action: &'static str) -> Self {
        Self::InvalidTransition { state, action }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
