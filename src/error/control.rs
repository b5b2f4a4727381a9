use thiserror::Error;

use super::{ConfigError, LifecycleError};

/// A control API failure, rendered as `{"error": message}` with `status`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{status}: {message}")]
pub struct ControlError {
    pub status: u16,
    pub message: String,
}

impl ControlError {
    #[must_use]
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }
}

impl From<LifecycleError> for ControlError {
    fn from(err: LifecycleError) -> Self {
        Self::new(409, err.to_string())
    }
}

impl From<ConfigError> for ControlError {
    fn from(err: ConfigError) -> Self {
        Self::bad_request(err.to_string())
    }
}
