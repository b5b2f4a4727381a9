use thiserror::Error;

/// Rejected run transitions. Neither variant mutates controller state.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("test already running")]
    AlreadyRunning,
    #[error("not running")]
    NotRunning,
}
