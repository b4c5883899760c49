use thiserror::Error;

/// Errors from the remote-clock subsystem.
#[derive(Debug, Error)]
pub enum ClockError {
    /// The authority could not be queried or its payload made no sense.
    /// Recoverable: callers fall back to local time for one cycle or abort
    /// per policy, never crash.
    #[error("Remote clock unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, ClockError>;
