use thiserror::Error;

use snapcart_core::ExecutorError;

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A SQLite operation failed while writing the cache. Read-side
    /// failures are absorbed by [`crate::store::SessionStore::load`].
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The cookie blob could not be serialised for persistence.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The interactive login did not leave the login boundary in time.
    #[error("Session acquisition timed out after {secs}s")]
    AcquisitionTimedOut { secs: u64 },

    /// The browser layer failed mid-acquisition.
    #[error("Executor error: {0}")]
    Executor(#[from] ExecutorError),

    /// Operator abort while waiting for login.
    #[error("Session acquisition cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, SessionError>;
