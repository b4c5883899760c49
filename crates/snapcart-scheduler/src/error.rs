use thiserror::Error;

use snapcart_clock::ClockError;
use snapcart_core::ExecutorError;
use snapcart_session::SessionError;

/// Errors that end a scheduling run.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The pre-purchase selection found nothing to select — fatal, the run
    /// must stop rather than fire into an empty cart.
    #[error("No eligible items to select — add items and re-run")]
    NoEligibleItems,

    /// Every fire attempt failed and the retry budget is spent.
    #[error("Purchase failed — retry budget exhausted after {attempts} attempts")]
    Exhausted { attempts: u32 },

    /// Clock sync failed and policy is `abort`.
    #[error("Clock sync failed: {0}")]
    Clock(#[from] ClockError),

    /// The browser layer failed outside the retry-able fire path.
    #[error("Executor error: {0}")]
    Executor(#[from] ExecutorError),

    /// The session cache could not be updated.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Operator abort during a wait.
    #[error("Run cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
