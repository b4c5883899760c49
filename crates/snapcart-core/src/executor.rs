use async_trait::async_trait;
use thiserror::Error;

use crate::types::{Cookie, FireResult};

/// Errors surfaced by an [`ActionExecutor`] implementation.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The pre-purchase selection found nothing to select. Fatal for the
    /// run: the scheduler must report it and stop, never proceed to fire.
    #[error("No eligible items to select")]
    NoEligibleItems,

    /// The driver endpoint could not be reached (connect/timeout class).
    #[error("Driver unavailable: {0}")]
    Unavailable(String),

    /// The driver answered but the exchange violated the expected protocol.
    #[error("Driver protocol error: {0}")]
    Protocol(String),
}

/// The browser-automation capability consumed by the scheduling core.
///
/// This is the complete surface the core needs: navigation, one "prepare"
/// side effect, the fire click, a login-boundary probe, and opaque cookie
/// capture/replay. Implementations own the underlying driver session; the
/// core drives it sequentially, one call at a time.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Point the browser at `url` and wait for the load to settle.
    async fn navigate(&self, url: &str) -> Result<(), ExecutorError>;

    /// Reload the current page (used after each coarse sleep so the cart
    /// state does not go stale across long naps).
    async fn refresh(&self) -> Result<(), ExecutorError>;

    /// Pre-arm the purchase: select everything eligible on the current page.
    async fn prepare_selection(&self) -> Result<(), ExecutorError>;

    /// Perform the purchase click sequence and interpret the outcome.
    async fn fire(&self) -> Result<FireResult, ExecutorError>;

    /// Whether the current location is still inside the login boundary.
    async fn login_pending(&self) -> Result<bool, ExecutorError>;

    /// Capture the current session cookies as an opaque credential set.
    async fn session_cookies(&self) -> Result<Vec<Cookie>, ExecutorError>;

    /// Replay a previously captured credential set into the browser.
    async fn inject_cookies(&self, cookies: &[Cookie]) -> Result<(), ExecutorError>;
}
