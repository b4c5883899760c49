use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{info, warn};

use snapcart_clock::TimeSource;
use snapcart_core::config::{ClockFallback, SnapcartConfig};
use snapcart_core::{ActionExecutor, ExecutorError, FireResult};
use snapcart_session::SessionStore;

use crate::decide::{decide, SchedulingDecision};
use crate::error::{Result, SchedulerError};

/// Static knobs for one run, fixed at configuration load.
#[derive(Debug, Clone)]
pub struct SchedulerParams {
    /// The instant the purchase must fire at or after.
    pub target_time: DateTime<Utc>,
    /// Longest nap a single clock measurement is trusted across.
    pub coarse_threshold: Duration,
    /// Subtracted from the fine wait; zero leaves the wait exact.
    pub lead_time: Duration,
    /// Additional fire attempts after the first failure.
    pub max_retry: u32,
    pub on_clock_failure: ClockFallback,
    /// Window applied when the engine extends the cached session.
    pub session_validity_mins: i64,
}

impl SchedulerParams {
    pub fn from_config(config: &SnapcartConfig) -> snapcart_core::Result<Self> {
        Ok(Self {
            target_time: config.target.target_instant()?,
            coarse_threshold: Duration::from_secs(config.scheduler.coarse_threshold_secs),
            lead_time: Duration::from_millis(config.target.lead_time_ms),
            max_retry: config.target.max_retry,
            on_clock_failure: config.clock.on_failure,
            session_validity_mins: config.session.validity_mins,
        })
    }
}

/// What a successful run looked like.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Total fire invocations, including the successful one.
    pub attempts: u32,
    /// Coarse naps taken before entering the fine window.
    pub coarse_sleeps: u32,
    /// Local UTC at the moment success was observed.
    pub fired_at: DateTime<Utc>,
}

/// Drives one target instant to completion: decide, wait, fire, retry.
///
/// Owns no global state — the executor, clock and session store are explicit
/// handles, driven sequentially from a single logical thread of control.
pub struct SchedulerEngine<'a> {
    executor: &'a dyn ActionExecutor,
    time_source: &'a dyn TimeSource,
    sessions: Arc<SessionStore>,
    params: SchedulerParams,
}

impl<'a> SchedulerEngine<'a> {
    pub fn new(
        executor: &'a dyn ActionExecutor,
        time_source: &'a dyn TimeSource,
        sessions: Arc<SessionStore>,
        params: SchedulerParams,
    ) -> Self {
        Self {
            executor,
            time_source,
            sessions,
            params,
        }
    }

    /// Run the state machine to a terminal state.
    ///
    /// Re-enters the decision step after every coarse nap; takes the fine
    /// wait exactly once; then fires until success or the budget is spent.
    /// Any wait can be interrupted through `shutdown`.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<RunReport> {
        let mut coarse_sleeps = 0u32;
        let mut prepared = false;

        loop {
            let now = self.corrected_now().await?;
            let diff = self.params.target_time - now;

            match decide(diff, self.params.coarse_threshold) {
                SchedulingDecision::FireNow => {
                    info!("target instant reached");
                    break;
                }
                SchedulingDecision::CoarseWait(nap) => {
                    info!(
                        remaining_secs = diff.num_seconds(),
                        nap_secs = nap.as_secs(),
                        "target far out, coarse sleep"
                    );
                    self.sleep_or_cancel(nap, &mut shutdown).await?;
                    coarse_sleeps += 1;
                    // Keep the page and the cached session from going stale
                    // across the nap, then re-decide on fresh time.
                    self.executor.refresh().await?;
                    self.extend_session()?;
                }
                SchedulingDecision::FineWait(wait) => {
                    self.prepare(&mut prepared).await?;
                    let wait = wait.saturating_sub(self.params.lead_time);
                    info!(wait_ms = wait.as_millis() as u64, "fine wait until target");
                    self.sleep_or_cancel(wait, &mut shutdown).await?;
                    break;
                }
            }
        }

        self.prepare(&mut prepared).await?;
        let attempts = self.fire_with_retry().await?;
        self.extend_session()?;

        Ok(RunReport {
            attempts,
            coarse_sleeps,
            fired_at: Utc::now(),
        })
    }

    /// Remote-corrected now, degraded per policy when the authority is down.
    async fn corrected_now(&self) -> Result<DateTime<Utc>> {
        match self.time_source.now().await {
            Ok(now) => Ok(now),
            Err(e) => match self.params.on_clock_failure {
                ClockFallback::LocalFallback => {
                    warn!("clock sync failed ({e}); using local time for this cycle");
                    Ok(Utc::now())
                }
                ClockFallback::Abort => Err(SchedulerError::Clock(e)),
            },
        }
    }

    /// Pre-arm the purchase once per run.
    async fn prepare(&self, prepared: &mut bool) -> Result<()> {
        if *prepared {
            return Ok(());
        }
        match self.executor.prepare_selection().await {
            Ok(()) => {
                *prepared = true;
                Ok(())
            }
            Err(ExecutorError::NoEligibleItems) => Err(SchedulerError::NoEligibleItems),
            Err(e) => Err(e.into()),
        }
    }

    /// Fire until success; each failure burns one unit of retry budget.
    /// Retries go straight back to firing — no clock re-check in between.
    async fn fire_with_retry(&self) -> Result<u32> {
        let mut budget = self.params.max_retry;
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.executor.fire().await? {
                FireResult::Success => {
                    info!(attempts, "purchase succeeded");
                    return Ok(attempts);
                }
                FireResult::Failure if budget > 0 => {
                    budget -= 1;
                    warn!(attempts, remaining = budget, "fire failed, retrying");
                }
                FireResult::Failure => {
                    return Err(SchedulerError::Exhausted { attempts });
                }
            }
        }
    }

    fn extend_session(&self) -> Result<()> {
        let window = Utc::now() + chrono::Duration::minutes(self.params.session_validity_mins);
        self.sessions.touch(window)?;
        Ok(())
    }

    async fn sleep_or_cancel(
        &self,
        duration: Duration,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<()> {
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    warn!("run cancelled during wait");
                    return Err(SchedulerError::Cancelled);
                }
                Ok(())
            }
        }
    }
}
