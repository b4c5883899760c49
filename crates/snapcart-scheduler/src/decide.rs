use std::time::Duration;

/// What the current cycle does with the time remaining to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulingDecision {
    /// Target reached or passed: fire immediately, never sleep.
    FireNow,
    /// Target far out: nap exactly the coarse threshold, then re-decide
    /// against freshly synced time.
    CoarseWait(Duration),
    /// Target within the threshold: one precise sleep of the full diff.
    FineWait(Duration),
}

/// Derive the decision from `diff = target − corrected now`.
///
/// The threshold boundary is inclusive on the fine side: `diff` exactly
/// equal to the threshold takes the single precise wait, not another nap.
pub fn decide(diff: chrono::Duration, coarse_threshold: Duration) -> SchedulingDecision {
    if diff <= chrono::Duration::zero() {
        return SchedulingDecision::FireNow;
    }
    let threshold =
        chrono::Duration::from_std(coarse_threshold).unwrap_or(chrono::Duration::MAX);
    if diff > threshold {
        SchedulingDecision::CoarseWait(coarse_threshold)
    } else {
        // diff is positive and fits the threshold, so to_std cannot fail.
        SchedulingDecision::FineWait(diff.to_std().unwrap_or(Duration::ZERO))
    }
}
