//! `snapcart-scheduler` — the timing core.
//!
//! # Overview
//!
//! One run targets exactly one future instant. Each decision cycle asks the
//! remote-corrected clock for now, computes the remaining diff to the target
//! and picks one of three moves:
//!
//! | Decision          | When                         | Behaviour                              |
//! |-------------------|------------------------------|----------------------------------------|
//! | `FireNow`         | `diff <= 0`                  | fire immediately, never sleep          |
//! | `CoarseWait(thr)` | `diff > coarse_threshold`    | nap one threshold, re-sync, re-decide  |
//! | `FineWait(diff)`  | `0 < diff <= threshold`      | prepare once, one precise sleep, fire  |
//!
//! Coarse naps are chopped at the threshold so no single sleep trusts one
//! clock measurement for more than `coarse_threshold`. Firing retries
//! immediately on failure until the retry budget is spent. Every sleep is
//! cancellable through a `watch` shutdown channel.

pub mod decide;
pub mod engine;
pub mod error;

pub use decide::{decide, SchedulingDecision};
pub use engine::{RunReport, SchedulerEngine, SchedulerParams};
pub use error::{Result, SchedulerError};
