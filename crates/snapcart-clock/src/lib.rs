//! `snapcart-clock` — corrected "now" from a remote time authority.
//!
//! # Overview
//!
//! The scheduler never trusts the local wall clock for its decisions. Each
//! cycle it asks a [`TimeSource`] for the best estimate of true now; the
//! production implementation, [`ClockSync`], does one HTTP GET against the
//! configured authority, measures the round trip, and returns
//! `remote + round_trip / 2`. The offset is ephemeral — it is recomputed on
//! every call, never cached across cycles.

pub mod error;
pub mod sync;

pub use error::{ClockError, Result};
pub use sync::{ClockSync, TimeSource};
