//! `snapcart-session` — persisted session cache and acquisition flow.
//!
//! # Overview
//!
//! A session is an opaque cookie set plus an absolute expiry, stored as a
//! single SQLite row so token and expiry can never drift apart. The
//! [`provider::SessionProvider`] decides between the cached fast path
//! (replay the cookies, extend the window) and the interactive slow path
//! (wait — bounded — for the operator to finish logging in, then capture
//! and persist the fresh cookies).
//!
//! Cache corruption is absorbed: an unreadable row loads as `None` and
//! simply forces re-acquisition.

pub mod db;
pub mod error;
pub mod provider;
pub mod store;

pub use error::{Result, SessionError};
pub use provider::SessionProvider;
pub use store::{CachedSession, SessionStore};
