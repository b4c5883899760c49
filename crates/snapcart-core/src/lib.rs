//! `snapcart-core` — shared configuration, types and the executor seam.
//!
//! # Overview
//!
//! Everything the other crates agree on lives here: the figment-backed
//! [`config::SnapcartConfig`] (snapcart.toml + `SNAPCART_*` env overrides),
//! the opaque [`Cookie`] credential type, the [`FireResult`] signal, and the
//! [`executor::ActionExecutor`] trait that abstracts the browser-automation
//! layer away from the scheduling core.

pub mod config;
pub mod error;
pub mod executor;
pub mod types;

pub use config::SnapcartConfig;
pub use error::{Result, SnapcartError};
pub use executor::{ActionExecutor, ExecutorError};
pub use types::{Cookie, FireResult};
