//! `snapcart-driver` — W3C WebDriver implementation of the executor seam.
//!
//! # Overview
//!
//! A deliberately small WebDriver REST client: create one browser session on
//! a locally running chromedriver-class server, then drive it through the
//! handful of calls the core needs (navigate, refresh, find + click, read
//! title/url, get/add cookies). No element caching, no waits beyond the
//! per-request timeout — the scheduling core owns all timing.

pub mod webdriver;

pub use webdriver::WebDriverExecutor;
