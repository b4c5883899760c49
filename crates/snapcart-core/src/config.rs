use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SnapcartError};

/// Civil date-time format accepted for `target.time`.
pub const TARGET_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DEFAULT_COARSE_THRESHOLD_SECS: u64 = 600; // one re-sync per 10 min nap
pub const DEFAULT_VALIDITY_MINS: i64 = 15;
pub const DEFAULT_LOGIN_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_LOGIN_POLL_MS: u64 = 500;
pub const DEFAULT_CLOCK_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_DRIVER_TIMEOUT_MS: u64 = 10_000;

/// Top-level config (snapcart.toml + SNAPCART_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapcartConfig {
    pub target: TargetConfig,
    #[serde(default)]
    pub clock: ClockConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub driver: DriverConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// The one action this run exists for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Destination page holding the prepared cart.
    pub url: String,
    /// Civil date-time, local zone, `YYYY-MM-DD HH:MM:SS`.
    pub time: String,
    /// Additional fire attempts after the first failure.
    #[serde(default = "default_max_retry")]
    pub max_retry: u32,
    /// Milliseconds subtracted from the fine wait. 0 keeps the wait exact.
    #[serde(default)]
    pub lead_time_ms: u64,
}

impl TargetConfig {
    /// Parse `time` into an absolute UTC instant.
    ///
    /// Ambiguous local times (DST fold) resolve to the earlier instant;
    /// nonexistent local times are rejected.
    pub fn target_instant(&self) -> Result<DateTime<Utc>> {
        let naive = NaiveDateTime::parse_from_str(&self.time, TARGET_TIME_FORMAT).map_err(|e| {
            SnapcartError::InvalidTargetTime {
                value: self.time.clone(),
                reason: e.to_string(),
            }
        })?;
        let local = Local
            .from_local_datetime(&naive)
            .earliest()
            .ok_or_else(|| SnapcartError::InvalidTargetTime {
                value: self.time.clone(),
                reason: "time does not exist in the local timezone".into(),
            })?;
        Ok(local.with_timezone(&Utc))
    }
}

/// Remote time-authority settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockConfig {
    /// HTTP(S) GET endpoint returning a JSON millisecond epoch timestamp.
    #[serde(default = "default_clock_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_clock_timeout_ms")]
    pub timeout_ms: u64,
    /// What a failed clock query does to the current decision cycle.
    #[serde(default)]
    pub on_failure: ClockFallback,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            endpoint: default_clock_endpoint(),
            timeout_ms: default_clock_timeout_ms(),
            on_failure: ClockFallback::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ClockFallback {
    /// Warn and use uncorrected local UTC for this cycle only.
    #[default]
    LocalFallback,
    /// Treat the cycle as unrecoverable and stop the run.
    Abort,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Naps longer than this are chopped so the clock is re-synced between.
    #[serde(default = "default_coarse_threshold_secs")]
    pub coarse_threshold_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            coarse_threshold_secs: default_coarse_threshold_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Login boundary: while the browser location contains this origin the
    /// interactive login is still pending.
    #[serde(default = "default_login_url")]
    pub login_url: String,
    /// Cache validity window applied on every save/refresh.
    #[serde(default = "default_validity_mins")]
    pub validity_mins: i64,
    /// Upper bound on the interactive-login wait.
    #[serde(default = "default_login_timeout_secs")]
    pub login_timeout_secs: u64,
    /// Poll cadence while waiting for the login boundary to be left.
    #[serde(default = "default_login_poll_ms")]
    pub poll_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            login_url: default_login_url(),
            validity_mins: default_validity_mins(),
            login_timeout_secs: default_login_timeout_secs(),
            poll_interval_ms: default_login_poll_ms(),
        }
    }
}

/// WebDriver endpoint and the storefront-specific locators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Base URL of a running WebDriver server (chromedriver et al.).
    #[serde(default = "default_driver_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_driver_timeout_ms")]
    pub timeout_ms: u64,
    /// CSS selector for the select-all control on the cart page.
    #[serde(default = "default_select_all")]
    pub select_all: String,
    /// CSS selector for the checkout submit button.
    #[serde(default = "default_submit")]
    pub submit: String,
    /// CSS selector for the order-confirm button on the next page.
    #[serde(default = "default_confirm")]
    pub confirm: String,
    /// Substring of the page title that marks a successful checkout.
    #[serde(default = "default_success_marker")]
    pub success_title_marker: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            endpoint: default_driver_endpoint(),
            timeout_ms: default_driver_timeout_ms(),
            select_all: default_select_all(),
            submit: default_submit(),
            confirm: default_confirm(),
            success_title_marker: default_success_marker(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl SnapcartConfig {
    /// Load config: explicit path > SNAPCART_CONFIG env > ~/.snapcart/snapcart.toml.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: SnapcartConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("SNAPCART_").split("_"))
            .extract()
            .map_err(|e| SnapcartError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.snapcart/snapcart.toml", home)
}

fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.snapcart/snapcart.db", home)
}

fn default_max_retry() -> u32 {
    3
}

fn default_clock_endpoint() -> String {
    "http://api.m.taobao.com/rest/api3.do?api=mtop.common.getTimestamp".to_string()
}

fn default_clock_timeout_ms() -> u64 {
    DEFAULT_CLOCK_TIMEOUT_MS
}

fn default_coarse_threshold_secs() -> u64 {
    DEFAULT_COARSE_THRESHOLD_SECS
}

fn default_login_url() -> String {
    "https://login.taobao.com".to_string()
}

fn default_validity_mins() -> i64 {
    DEFAULT_VALIDITY_MINS
}

fn default_login_timeout_secs() -> u64 {
    DEFAULT_LOGIN_TIMEOUT_SECS
}

fn default_login_poll_ms() -> u64 {
    DEFAULT_LOGIN_POLL_MS
}

fn default_driver_endpoint() -> String {
    "http://localhost:9515".to_string()
}

fn default_driver_timeout_ms() -> u64 {
    DEFAULT_DRIVER_TIMEOUT_MS
}

fn default_select_all() -> String {
    "#J_SelectAll1 div label".to_string()
}

fn default_submit() -> String {
    "a.submit-btn".to_string()
}

fn default_confirm() -> String {
    ".go-btn".to_string()
}

fn default_success_marker() -> String {
    "支付宝".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> TargetConfig {
        TargetConfig {
            url: "https://cart.example.com/cart.htm".into(),
            time: "2026-11-11 20:00:00".into(),
            max_retry: 3,
            lead_time_ms: 0,
        }
    }

    #[test]
    fn target_instant_parses_civil_format() {
        let t = minimal().target_instant().expect("parse failed");
        // Converted through the local zone, but the wall-clock parts must
        // round-trip when rendered back in local time.
        let back = t.with_timezone(&Local).format(TARGET_TIME_FORMAT).to_string();
        assert_eq!(back, "2026-11-11 20:00:00");
    }

    #[test]
    fn target_instant_rejects_bad_format() {
        let mut cfg = minimal();
        cfg.time = "2026/11/11 20:00".into();
        assert!(matches!(
            cfg.target_instant(),
            Err(SnapcartError::InvalidTargetTime { .. })
        ));
    }

    #[test]
    fn section_defaults_are_sane() {
        let clock = ClockConfig::default();
        assert_eq!(clock.on_failure, ClockFallback::LocalFallback);
        assert_eq!(clock.timeout_ms, 5_000);

        let sched = SchedulerConfig::default();
        assert_eq!(sched.coarse_threshold_secs, 600);

        let session = SessionConfig::default();
        assert_eq!(session.validity_mins, 15);
        assert!(session.login_timeout_secs > 0);
    }

    #[test]
    fn clock_fallback_kebab_case_wire_format() {
        let v: ClockFallback = serde_json::from_str(r#""local-fallback""#).unwrap();
        assert_eq!(v, ClockFallback::LocalFallback);
        let v: ClockFallback = serde_json::from_str(r#""abort""#).unwrap();
        assert_eq!(v, ClockFallback::Abort);
    }
}
