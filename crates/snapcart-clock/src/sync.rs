use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{ClockError, Result};

/// Sent on every authority query; some public endpoints reject bare clients.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/102.0.5005.61 Safari/537.36";

/// Provider of corrected current time.
#[async_trait]
pub trait TimeSource: Send + Sync {
    /// Best estimate of true now at the moment the call returns.
    async fn now(&self) -> Result<DateTime<Utc>>;
}

/// HTTP implementation: one GET per call, round-trip halving applied.
pub struct ClockSync {
    client: reqwest::Client,
    endpoint: String,
}

impl ClockSync {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ClockError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl TimeSource for ClockSync {
    async fn now(&self) -> Result<DateTime<Utc>> {
        let started = Instant::now();
        let resp = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| ClockError::Unavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ClockError::Unavailable(format!(
                "authority returned status {}",
                resp.status()
            )));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ClockError::Unavailable(format!("unparseable payload: {e}")))?;
        let round_trip = started.elapsed();

        let ms = extract_epoch_ms(&body)
            .ok_or_else(|| ClockError::Unavailable("no timestamp field in payload".into()))?;
        let remote = DateTime::from_timestamp_millis(ms)
            .ok_or_else(|| ClockError::Unavailable(format!("timestamp out of range: {ms}")))?;

        let corrected = correct(remote, round_trip);
        let offset_ms = (corrected - Utc::now()).num_milliseconds();
        debug!(
            offset_ms,
            round_trip_ms = round_trip.as_millis() as u64,
            "clock synced"
        );
        Ok(corrected)
    }
}

/// Shift the remote timestamp forward by half the measurement round trip.
///
/// The remote instant was sampled roughly mid-flight, so by the time the
/// response is interpreted it is ~`round_trip / 2` old.
pub fn correct(remote: DateTime<Utc>, round_trip: Duration) -> DateTime<Utc> {
    let half = chrono::Duration::from_std(round_trip / 2).unwrap_or_else(|_| chrono::Duration::zero());
    remote + half
}

/// Pull the millisecond epoch timestamp out of the authority's JSON body.
///
/// Accepts `{"data":{"t":"…"}}` (the default authority's shape), a top-level `t`,
/// and either a JSON number or a decimal string for the value itself.
fn extract_epoch_ms(body: &serde_json::Value) -> Option<i64> {
    let field = body
        .get("data")
        .and_then(|d| d.get("t"))
        .or_else(|| body.get("t"))?;
    match field {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_nested_string_timestamp() {
        let body = json!({"api": "mtop.common.getTimestamp", "data": {"t": "1699999999123"}});
        assert_eq!(extract_epoch_ms(&body), Some(1_699_999_999_123));
    }

    #[test]
    fn extracts_top_level_numeric_timestamp() {
        let body = json!({"t": 1699999999123i64});
        assert_eq!(extract_epoch_ms(&body), Some(1_699_999_999_123));
    }

    #[test]
    fn missing_or_malformed_field_is_none() {
        assert_eq!(extract_epoch_ms(&json!({"data": {}})), None);
        assert_eq!(extract_epoch_ms(&json!({"data": {"t": "not-a-number"}})), None);
        assert_eq!(extract_epoch_ms(&json!({})), None);
    }

    #[test]
    fn correction_adds_half_round_trip() {
        let remote = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let corrected = correct(remote, Duration::from_millis(400));
        assert_eq!((corrected - remote).num_milliseconds(), 200);
    }

    #[test]
    fn zero_round_trip_is_identity() {
        let remote = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        assert_eq!(correct(remote, Duration::ZERO), remote);
    }
}
