use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use snapcart_core::config::DriverConfig;
use snapcart_core::{ActionExecutor, Cookie, ExecutorError, FireResult};

/// W3C element identifier key in find-element responses.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// `ActionExecutor` over the W3C WebDriver REST protocol.
pub struct WebDriverExecutor {
    client: reqwest::Client,
    base: String,
    session_id: String,
    config: DriverConfig,
    login_url: String,
}

impl WebDriverExecutor {
    /// Create a fresh browser session on the configured WebDriver server.
    ///
    /// `login_url` is the boundary used by [`ActionExecutor::login_pending`]:
    /// while the browser's location still starts with it, login is pending.
    pub async fn connect(
        config: DriverConfig,
        login_url: impl Into<String>,
    ) -> Result<Self, ExecutorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ExecutorError::Unavailable(e.to_string()))?;

        let base = config.endpoint.trim_end_matches('/').to_string();
        let body = json!({
            "capabilities": { "alwaysMatch": { "browserName": "chrome" } }
        });
        let value = post_json(&client, &format!("{base}/session"), &body).await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| ExecutorError::Protocol("session response missing sessionId".into()))?
            .to_string();

        debug!(%session_id, "webdriver session created");
        Ok(Self {
            client,
            base,
            session_id,
            config,
            login_url: login_url.into(),
        })
    }

    /// Tear down the browser session. Best effort — errors are logged only.
    pub async fn close(&self) {
        let url = format!("{}/session/{}", self.base, self.session_id);
        if let Err(e) = self.client.delete(&url).send().await {
            warn!("webdriver session close failed: {e}");
        }
    }

    fn session_url(&self, path: &str) -> String {
        format!("{}/session/{}/{}", self.base, self.session_id, path)
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ExecutorError> {
        post_json(&self.client, &self.session_url(path), body).await
    }

    async fn get(&self, path: &str) -> Result<Value, ExecutorError> {
        let resp = self
            .client
            .get(self.session_url(path))
            .send()
            .await
            .map_err(map_transport)?;
        unwrap_value(resp).await
    }

    /// Locate an element by CSS selector. `Ok(None)` when the driver reports
    /// "no such element"; any other failure is an error.
    async fn find_element(&self, selector: &str) -> Result<Option<String>, ExecutorError> {
        let body = json!({ "using": "css selector", "value": selector });
        let resp = self
            .client
            .post(self.session_url("element"))
            .json(&body)
            .send()
            .await
            .map_err(map_transport)?;

        let status = resp.status();
        let value: Value = resp
            .json()
            .await
            .map_err(|e| ExecutorError::Protocol(format!("unparseable driver response: {e}")))?;

        if !status.is_success() {
            if driver_error_code(&value) == Some("no such element") {
                return Ok(None);
            }
            return Err(protocol_error(&value, status.as_u16()));
        }
        Ok(extract_element_id(&value))
    }

    async fn click(&self, element_id: &str) -> Result<(), ExecutorError> {
        self.post(&format!("element/{element_id}/click"), &json!({}))
            .await?;
        Ok(())
    }

    async fn title(&self) -> Result<String, ExecutorError> {
        let value = self.get("title").await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ExecutorError::Protocol("title response is not a string".into()))
    }

    async fn current_url(&self) -> Result<String, ExecutorError> {
        let value = self.get("url").await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ExecutorError::Protocol("url response is not a string".into()))
    }
}

#[async_trait]
impl ActionExecutor for WebDriverExecutor {
    async fn navigate(&self, url: &str) -> Result<(), ExecutorError> {
        debug!(%url, "navigate");
        self.post("url", &json!({ "url": url })).await?;
        Ok(())
    }

    async fn refresh(&self) -> Result<(), ExecutorError> {
        self.post("refresh", &json!({})).await?;
        Ok(())
    }

    async fn prepare_selection(&self) -> Result<(), ExecutorError> {
        match self.find_element(&self.config.select_all).await? {
            Some(el) => {
                self.click(&el).await?;
                debug!("selection prepared");
                Ok(())
            }
            None => Err(ExecutorError::NoEligibleItems),
        }
    }

    async fn fire(&self) -> Result<FireResult, ExecutorError> {
        let Some(submit) = self.find_element(&self.config.submit).await? else {
            warn!(selector = %self.config.submit, "submit button not found");
            return Ok(FireResult::Failure);
        };
        self.click(&submit).await?;

        let Some(confirm) = self.find_element(&self.config.confirm).await? else {
            warn!(selector = %self.config.confirm, "confirm button not found");
            return Ok(FireResult::Failure);
        };
        self.click(&confirm).await?;

        let title = self.title().await?;
        Ok(interpret_title(&title, &self.config.success_title_marker))
    }

    async fn login_pending(&self) -> Result<bool, ExecutorError> {
        let url = self.current_url().await?;
        Ok(location_is_login(&url, &self.login_url))
    }

    async fn session_cookies(&self) -> Result<Vec<Cookie>, ExecutorError> {
        let value = self.get("cookie").await?;
        let list = value
            .as_array()
            .ok_or_else(|| ExecutorError::Protocol("cookie response is not an array".into()))?;
        Ok(list.iter().filter_map(cookie_from_value).collect())
    }

    async fn inject_cookies(&self, cookies: &[Cookie]) -> Result<(), ExecutorError> {
        for cookie in cookies {
            self.post("cookie", &add_cookie_payload(cookie)).await?;
        }
        debug!(count = cookies.len(), "cookies injected");
        Ok(())
    }
}

// --- protocol helpers ------------------------------------------------------

async fn post_json(
    client: &reqwest::Client,
    url: &str,
    body: &Value,
) -> Result<Value, ExecutorError> {
    let resp = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(map_transport)?;
    unwrap_value(resp).await
}

/// Every WebDriver response wraps its payload in `{"value": …}`; non-2xx
/// responses carry `{"value": {"error", "message"}}`.
async fn unwrap_value(resp: reqwest::Response) -> Result<Value, ExecutorError> {
    let status = resp.status();
    let body: Value = resp
        .json()
        .await
        .map_err(|e| ExecutorError::Protocol(format!("unparseable driver response: {e}")))?;
    if !status.is_success() {
        return Err(protocol_error(&body, status.as_u16()));
    }
    Ok(body.get("value").cloned().unwrap_or(Value::Null))
}

fn map_transport(e: reqwest::Error) -> ExecutorError {
    if e.is_connect() || e.is_timeout() {
        ExecutorError::Unavailable(e.to_string())
    } else {
        ExecutorError::Protocol(e.to_string())
    }
}

fn driver_error_code(body: &Value) -> Option<&str> {
    body.get("value")
        .and_then(|v| v.get("error"))
        .and_then(Value::as_str)
}

fn protocol_error(body: &Value, status: u16) -> ExecutorError {
    let message = body
        .get("value")
        .and_then(|v| v.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("unknown driver error");
    ExecutorError::Protocol(format!("status {status}: {message}"))
}

fn extract_element_id(body: &Value) -> Option<String> {
    body.get("value")
        .and_then(|v| v.get(ELEMENT_KEY))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn cookie_from_value(v: &Value) -> Option<Cookie> {
    Some(Cookie::new(
        v.get("domain")?.as_str()?,
        v.get("name")?.as_str()?,
        v.get("value")?.as_str()?,
    ))
}

fn add_cookie_payload(cookie: &Cookie) -> Value {
    json!({
        "cookie": {
            "domain": cookie.domain,
            "name": cookie.name,
            "value": cookie.value,
        }
    })
}

fn interpret_title(title: &str, marker: &str) -> FireResult {
    if title.contains(marker) {
        FireResult::Success
    } else {
        FireResult::Failure
    }
}

fn location_is_login(current: &str, login_url: &str) -> bool {
    current.contains(login_url.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_id_extraction() {
        let body = serde_json::json!({
            "value": { ELEMENT_KEY: "el-42" }
        });
        assert_eq!(extract_element_id(&body), Some("el-42".into()));
        assert_eq!(extract_element_id(&serde_json::json!({"value": null})), None);
    }

    #[test]
    fn cookie_parsing_skips_malformed_entries() {
        let list = serde_json::json!([
            { "domain": ".example.com", "name": "a", "value": "1", "httpOnly": true },
            { "name": "missing-domain", "value": "2" },
        ]);
        let cookies: Vec<Cookie> = list
            .as_array()
            .unwrap()
            .iter()
            .filter_map(cookie_from_value)
            .collect();
        assert_eq!(cookies, vec![Cookie::new(".example.com", "a", "1")]);
    }

    #[test]
    fn add_cookie_payload_shape() {
        let payload = add_cookie_payload(&Cookie::new(".example.com", "tok", "v"));
        assert_eq!(payload["cookie"]["name"], "tok");
        assert_eq!(payload["cookie"]["domain"], ".example.com");
    }

    #[test]
    fn title_marker_decides_outcome() {
        assert_eq!(
            interpret_title("支付宝 - 确认付款", "支付宝"),
            FireResult::Success
        );
        assert_eq!(interpret_title("购物车", "支付宝"), FireResult::Failure);
    }

    #[test]
    fn login_boundary_matching() {
        assert!(location_is_login(
            "https://login.example.com/member/login.jhtml",
            "https://login.example.com"
        ));
        assert!(!location_is_login(
            "https://cart.example.com/cart.htm",
            "https://login.example.com"
        ));
    }

    #[test]
    fn driver_error_code_surface() {
        let body = serde_json::json!({
            "value": { "error": "no such element", "message": "…" }
        });
        assert_eq!(driver_error_code(&body), Some("no such element"));
    }
}
