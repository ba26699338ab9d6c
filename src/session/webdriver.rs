//! WebDriver-protocol client for headless Chrome
//!
//! Implements [`BrowserDriver`] against a chromedriver endpoint using the
//! plain W3C WebDriver HTTP protocol. `wait_for` is a poll loop with a
//! per-wait deadline; element presence is the readiness condition.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::Instant;

use super::{BrowserDriver, DriverError, DriverFactory, Selector, SessionCookies};

/// How often `wait_for` re-probes for the element.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Chrome launch flags, mirroring what the portal is known to need in
/// containerized deployments.
const CHROME_ARGS: &[&str] = &[
    "--headless",
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--window-size=1920,1080",
    "--ignore-certificate-errors",
];

/// One live chromedriver session.
#[derive(Debug)]
pub struct WebDriverClient {
    http: Client,
    session_url: String,
}

impl WebDriverClient {
    /// Open a new headless-Chrome session against `webdriver_url`
    /// (e.g. `http://localhost:9515`).
    pub async fn launch(webdriver_url: &str) -> Result<Self, DriverError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "acceptInsecureCerts": true,
                    "goog:chromeOptions": { "args": CHROME_ARGS },
                }
            }
        });

        let base = webdriver_url.trim_end_matches('/');
        let response = http
            .post(format!("{base}/session"))
            .json(&capabilities)
            .send()
            .await?;
        let value = unwrap_value(response).await?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| DriverError::Protocol("session response lacks sessionId".to_string()))?;

        Ok(Self {
            session_url: format!("{base}/session/{session_id}"),
            http,
        })
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, DriverError> {
        let response = self
            .http
            .post(format!("{}{path}", self.session_url))
            .json(&body)
            .send()
            .await?;
        unwrap_value(response).await
    }

    async fn get(&self, path: &str) -> Result<Value, DriverError> {
        let response = self
            .http
            .get(format!("{}{path}", self.session_url))
            .send()
            .await?;
        unwrap_value(response).await
    }

    /// Locate an element, returning its opaque WebDriver element id.
    async fn find_element(&self, selector: &Selector) -> Result<String, DriverError> {
        let (using, value) = locator(selector);
        let found = self
            .post("/element", json!({ "using": using, "value": value }))
            .await?;

        // W3C wraps the id under a well-known key; take whatever single
        // entry the object holds.
        found
            .as_object()
            .and_then(|obj| obj.values().next())
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                DriverError::Protocol(format!("malformed element response for {selector}"))
            })
    }
}

#[async_trait]
impl BrowserDriver for WebDriverClient {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.post("/url", json!({ "url": url })).await?;
        Ok(())
    }

    async fn wait_for(&self, selector: &Selector, timeout: Duration) -> Result<(), DriverError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.find_element(selector).await {
                Ok(_) => return Ok(()),
                // Transport failures are not retried; an absent element is.
                Err(DriverError::Http(e)) => return Err(DriverError::Http(e)),
                Err(_) if Instant::now() >= deadline => {
                    return Err(DriverError::WaitTimeout {
                        selector: selector.to_string(),
                        waited: timeout,
                    });
                }
                Err(_) => tokio::time::sleep(POLL_INTERVAL).await,
            }
        }
    }

    async fn click(&self, selector: &Selector) -> Result<(), DriverError> {
        let element = self.find_element(selector).await?;
        self.post(&format!("/element/{element}/click"), json!({}))
            .await?;
        Ok(())
    }

    async fn type_text(&self, selector: &Selector, text: &str) -> Result<(), DriverError> {
        let element = self.find_element(selector).await?;
        self.post(
            &format!("/element/{element}/value"),
            json!({ "text": text }),
        )
        .await?;
        Ok(())
    }

    async fn cookies(&self) -> Result<SessionCookies, DriverError> {
        let value = self.get("/cookie").await?;
        let entries = value
            .as_array()
            .ok_or_else(|| DriverError::Protocol("cookie response is not an array".to_string()))?;

        let mut cookies = SessionCookies::new();
        for entry in entries {
            if let (Some(name), Some(value)) = (
                entry.get("name").and_then(Value::as_str),
                entry.get("value").and_then(Value::as_str),
            ) {
                cookies.insert(name.to_string(), value.to_string());
            }
        }
        Ok(cookies)
    }

    async fn quit(&self) -> Result<(), DriverError> {
        let response = self.http.delete(&self.session_url).send().await?;
        unwrap_value(response).await?;
        Ok(())
    }
}

/// Factory handing one fresh chromedriver session to each cycle.
#[derive(Debug, Clone)]
pub struct WebDriverFactory {
    webdriver_url: String,
}

impl WebDriverFactory {
    pub fn new(webdriver_url: impl Into<String>) -> Self {
        Self {
            webdriver_url: webdriver_url.into(),
        }
    }
}

#[async_trait]
impl DriverFactory for WebDriverFactory {
    type Driver = WebDriverClient;

    async fn launch(&self) -> Result<WebDriverClient, DriverError> {
        WebDriverClient::launch(&self.webdriver_url).await
    }
}

/// Map a [`Selector`] to a W3C locator strategy. `Name` has no native
/// strategy and is expressed as an attribute CSS selector.
fn locator(selector: &Selector) -> (&'static str, String) {
    match selector {
        Selector::Name(name) => ("css selector", format!(r#"[name="{name}"]"#)),
        Selector::XPath(xpath) => ("xpath", xpath.clone()),
    }
}

/// Decode a WebDriver response envelope, mapping error payloads to
/// [`DriverError::Protocol`].
async fn unwrap_value(response: reqwest::Response) -> Result<Value, DriverError> {
    let status = response.status();
    let body: Value = response.json().await?;

    if !status.is_success() {
        let message = body
            .pointer("/value/message")
            .and_then(Value::as_str)
            .unwrap_or("unknown WebDriver error");
        let error = body
            .pointer("/value/error")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        return Err(DriverError::Protocol(format!(
            "{error} ({status}): {message}"
        )));
    }

    Ok(body.get("value").cloned().unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_mapping() {
        let (using, value) = locator(&Selector::name("username"));
        assert_eq!(using, "css selector");
        assert_eq!(value, r#"[name="username"]"#);

        let (using, value) = locator(&Selector::xpath("//span"));
        assert_eq!(using, "xpath");
        assert_eq!(value, "//span");
    }

    #[tokio::test]
    async fn test_launch_rejects_missing_session_id() {
        // chromedriver answering 200 without a sessionId is a protocol error
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/session"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_json(json!({ "value": {} })),
            )
            .mount(&server)
            .await;

        let err = WebDriverClient::launch(&server.uri()).await.unwrap_err();
        assert!(matches!(err, DriverError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_wait_for_times_out_on_absent_element() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/session"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(json!({
                "value": { "sessionId": "s1", "capabilities": {} }
            })))
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/session/s1/element"))
            .respond_with(wiremock::ResponseTemplate::new(404).set_body_json(json!({
                "value": { "error": "no such element", "message": "not found" }
            })))
            .mount(&server)
            .await;

        let client = WebDriverClient::launch(&server.uri()).await.unwrap();
        let err = client
            .wait_for(&Selector::name("submitB"), Duration::from_millis(300))
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::WaitTimeout { .. }));
    }
}
