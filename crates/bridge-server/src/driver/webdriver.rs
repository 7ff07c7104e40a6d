//! Automation driver speaking the W3C WebDriver protocol.
//!
//! Works against any WebDriver endpoint (chromedriver, geckodriver, a
//! Selenium grid). Each [`WebDriverSession`] owns one remote browser session
//! and deletes it on dispose.

use crate::config::DriverSection;
use async_trait::async_trait;
use base64::Engine;
use bridge_core::{AutomationDriver, BridgeError, BridgeResult, DriverFactory, Platform};
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Key under which WebDriver returns element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Delay between element lookups while waiting.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Envelope of every WebDriver response.
#[derive(Debug, Deserialize)]
struct WireResponse {
    value: Value,
}

/// Launches browser sessions on a WebDriver endpoint.
pub struct WebDriverFactory {
    client: Client,
    base_url: String,
    headless: bool,
    user_agent: Option<String>,
    request_timeout: Duration,
}

impl WebDriverFactory {
    /// `request_timeout` caps every HTTP exchange with the endpoint and
    /// should not exceed the registry's collaborator timeout.
    pub fn new(config: &DriverSection, request_timeout: Duration) -> BridgeResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| BridgeError::Other(format!("http client: {e}")))?;
        Ok(Self {
            client,
            request_timeout,
            base_url: config.webdriver_url.trim_end_matches('/').to_string(),
            headless: config.headless,
            user_agent: config.user_agent.clone(),
        })
    }

    fn capabilities(&self) -> Value {
        let mut args = vec![
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--window-size=1280,900".to_string(),
        ];
        if self.headless {
            args.push("--headless=new".to_string());
        }
        if let Some(ua) = &self.user_agent {
            args.push(format!("--user-agent={ua}"));
        }
        let firefox_args: Vec<&str> = if self.headless { vec!["-headless"] } else { vec![] };
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "goog:chromeOptions": { "args": args },
                    "moz:firefoxOptions": { "args": firefox_args }
                }
            }
        })
    }
}

#[async_trait]
impl DriverFactory for WebDriverFactory {
    async fn launch(&self, platform: Platform) -> BridgeResult<Box<dyn AutomationDriver>> {
        let url = format!("{}/session", self.base_url);
        debug!(platform = %platform, timeout_ms = self.request_timeout.as_millis() as u64, "creating browser session");
        let value = send(&self.client, Method::POST, &url, Some(self.capabilities())).await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| BridgeError::Driver("new session response lacks sessionId".into()))?
            .to_string();
        debug!(platform = %platform, webdriver_session = %session_id, "browser session created");
        Ok(Box::new(WebDriverSession {
            client: self.client.clone(),
            session_url: format!("{}/session/{session_id}", self.base_url),
            disposed: false,
        }))
    }
}

/// One remote browser session.
pub struct WebDriverSession {
    client: Client,
    session_url: String,
    disposed: bool,
}

impl WebDriverSession {
    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> BridgeResult<Value> {
        if self.disposed {
            return Err(BridgeError::Driver("browser session already disposed".into()));
        }
        let url = format!("{}{path}", self.session_url);
        send(&self.client, method, &url, body).await
    }

    async fn find(&self, selector: &str) -> BridgeResult<String> {
        let value = self
            .command(
                Method::POST,
                "/element",
                Some(json!({ "using": "css selector", "value": selector })),
            )
            .await?;
        element_id(&value)
    }

    async fn element_text(&self, element: &str) -> BridgeResult<String> {
        let value = self
            .command(Method::GET, &format!("/element/{element}/text"), None)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }
}

#[async_trait]
impl AutomationDriver for WebDriverSession {
    async fn open_target_site(&mut self, url: &str) -> BridgeResult<()> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await
            .map(|_| ())
    }

    async fn wait_for_element(&mut self, selector: &str, timeout: Duration) -> BridgeResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.find(selector).await {
                Ok(_) => return Ok(()),
                Err(e) if is_missing_element(&e) => {}
                Err(e) => return Err(e),
            }
            if Instant::now() + POLL_INTERVAL > deadline {
                return Err(BridgeError::CollaboratorTimeout(format!(
                    "element {selector} did not appear within {}ms",
                    timeout.as_millis()
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn capture_element(&mut self, selector: &str) -> BridgeResult<Vec<u8>> {
        let element = self.find(selector).await?;
        let value = self
            .command(Method::GET, &format!("/element/{element}/screenshot"), None)
            .await?;
        let encoded = value
            .as_str()
            .ok_or_else(|| BridgeError::Driver("screenshot response is not a string".into()))?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| BridgeError::Driver(format!("screenshot is not base64: {e}")))
    }

    async fn read_text(&mut self, selector: &str) -> BridgeResult<String> {
        let element = self.find(selector).await?;
        self.element_text(&element).await
    }

    async fn read_texts(&mut self, selector: &str, limit: usize) -> BridgeResult<Vec<String>> {
        let value = self
            .command(
                Method::POST,
                "/elements",
                Some(json!({ "using": "css selector", "value": selector })),
            )
            .await?;
        let elements = value.as_array().cloned().unwrap_or_default();
        let mut texts = Vec::with_capacity(elements.len().min(limit));
        for element in elements.iter().take(limit) {
            let id = element_id(element)?;
            texts.push(self.element_text(&id).await?);
        }
        Ok(texts)
    }

    async fn dispose(&mut self) -> BridgeResult<()> {
        if self.disposed {
            return Ok(());
        }
        self.disposed = true;
        send(&self.client, Method::DELETE, &self.session_url, None)
            .await
            .map(|_| ())
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        if !self.disposed {
            warn!(session = %self.session_url, "browser session dropped without dispose");
        }
    }
}

/// Issue one WebDriver command and unwrap its `value`.
async fn send(client: &Client, method: Method, url: &str, body: Option<Value>) -> BridgeResult<Value> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            BridgeError::CollaboratorTimeout(format!("webdriver request to {url}"))
        } else {
            BridgeError::Driver(format!("webdriver unreachable: {e}"))
        }
    })?;
    let status = response.status();
    let wire: WireResponse = response
        .json()
        .await
        .map_err(|e| BridgeError::Driver(format!("malformed webdriver response ({status}): {e}")))?;

    if status.is_success() {
        Ok(wire.value)
    } else {
        Err(wire_error(&wire.value, status.as_u16()))
    }
}

/// Map a WebDriver error payload onto a driver error.
fn wire_error(value: &Value, status: u16) -> BridgeError {
    let code = value.get("error").and_then(Value::as_str).unwrap_or("unknown error");
    let message = value.get("message").and_then(Value::as_str).unwrap_or("");
    match code {
        "timeout" | "script timeout" => BridgeError::CollaboratorTimeout(message.to_string()),
        _ => BridgeError::Driver(format!("{code} ({status}): {message}")),
    }
}

fn is_missing_element(err: &BridgeError) -> bool {
    matches!(err, BridgeError::Driver(msg) if msg.starts_with("no such element"))
}

fn element_id(value: &Value) -> BridgeResult<String> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| BridgeError::Driver("response carries no element reference".into()))
}
