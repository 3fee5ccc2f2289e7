//! W3C WebDriver implementation of [`Browser`].

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};

use crate::error::{Error, Result};

use super::{Browser, ElementRef, Locator};

/// Key under which W3C drivers return element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Maps a locator to the W3C `using`/`value` pair.
fn strategy(locator: &Locator) -> (&'static str, String) {
    match locator {
        Locator::Id(id) => ("css selector", format!("[id=\"{}\"]", id)),
        Locator::Css(css) => ("css selector", css.clone()),
        Locator::XPath(xpath) => ("xpath", xpath.clone()),
    }
}

fn parse_elements(value: &Value) -> Result<Vec<ElementRef>> {
    let items = value
        .as_array()
        .ok_or_else(|| Error::WebDriver(format!("expected element list, got {}", value)))?;

    items
        .iter()
        .map(|item| {
            item.get(ELEMENT_KEY)
                .and_then(Value::as_str)
                .map(|id| ElementRef(id.to_string()))
                .ok_or_else(|| Error::WebDriver(format!("malformed element reference: {}", item)))
        })
        .collect()
}

fn driver_error(status: reqwest::StatusCode, body: &Value) -> Error {
    let value = body.get("value").unwrap_or(body);
    let kind = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");
    let message = value.get("message").and_then(Value::as_str).unwrap_or("");

    match kind {
        "no such element" | "stale element reference" => Error::ElementNotFound(message.to_string()),
        "element not interactable" | "element click intercepted" => {
            Error::NotInteractable(message.to_string())
        }
        _ => Error::WebDriver(format!("{} ({}): {}", kind, status.as_u16(), message)),
    }
}

/// A WebDriver session (chromedriver, geckodriver or a Selenium grid).
pub struct WebDriverBrowser {
    http: reqwest::Client,
    base: String,
    session_id: String,
}

impl WebDriverBrowser {
    /// Starts a new session on the driver at `webdriver_url`.
    pub async fn connect(webdriver_url: &str, browser_name: &str) -> Result<Self> {
        let http = reqwest::Client::new();
        let base = webdriver_url.trim_end_matches('/').to_string();

        let capabilities = json!({
            "capabilities": { "alwaysMatch": { "browserName": browser_name } }
        });
        let response = http
            .post(format!("{}/session", base))
            .json(&capabilities)
            .send()
            .await?;
        let status = response.status();
        let body: Value = response.json().await?;
        if !status.is_success() {
            return Err(driver_error(status, &body));
        }

        let session_id = body["value"]["sessionId"]
            .as_str()
            .ok_or_else(|| Error::WebDriver("new session response has no sessionId".to_string()))?
            .to_string();

        tracing::info!(driver = %base, session = %session_id, browser = %browser_name, "started webdriver session");
        Ok(Self {
            http,
            base,
            session_id,
        })
    }

    /// Ends the session and closes the browser.
    pub async fn quit(&self) -> Result<()> {
        self.command(Method::DELETE, "", None).await?;
        tracing::info!(session = %self.session_id, "ended webdriver session");
        Ok(())
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}/session/{}{}", self.base, self.session_id, path);
        let mut request = self.http.request(method, &url);
        // POST commands require a JSON body even when they take no parameters.
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let payload: Value = response.json().await?;
        if !status.is_success() {
            return Err(driver_error(status, &payload));
        }
        Ok(payload.get("value").cloned().unwrap_or(Value::Null))
    }

    fn element_path(element: &ElementRef, suffix: &str) -> String {
        format!("/element/{}{}", element.0, suffix)
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn open(&self, url: &str) -> Result<()> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let value = self.command(Method::GET, "/url", None).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::WebDriver(format!("unexpected url value: {}", value)))
    }

    async fn find_all(
        &self,
        scope: Option<&ElementRef>,
        locator: &Locator,
    ) -> Result<Vec<ElementRef>> {
        let (using, value) = strategy(locator);
        let path = match scope {
            Some(element) => Self::element_path(element, "/elements"),
            None => "/elements".to_string(),
        };
        let found = self
            .command(
                Method::POST,
                &path,
                Some(json!({ "using": using, "value": value })),
            )
            .await?;
        parse_elements(&found)
    }

    async fn is_displayed(&self, element: &ElementRef) -> Result<bool> {
        let value = self
            .command(Method::GET, &Self::element_path(element, "/displayed"), None)
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn click(&self, element: &ElementRef) -> Result<()> {
        self.command(
            Method::POST,
            &Self::element_path(element, "/click"),
            Some(json!({})),
        )
        .await?;
        Ok(())
    }

    async fn clear(&self, element: &ElementRef) -> Result<()> {
        self.command(
            Method::POST,
            &Self::element_path(element, "/clear"),
            Some(json!({})),
        )
        .await?;
        Ok(())
    }

    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<()> {
        self.command(
            Method::POST,
            &Self::element_path(element, "/value"),
            Some(json!({ "text": text })),
        )
        .await?;
        Ok(())
    }

    async fn text(&self, element: &ElementRef) -> Result<String> {
        let value = self
            .command(Method::GET, &Self::element_path(element, "/text"), None)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn property(&self, element: &ElementRef, name: &str) -> Result<Option<String>> {
        let value = self
            .command(
                Method::GET,
                &Self::element_path(element, &format!("/property/{}", name)),
                None,
            )
            .await?;
        Ok(match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
    }

    async fn accept_alert(&self) -> Result<()> {
        self.command(Method::POST, "/alert/accept", Some(json!({})))
            .await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "webdriver"
    }
}
