//! Browser seam for the page-object layer.
//!
//! Widgets and views never talk to a driver directly; they go through the
//! [`Browser`] trait held by a [`Session`]. [`WebDriverBrowser`] speaks the W3C
//! WebDriver protocol, [`MockBrowser`] is an in-memory document used by tests.

mod mock;
mod webdriver;

pub use mock::{ClickEffect, MockBrowser, MockNode};
pub use webdriver::WebDriverBrowser;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::wait::WaitConfig;

/// How to find an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// Element id attribute.
    Id(String),
    /// CSS selector.
    Css(String),
    /// XPath expression; relative expressions start with `.`.
    XPath(String),
}

impl Locator {
    /// Locates by id attribute.
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// Locates by CSS selector.
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Locates by XPath.
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    /// `<option>` of a select whose value attribute is `value`.
    pub fn option_value(value: &str) -> Self {
        Self::css(format!("option[value={}]", css_string(value)))
    }

    /// `<input>` below the scope element whose value attribute is `value`.
    pub fn input_value(value: &str) -> Self {
        Self::xpath(format!(".//input[@value={}]", xpath_literal(value)))
    }
}

/// Quotes `value` as a CSS string.
pub fn css_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' | '\\' => {
                quoted.push('\\');
                quoted.push(c);
            }
            '\n' => quoted.push_str("\\a "),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Quotes `value` as an XPath 1.0 literal. XPath has no escapes, so a value
/// holding both quote kinds is spliced together with `concat()`.
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('"') {
        return format!("\"{}\"", value);
    }
    if !value.contains('\'') {
        return format!("'{}'", value);
    }
    let parts: Vec<String> = value
        .split('"')
        .map(|part| format!("\"{}\"", part))
        .collect();
    format!("concat({})", parts.join(", '\"', "))
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Id(id) => write!(f, "id={}", id),
            Locator::Css(css) => write!(f, "css={}", css),
            Locator::XPath(xpath) => write!(f, "xpath={}", xpath),
        }
    }
}

/// Opaque handle to an element the driver has located.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(pub String);

/// A browser driver.
///
/// Calls block the test until the driver answers; no two calls for the same
/// view are issued concurrently.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Loads `url` in the current window.
    async fn open(&self, url: &str) -> Result<()>;

    /// Returns the URL currently loaded.
    async fn current_url(&self) -> Result<String>;

    /// Finds every element matching `locator`, inside `scope` when given.
    async fn find_all(&self, scope: Option<&ElementRef>, locator: &Locator)
        -> Result<Vec<ElementRef>>;

    /// Whether the element is rendered and visible.
    async fn is_displayed(&self, element: &ElementRef) -> Result<bool>;

    /// Clicks the element.
    async fn click(&self, element: &ElementRef) -> Result<()>;

    /// Clears a text field.
    async fn clear(&self, element: &ElementRef) -> Result<()>;

    /// Types into a text field.
    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<()>;

    /// Returns the rendered text.
    async fn text(&self, element: &ElementRef) -> Result<String>;

    /// Returns a DOM property (`value`, `checked`, ...).
    async fn property(&self, element: &ElementRef, name: &str) -> Result<Option<String>>;

    /// Accepts the open confirmation dialog.
    async fn accept_alert(&self) -> Result<()>;

    /// Returns the name of this driver.
    fn name(&self) -> &str;
}

/// A browser bound to the admin portal it tests.
#[derive(Clone)]
pub struct Session {
    browser: Arc<dyn Browser>,
    base_url: String,
    wait: WaitConfig,
}

impl Session {
    /// Creates a session rooted at `base_url`.
    pub fn new(browser: Arc<dyn Browser>, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            browser,
            base_url: base_url.trim_end_matches('/').to_string(),
            wait: WaitConfig::default(),
        }
    }

    /// Sets the wait limits used by widgets and navigation.
    pub fn with_wait(mut self, wait: WaitConfig) -> Self {
        self.wait = wait;
        self
    }

    /// Returns the driver.
    pub fn browser(&self) -> &dyn Browser {
        self.browser.as_ref()
    }

    /// Returns the portal base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the wait limits.
    pub fn wait(&self) -> &WaitConfig {
        &self.wait
    }

    /// Loads a portal path.
    pub async fn open(&self, path: &str) -> Result<()> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "opening");
        self.browser.open(&url).await
    }

    /// Returns the browser's current URL.
    pub async fn current_url(&self) -> Result<String> {
        self.browser.current_url().await
    }

    /// Whether the current location is `path`.
    ///
    /// A failed URL read counts as "not there".
    pub async fn at_path(&self, path: &str) -> bool {
        match self.browser.current_url().await {
            Ok(url) => location_matches(&url, path),
            Err(_) => false,
        }
    }
}

/// Whether `url` points at `path`, ignoring query, fragment and trailing
/// slash. `path` matches when it is a `/`-aligned suffix of the URL path, so
/// a prefix the portal is mounted under is allowed but a partial segment is
/// not.
pub fn location_matches(url: &str, path: &str) -> bool {
    let current = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };
    let current = current.trim_end_matches('/');
    let path = path.trim_matches('/');

    if path.is_empty() {
        return current.is_empty();
    }
    current.ends_with(&format!("/{}", path))
}
