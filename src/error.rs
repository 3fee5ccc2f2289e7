//! Error types for the test kit.

use std::time::Duration;

use thiserror::Error;

/// Top-level error type for UI, HTTP and fixture operations.
#[derive(Error, Debug)]
pub enum Error {
    /// An HTTP endpoint answered with something other than 200.
    #[error("request to {url} failed with status {status}")]
    HttpStatus { url: String, status: u16 },

    /// Transport-level HTTP failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A response body could not be decoded.
    #[error("failed to decode JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A base URL or joined URL was malformed.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// No element matched the locator.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// The element exists but is not rendered or cannot receive input.
    #[error("element not interactable: {0}")]
    NotInteractable(String),

    /// A dropdown has no option with the requested value.
    #[error("option '{value}' not present in {locator}")]
    OptionNotFound { locator: String, value: String },

    /// A table has no row whose cell matches the key.
    #[error("no row in {table} has '{key}' in column {column}")]
    RowNotFound {
        table: String,
        column: usize,
        key: String,
    },

    /// A navigation hop did not arrive at the expected view.
    #[error("navigation to {target} failed at hop {hop}: {view} is not displayed")]
    Navigation {
        target: &'static str,
        hop: usize,
        view: &'static str,
    },

    /// A navigation hop's transition action failed.
    #[error("navigation to {target} failed at hop {hop} stepping onto {view}: {source}")]
    NavigationStep {
        target: &'static str,
        hop: usize,
        view: &'static str,
        #[source]
        source: Box<Error>,
    },

    /// The browser driver reported an error.
    #[error("webdriver error: {0}")]
    WebDriver(String),

    /// A bounded wait expired.
    #[error("timed out after {0:?} waiting for {1}")]
    Timeout(Duration, String),

    /// Cluster CLI operation failed.
    #[error("cluster operation failed: {0}")]
    Cluster(String),

    /// Suite configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// One or more finalizers failed; every finalizer was still run.
    #[error("{} teardown failure(s): {}", .0.len(), .0.join("; "))]
    Teardown(Vec<String>),

    /// A pooled task panicked or was cancelled.
    #[error("worker task failed: {0}")]
    Worker(String),
}

/// Result type alias for test kit operations.
pub type Result<T> = std::result::Result<T, Error>;
