//! Client for the Mailhog mail-capture API.
//!
//! The platform sends notification mail to a Mailhog instance running in the
//! same cluster; tests read the captured messages back through its HTTP API.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::fixtures::cluster::Cluster;

/// Default page size of [`MailClient::messages`].
pub const DEFAULT_LIMIT: usize = 25;

/// A mailbox address split the way Mailhog reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Path {
    pub mailbox: String,
    pub domain: String,
    pub params: String,
    pub relays: Option<Vec<String>>,
}

impl Path {
    /// Returns `mailbox@domain`.
    pub fn address(&self) -> String {
        format!("{}@{}", self.mailbox, self.domain)
    }
}

/// Parsed headers and body of a message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Content {
    pub headers: HashMap<String, Vec<String>>,
    pub body: String,
    pub size: u64,
}

/// The SMTP conversation as received.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Raw {
    pub from: String,
    pub to: Vec<String>,
    pub data: String,
    pub helo: String,
}

/// One captured message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Message {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(default)]
    pub from: Path,
    #[serde(default)]
    pub to: Vec<Path>,
    #[serde(default)]
    pub content: Content,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub raw: Raw,
    #[serde(rename = "MIME", default)]
    pub mime: serde_json::Value,
}

impl Message {
    /// Returns the first value of a header, if present.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.content
            .headers
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns the `Subject` header.
    pub fn subject(&self) -> Option<&str> {
        self.header("Subject")
    }

    /// Parses the capture timestamp.
    pub fn created_at(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.created).ok()
    }
}

/// One page of captured messages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    pub total: usize,
    pub count: usize,
    pub start: usize,
    pub items: Vec<Message>,
}

impl Messages {
    /// Returns messages whose subject contains `needle`.
    pub fn with_subject<'a>(&'a self, needle: &'a str) -> impl Iterator<Item = &'a Message> + 'a {
        self.items
            .iter()
            .filter(move |m| m.subject().is_some_and(|s| s.contains(needle)))
    }
}

/// Mailhog escapes quotes inside nested JSON strings with two backslashes,
/// which makes the body invalid JSON. The whole body is patched blindly,
/// matching the upstream defect byte-for-byte.
pub fn repair_escaped_quotes(body: &str) -> String {
    body.replace(r#"\\""#, r#"\""#)
}

/// Wrapper for the Mailhog API.
#[derive(Debug, Clone)]
pub struct MailClient {
    base: Url,
    http: reqwest::Client,
}

impl MailClient {
    /// Creates a client for the Mailhog instance at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .build()?;
        let mut base = Url::parse(base_url)?;
        // Endpoints are joined relative to the base, which must end in '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base, http })
    }

    /// Creates a client for the route exposing `service_name` in the cluster.
    pub async fn for_service(cluster: &dyn Cluster, service_name: &str) -> Result<Self> {
        let host = cluster.route_host(service_name).await?;
        Self::new(&format!("http://{}", host))
    }

    /// Base URL of the Mailhog app.
    pub fn url(&self) -> &str {
        self.base.as_str()
    }

    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<String> {
        let url = self.base.join(endpoint)?;
        tracing::debug!(method = %method, url = %url, "mailhog request");

        let response = self
            .http
            .request(method, url.clone())
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }

    /// Fetches captured messages, `limit` at a time starting at `start`.
    pub async fn messages(&self, start: usize, limit: usize) -> Result<Messages> {
        let params = [("start", start.to_string()), ("limit", limit.to_string())];
        let body = self.request(Method::GET, "api/v2/messages", &params).await?;
        let messages: Messages = serde_json::from_str(&repair_escaped_quotes(&body))?;
        tracing::debug!(count = messages.count, total = messages.total, "fetched mail");
        Ok(messages)
    }

    /// Deletes every captured message.
    pub async fn delete(&self) -> Result<()> {
        self.request(Method::DELETE, "api/v1/messages", &[]).await?;
        tracing::info!(url = %self.base, "cleared mailbox");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repair_unblocks_nested_quotes() {
        let raw = r#"{"total":1,"count":1,"start":0,"items":[{"ID":"a@mailhog","Content":{"Headers":{"Subject":["Welcome"]},"Body":"{\\"Subject\\": \\"Welcome\\"}","Size":10}}]}"#;
        assert!(serde_json::from_str::<Messages>(raw).is_err());

        let messages: Messages = serde_json::from_str(&repair_escaped_quotes(raw)).unwrap();
        let body: serde_json::Value =
            serde_json::from_str(&messages.items[0].content.body).unwrap();
        assert_eq!(body["Subject"], "Welcome");
    }

    #[test]
    fn repair_applies_outside_offending_field() {
        let raw = r#"{"a":"x\\"y","b":"\\""}"#;
        assert_eq!(repair_escaped_quotes(raw), r#"{"a":"x\"y","b":"\""}"#);
    }

    #[test]
    fn message_exposes_headers_and_timestamp() {
        let json = r#"{
            "ID": "1@mailhog.example",
            "From": {"Mailbox": "noreply", "Domain": "example.com", "Params": "", "Relays": null},
            "To": [{"Mailbox": "dev", "Domain": "example.com", "Params": ""}],
            "Content": {"Headers": {"Subject": ["Application created"], "To": ["dev@example.com"]}, "Body": "hi", "Size": 2},
            "Created": "2023-04-07T13:25:43.187543296+01:00",
            "MIME": null,
            "Raw": {"From": "noreply@example.com", "To": ["dev@example.com"], "Data": "...", "Helo": "mail"}
        }"#;
        let message: Message = serde_json::from_str(json).unwrap();

        assert_eq!(message.subject(), Some("Application created"));
        assert_eq!(message.from.address(), "noreply@example.com");
        assert_eq!(message.to[0].address(), "dev@example.com");
        assert!(message.created_at().is_some());
        assert_eq!(message.header("X-Missing"), None);
    }

    #[test]
    fn subject_filter_matches_substring() {
        let messages: Messages = serde_json::from_str(
            r#"{"total":2,"count":2,"start":0,"items":[
                {"ID":"1","Content":{"Headers":{"Subject":["Account approved"]}}},
                {"ID":"2","Content":{"Headers":{"Subject":["Password reset"]}}}
            ]}"#,
        )
        .unwrap();

        let ids: Vec<&str> = messages
            .with_subject("approved")
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(ids, vec!["1"]);
    }

    #[test]
    fn base_path_is_kept_when_joining() {
        let client = MailClient::new("http://mail.test/mailhog").unwrap();
        assert_eq!(client.url(), "http://mail.test/mailhog/");
        assert_eq!(
            client.base.join("api/v2/messages").unwrap().as_str(),
            "http://mail.test/mailhog/api/v2/messages"
        );
    }

    #[test]
    fn client_rejects_invalid_base() {
        assert!(matches!(MailClient::new("not a url"), Err(Error::Url(_))));
    }
}
