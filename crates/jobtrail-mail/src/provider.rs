//! Gmail-style mail provider client.
//!
//! Speaks the provider's REST surface with a caller-supplied OAuth access
//! token. A 401 maps to [`Error::TokenExpired`] so orchestrators can abort
//! a scan instead of burning the remaining window on a dead token; every
//! other upstream failure maps to [`Error::Mail`] and is retriable
//! per-message.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use jobtrail_core::defaults::MAIL_TIMEOUT_SECS;
use jobtrail_core::{Error, MailProvider, MessageRef, ProviderMessage, Result};

/// Default provider API base.
pub const DEFAULT_MAIL_API_URL: &str = "https://gmail.googleapis.com/gmail/v1";

/// HTTP mail provider client.
pub struct HttpMailProvider {
    client: Client,
    base_url: String,
}

impl HttpMailProvider {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_MAIL_API_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        let timeout_secs = std::env::var("JOBTRAIL_MAIL_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(MAIL_TIMEOUT_SECS);

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, base_url }
    }

    fn map_status(status: StatusCode, op: &str) -> Error {
        if status == StatusCode::UNAUTHORIZED {
            Error::TokenExpired
        } else {
            Error::Mail(format!("{op} returned {status}"))
        }
    }
}

impl Default for HttpMailProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    messages: Vec<ListEntry>,
}

#[derive(Deserialize)]
struct ListEntry {
    id: String,
    #[serde(rename = "threadId")]
    thread_id: Option<String>,
}

#[derive(Deserialize)]
struct RawMessage {
    id: String,
    #[serde(rename = "threadId")]
    thread_id: Option<String>,
    #[serde(default, rename = "labelIds")]
    label_ids: Vec<String>,
    payload: Option<Payload>,
}

#[derive(Deserialize, Default)]
struct Payload {
    #[serde(default)]
    headers: Vec<Header>,
    #[serde(rename = "mimeType")]
    mime_type: Option<String>,
    body: Option<Body>,
    #[serde(default)]
    parts: Vec<Payload>,
}

#[derive(Deserialize)]
struct Header {
    name: String,
    value: String,
}

#[derive(Deserialize, Default)]
struct Body {
    data: Option<String>,
}

impl Payload {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// Walk the MIME tree for the first text/plain part, falling back to
    /// the top-level body when the message is not multipart.
    fn plain_text(&self) -> Option<String> {
        if self.mime_type.as_deref() == Some("text/plain") {
            if let Some(data) = self.body.as_ref().and_then(|b| b.data.as_deref()) {
                return decode_body(data);
            }
        }
        for part in &self.parts {
            if let Some(text) = part.plain_text() {
                return Some(text);
            }
        }
        if self.parts.is_empty() {
            if let Some(data) = self.body.as_ref().and_then(|b| b.data.as_deref()) {
                return decode_body(data);
            }
        }
        None
    }
}

/// Decode a base64url-encoded body part into UTF-8 text. The provider
/// emits unpadded base64url; padded input is accepted too.
fn decode_body(data: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD
        .decode(data)
        .or_else(|_| URL_SAFE.decode(data))
        .ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// Split a `To:` header into individual addresses.
fn split_addresses(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[async_trait]
impl MailProvider for HttpMailProvider {
    async fn list_messages(
        &self,
        access_token: &str,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<MessageRef>> {
        let response = self
            .client
            .get(format!("{}/users/me/messages", self.base_url))
            .bearer_auth(access_token)
            .query(&[("q", query), ("maxResults", &max_results.to_string())])
            .send()
            .await
            .map_err(|e| Error::Mail(format!("list request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::map_status(response.status(), "list_messages"));
        }

        let body: ListResponse = response
            .json()
            .await
            .map_err(|e| Error::Mail(format!("malformed list response: {e}")))?;

        debug!(
            subsystem = "mail",
            op = "list_messages",
            total = body.messages.len(),
            "Listed provider messages"
        );

        Ok(body
            .messages
            .into_iter()
            .map(|m| MessageRef {
                id: m.id,
                thread_id: m.thread_id,
            })
            .collect())
    }

    async fn get_message(&self, access_token: &str, id: &str) -> Result<ProviderMessage> {
        let response = self
            .client
            .get(format!("{}/users/me/messages/{id}", self.base_url))
            .bearer_auth(access_token)
            .query(&[("format", "full")])
            .send()
            .await
            .map_err(|e| Error::Mail(format!("get request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::map_status(response.status(), "get_message"));
        }

        let raw: RawMessage = response
            .json()
            .await
            .map_err(|e| Error::Mail(format!("malformed message response: {e}")))?;

        let payload = raw.payload.unwrap_or_default();
        let body = payload.plain_text().unwrap_or_else(|| {
            warn!(
                subsystem = "mail",
                message_id = %raw.id,
                "No text/plain part found, using empty body"
            );
            String::new()
        });

        Ok(ProviderMessage {
            id: raw.id,
            thread_id: raw.thread_id,
            subject: payload.header("Subject").unwrap_or_default().to_string(),
            from: payload.header("From").unwrap_or_default().to_string(),
            to: payload
                .header("To")
                .map(split_addresses)
                .unwrap_or_default(),
            date: payload.header("Date").unwrap_or_default().to_string(),
            body,
            labels: raw.label_ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn encode(text: &str) -> String {
        URL_SAFE.encode(text)
    }

    #[tokio::test]
    async fn test_list_messages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me/messages"))
            .and(query_param("q", "newer_than:30d"))
            .and(query_param("maxResults", "100"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messages": [
                    {"id": "m1", "threadId": "t1"},
                    {"id": "m2"}
                ]
            })))
            .mount(&server)
            .await;

        let provider = HttpMailProvider::with_base_url(server.uri());
        let refs = provider
            .list_messages("tok", "newer_than:30d", 100)
            .await
            .unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].thread_id.as_deref(), Some("t1"));
        assert!(refs[1].thread_id.is_none());
    }

    #[tokio::test]
    async fn test_list_empty_result_omits_messages_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resultSizeEstimate": 0})))
            .mount(&server)
            .await;

        let provider = HttpMailProvider::with_base_url(server.uri());
        let refs = provider.list_messages("tok", "q", 10).await.unwrap();
        assert!(refs.is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_token_expired() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me/messages"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let provider = HttpMailProvider::with_base_url(server.uri());
        let err = provider.list_messages("stale", "q", 10).await.unwrap_err();
        assert!(matches!(err, Error::TokenExpired));
    }

    #[tokio::test]
    async fn test_server_error_maps_to_mail_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me/messages/m1"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let provider = HttpMailProvider::with_base_url(server.uri());
        let err = provider.get_message("tok", "m1").await.unwrap_err();
        assert!(matches!(err, Error::Mail(_)));
    }

    #[tokio::test]
    async fn test_get_message_multipart_plain_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me/messages/m1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "m1",
                "threadId": "t1",
                "labelIds": ["INBOX"],
                "payload": {
                    "mimeType": "multipart/alternative",
                    "headers": [
                        {"name": "Subject", "value": "Interview"},
                        {"name": "From", "value": "jane@acme.io"},
                        {"name": "To", "value": "me@example.com, other@example.com"},
                        {"name": "Date", "value": "2024-03-04T10:00:00Z"}
                    ],
                    "parts": [
                        {"mimeType": "text/html", "body": {"data": encode("<p>hi</p>")}},
                        {"mimeType": "text/plain", "body": {"data": encode("Are you free Monday?")}}
                    ]
                }
            })))
            .mount(&server)
            .await;

        let provider = HttpMailProvider::with_base_url(server.uri());
        let msg = provider.get_message("tok", "m1").await.unwrap();
        assert_eq!(msg.subject, "Interview");
        assert_eq!(msg.body, "Are you free Monday?");
        assert_eq!(msg.to, vec!["me@example.com", "other@example.com"]);
        assert_eq!(msg.thread_id.as_deref(), Some("t1"));
        assert_eq!(msg.labels, vec!["INBOX"]);
    }

    #[tokio::test]
    async fn test_get_message_single_part_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me/messages/m2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "m2",
                "payload": {
                    "mimeType": "text/plain",
                    "headers": [{"name": "From", "value": "hr@corp.com"}],
                    "body": {"data": encode("plain body")}
                }
            })))
            .mount(&server)
            .await;

        let provider = HttpMailProvider::with_base_url(server.uri());
        let msg = provider.get_message("tok", "m2").await.unwrap();
        assert_eq!(msg.body, "plain body");
        assert_eq!(msg.from, "hr@corp.com");
    }

    #[test]
    fn test_split_addresses() {
        assert_eq!(
            split_addresses("a@x.com, b@y.com ,, c@z.com"),
            vec!["a@x.com", "b@y.com", "c@z.com"]
        );
    }
}
