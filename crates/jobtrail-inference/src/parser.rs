//! Ollama-backed structured mail extraction.
//!
//! Sends the raw correspondence text plus nearby-thread candidates to a
//! chat-completion endpoint with JSON format enforcement, and decodes the
//! reply into a [`ParsedEmailDraft`]. Model output is untrusted: the draft
//! is advisory (thread match, company guess) and never overrides the
//! deterministic classifier downstream.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use jobtrail_core::defaults::{MAX_PROMPT_CHARS, PARSER_MODEL, PARSER_TIMEOUT_SECS, PARSER_URL};
use jobtrail_core::{Error, MailParser, ParsedEmailDraft, Result, ThreadContext};

/// Chat-completion mail parser backend.
pub struct HttpMailParser {
    client: Client,
    base_url: String,
    model: String,
    timeout_secs: u64,
    max_prompt_chars: usize,
}

impl HttpMailParser {
    /// Create a parser with default settings.
    pub fn new() -> Self {
        Self::with_config(PARSER_URL.to_string(), PARSER_MODEL.to_string())
    }

    /// Create a parser with custom endpoint and model.
    pub fn with_config(base_url: String, model: String) -> Self {
        let timeout_secs = std::env::var("JOBTRAIL_PARSER_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(PARSER_TIMEOUT_SECS);

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        info!(
            "Initializing mail parser backend: url={}, model={}",
            base_url, model
        );

        Self {
            client,
            base_url,
            model,
            timeout_secs,
            max_prompt_chars: MAX_PROMPT_CHARS,
        }
    }

    /// Create from environment variables (`JOBTRAIL_PARSER_URL`,
    /// `JOBTRAIL_PARSER_MODEL`).
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("JOBTRAIL_PARSER_URL").unwrap_or_else(|_| PARSER_URL.to_string());
        let model =
            std::env::var("JOBTRAIL_PARSER_MODEL").unwrap_or_else(|_| PARSER_MODEL.to_string());
        Self::with_config(base_url, model)
    }

    fn build_prompt(&self, raw_text: &str, context: &[ThreadContext]) -> String {
        let truncated = truncate_chars(raw_text, self.max_prompt_chars);

        let mut prompt = String::from(
            "Extract structured fields from this job-search email.\n\
             Respond with a single JSON object with keys: subject, from, to \
             (array), body, date (ISO 8601 or null), category_guess, \
             company_guess, matches_existing_thread (boolean), \
             existing_thread_id.\n",
        );

        if !context.is_empty() {
            prompt.push_str(
                "\nExisting conversation threads that may match this email. \
                 If the email continues one of them, set matches_existing_thread \
                 to true and existing_thread_id to its id; otherwise set it to \
                 false and existing_thread_id to null.\n",
            );
            for ctx in context {
                prompt.push_str(&format!(
                    "- id={} subject={:?} company={:?} latest={}\n",
                    ctx.thread_id,
                    ctx.subject,
                    ctx.company_name.as_deref().unwrap_or("unknown"),
                    ctx.latest_date
                ));
            }
        }

        prompt.push_str("\nEmail:\n");
        prompt.push_str(truncated);
        prompt
    }

    fn decode_draft(content: &str) -> Result<ParsedEmailDraft> {
        match serde_json::from_str(content) {
            Ok(draft) => Ok(draft),
            Err(first_err) => {
                // Some models wrap the object in prose or a code fence.
                // Salvage the outermost brace-delimited block before giving up.
                if let Some(block) = extract_json_block(content) {
                    if let Ok(draft) = serde_json::from_str(block) {
                        return Ok(draft);
                    }
                }
                Err(Error::Inference(format!(
                    "Failed to parse extraction output: {first_err}"
                )))
            }
        }
    }
}

impl Default for HttpMailParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Truncate at a char boundary at or below `max_chars`.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Find the outermost `{ .. }` block in model output.
fn extract_json_block(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end > start {
        Some(&content[start..=end])
    } else {
        None
    }
}

/// Chat API message for `/api/chat`.
#[derive(Serialize, Deserialize, Clone)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Request payload for the chat endpoint.
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    /// Format enforcement. Set to `"json"` for guaranteed valid JSON output.
    format: serde_json::Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[async_trait]
impl MailParser for HttpMailParser {
    async fn parse_email(
        &self,
        raw_text: &str,
        context: &[ThreadContext],
    ) -> Result<ParsedEmailDraft> {
        let start = Instant::now();
        let prompt = self.build_prompt(raw_text, context);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.clone(),
            }],
            stream: false,
            format: serde_json::Value::String("json".to_string()),
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Inference(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Inference(format!(
                "Parser backend returned {status}: {body}"
            )));
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("Failed to parse response: {e}")))?;

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(
            subsystem = "inference",
            op = "parse_email",
            prompt_len = prompt.len(),
            context_count = context.len(),
            duration_ms = elapsed,
            "Extraction complete"
        );
        if elapsed > 30_000 {
            warn!(
                duration_ms = elapsed,
                prompt_len = prompt.len(),
                slow = true,
                "Slow extraction operation"
            );
        }

        Self::decode_draft(&result.message.content)
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(Duration::from_secs(5))
            .send()
            .await;
        Ok(matches!(response, Ok(r) if r.status().is_success()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobtrail_core::MessageCategory;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chat_reply(content: serde_json::Value) -> serde_json::Value {
        json!({"message": {"role": "assistant", "content": content.to_string()}})
    }

    #[tokio::test]
    async fn test_parse_email_decodes_draft() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(json!({
                "subject": "Interview availability",
                "from": "jane@acme.io",
                "to": ["me@example.com"],
                "body": "Are you free Monday?",
                "date": "2024-03-04T10:00:00Z",
                "category_guess": "interview_scheduling",
                "matches_existing_thread": true,
                "existing_thread_id": "t-acme-1"
            }))))
            .mount(&server)
            .await;

        let parser = HttpMailParser::with_config(server.uri(), "test-model".to_string());
        let draft = parser.parse_email("raw email text", &[]).await.unwrap();
        assert_eq!(draft.from, "jane@acme.io");
        assert_eq!(
            draft.category_guess,
            Some(MessageCategory::InterviewScheduling)
        );
        assert!(draft.matches_existing_thread);
        assert_eq!(draft.existing_thread_id.as_deref(), Some("t-acme-1"));
    }

    #[tokio::test]
    async fn test_parse_email_salvages_fenced_json() {
        let server = MockServer::start().await;
        let fenced = "Here is the extraction:\n```json\n{\"subject\":\"Hi\",\"from\":\"a@b.c\",\"body\":\"text\"}\n```";
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"message": {"role": "assistant", "content": fenced}}),
            ))
            .mount(&server)
            .await;

        let parser = HttpMailParser::with_config(server.uri(), "test-model".to_string());
        let draft = parser.parse_email("raw", &[]).await.unwrap();
        assert_eq!(draft.subject, "Hi");
        assert!(!draft.matches_existing_thread);
    }

    #[tokio::test]
    async fn test_parse_email_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
            .mount(&server)
            .await;

        let parser = HttpMailParser::with_config(server.uri(), "test-model".to_string());
        let err = parser.parse_email("raw", &[]).await.unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
    }

    #[test]
    fn test_prompt_includes_thread_candidates() {
        let parser = HttpMailParser::with_config("http://localhost".into(), "m".into());
        let context = vec![ThreadContext {
            thread_id: "t-1".to_string(),
            subject: "Acme interview".to_string(),
            company_name: Some("Acme".to_string()),
            latest_date: "2024-03-01".to_string(),
        }];
        let prompt = parser.build_prompt("body text", &context);
        assert!(prompt.contains("id=t-1"));
        assert!(prompt.contains("Acme interview"));
        assert!(prompt.contains("body text"));
    }

    #[test]
    fn test_prompt_truncates_long_input() {
        let parser = HttpMailParser::with_config("http://localhost".into(), "m".into());
        let long = "x".repeat(MAX_PROMPT_CHARS * 2);
        let prompt = parser.build_prompt(&long, &[]);
        assert!(prompt.len() < MAX_PROMPT_CHARS + 1_000);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "héllo wörld".repeat(10);
        let out = truncate_chars(&text, 7);
        assert_eq!(out.chars().count(), 7);
    }

    #[test]
    fn test_extract_json_block() {
        assert_eq!(
            extract_json_block("noise {\"a\":1} trailing"),
            Some("{\"a\":1}")
        );
        assert_eq!(extract_json_block("no json here"), None);
    }
}
