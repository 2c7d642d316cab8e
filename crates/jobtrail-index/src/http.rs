//! HTTP vector index backend.
//!
//! Talks to an external similarity-search service over JSON. The index is a
//! derived, rebuildable cache: callers treat every failure here as
//! non-fatal and keep the primary store authoritative.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use jobtrail_core::defaults::INDEX_TIMEOUT_SECS;
use jobtrail_core::{Error, Result, ScoredMatch, VectorIndex, VectorRecord};

/// HTTP-backed vector index client.
pub struct HttpVectorIndex {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    timeout_secs: u64,
}

impl HttpVectorIndex {
    /// Create a client against the given base URL.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let timeout_secs = std::env::var("JOBTRAIL_INDEX_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(INDEX_TIMEOUT_SECS);

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into(),
            api_key,
            timeout_secs,
        }
    }

    /// Create from environment variables (`JOBTRAIL_INDEX_URL`,
    /// `JOBTRAIL_INDEX_API_KEY`).
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("JOBTRAIL_INDEX_URL")
            .map_err(|_| Error::Config("JOBTRAIL_INDEX_URL not set".to_string()))?;
        let api_key = std::env::var("JOBTRAIL_INDEX_API_KEY").ok();
        Ok(Self::new(base_url, api_key))
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    text: &'a str,
    top_k: usize,
    filter: QueryFilter,
}

#[derive(Serialize)]
struct QueryFilter {
    user_id: Uuid,
}

#[derive(Deserialize)]
struct QueryResponse {
    matches: Vec<ScoredMatch>,
}

#[async_trait]
impl VectorIndex for HttpVectorIndex {
    async fn upsert(&self, record: &VectorRecord) -> Result<()> {
        let start = Instant::now();
        let response = self
            .authorized(self.client.post(format!("{}/records", self.base_url)))
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(record)
            .send()
            .await
            .map_err(|e| Error::Index(format!("upsert request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            warn!(
                subsystem = "index",
                op = "upsert",
                record_id = %record.id,
                status = %status,
                "Vector index rejected upsert"
            );
            return Err(Error::Index(format!("upsert returned {status}")));
        }

        debug!(
            subsystem = "index",
            op = "upsert",
            record_id = %record.id,
            duration_ms = start.elapsed().as_millis() as u64,
            "Upserted vector record"
        );
        Ok(())
    }

    async fn query(&self, text: &str, user_id: Uuid, top_k: usize) -> Result<Vec<ScoredMatch>> {
        let request = QueryRequest {
            text,
            top_k,
            filter: QueryFilter { user_id },
        };

        let response = self
            .authorized(self.client.post(format!("{}/query", self.base_url)))
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Index(format!("query request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Index(format!(
                "query returned {}",
                response.status()
            )));
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| Error::Index(format!("malformed query response: {e}")))?;

        debug!(
            subsystem = "index",
            op = "query",
            result_count = body.matches.len(),
            "Vector index query complete"
        );
        Ok(body.matches)
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self
            .authorized(self.client.get(format!("{}/health", self.base_url)))
            .send()
            .await;
        Ok(matches!(response, Ok(r) if r.status().is_success()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_upsert_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/records"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let index = HttpVectorIndex::new(server.uri(), None);
        let record = VectorRecord {
            id: "msg-1".to_string(),
            text: "Interview scheduling".to_string(),
            metadata: json!({"user_id": Uuid::nil()}),
        };
        assert!(index.upsert(&record).await.is_ok());
    }

    #[tokio::test]
    async fn test_upsert_failure_maps_to_index_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/records"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let index = HttpVectorIndex::new(server.uri(), None);
        let record = VectorRecord {
            id: "msg-1".to_string(),
            text: "text".to_string(),
            metadata: json!({}),
        };
        match index.upsert(&record).await {
            Err(Error::Index(msg)) => assert!(msg.contains("503")),
            other => panic!("Expected Index error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_query_returns_scored_matches() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/query"))
            .and(body_partial_json(json!({"top_k": 5})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "matches": [
                    {"id": "t1", "score": 0.92, "metadata": {"subject": "Interview"}},
                    {"id": "t2", "score": 0.44, "metadata": {}}
                ]
            })))
            .mount(&server)
            .await;

        let index = HttpVectorIndex::new(server.uri(), None);
        let matches = index.query("interview", Uuid::nil(), 5).await.unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, "t1");
        assert!(matches[0].score > matches[1].score);
    }

    #[tokio::test]
    async fn test_health_check_down() {
        // Point at a closed port; health check reports false, not an error.
        let index = HttpVectorIndex::new("http://127.0.0.1:9", None);
        assert!(!index.health_check().await.unwrap());
    }
}
