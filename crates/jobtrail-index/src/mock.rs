//! In-memory vector index for tests.
//!
//! Stores records verbatim and scores queries by naive token overlap, so
//! tests can assert retrieval behavior without a running index service.
//! Call recording and failure injection follow the same shape as the other
//! mock backends in this workspace.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use jobtrail_core::{Error, Result, ScoredMatch, VectorIndex, VectorRecord};

/// Recorded call for assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexCall {
    Upsert { id: String },
    Query { text: String, user_id: Uuid, top_k: usize },
    HealthCheck,
}

#[derive(Default)]
struct MockState {
    records: HashMap<String, VectorRecord>,
    calls: Vec<IndexCall>,
    fail: bool,
}

/// Mock vector index backend.
#[derive(Clone, Default)]
pub struct MockVectorIndex {
    state: Arc<Mutex<MockState>>,
}

impl MockVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// All subsequent calls return `Error::Index`.
    pub fn with_failure(self) -> Self {
        self.state.lock().unwrap().fail = true;
        self
    }

    pub fn calls(&self) -> Vec<IndexCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn record_count(&self) -> usize {
        self.state.lock().unwrap().records.len()
    }

    pub fn get(&self, id: &str) -> Option<VectorRecord> {
        self.state.lock().unwrap().records.get(id).cloned()
    }

    fn check_failure(state: &MockState, op: &str) -> Result<()> {
        if state.fail {
            return Err(Error::Index(format!("mock index failure during {op}")));
        }
        Ok(())
    }

    fn overlap_score(query: &str, text: &str) -> f32 {
        let query_tokens: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(String::from)
            .collect();
        if query_tokens.is_empty() {
            return 0.0;
        }
        let text_lower = text.to_lowercase();
        let hits = query_tokens
            .iter()
            .filter(|t| text_lower.contains(t.as_str()))
            .count();
        hits as f32 / query_tokens.len() as f32
    }
}

#[async_trait]
impl VectorIndex for MockVectorIndex {
    async fn upsert(&self, record: &VectorRecord) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(IndexCall::Upsert {
            id: record.id.clone(),
        });
        Self::check_failure(&state, "upsert")?;
        state.records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn query(&self, text: &str, user_id: Uuid, top_k: usize) -> Result<Vec<ScoredMatch>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(IndexCall::Query {
            text: text.to_string(),
            user_id,
            top_k,
        });
        Self::check_failure(&state, "query")?;

        let mut matches: Vec<ScoredMatch> = state
            .records
            .values()
            .filter(|r| {
                r.metadata
                    .get("user_id")
                    .and_then(|v| v.as_str())
                    .map(|s| s == user_id.to_string())
                    .unwrap_or(false)
            })
            .map(|r| ScoredMatch {
                id: r.id.clone(),
                score: Self::overlap_score(text, &r.text),
                metadata: r.metadata.clone(),
            })
            .filter(|m| m.score > 0.0)
            .collect();

        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn health_check(&self) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(IndexCall::HealthCheck);
        Ok(!state.fail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, text: &str, user_id: Uuid) -> VectorRecord {
        VectorRecord {
            id: id.to_string(),
            text: text.to_string(),
            metadata: json!({"user_id": user_id.to_string()}),
        }
    }

    #[tokio::test]
    async fn test_upsert_then_query() {
        let user = Uuid::now_v7();
        let index = MockVectorIndex::new();
        index
            .upsert(&record("m1", "interview with acme engineering", user))
            .await
            .unwrap();
        index
            .upsert(&record("m2", "your weekly newsletter digest", user))
            .await
            .unwrap();

        let matches = index.query("acme interview", user, 5).await.unwrap();
        assert_eq!(matches[0].id, "m1");
        assert!(matches.iter().all(|m| m.id != "m2" || m.score < matches[0].score));
    }

    #[tokio::test]
    async fn test_query_is_scoped_to_user() {
        let alice = Uuid::now_v7();
        let bob = Uuid::now_v7();
        let index = MockVectorIndex::new();
        index
            .upsert(&record("m1", "offer from acme", alice))
            .await
            .unwrap();

        let matches = index.query("acme offer", bob, 5).await.unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing() {
        let user = Uuid::now_v7();
        let index = MockVectorIndex::new();
        index.upsert(&record("m1", "first", user)).await.unwrap();
        index.upsert(&record("m1", "second", user)).await.unwrap();
        assert_eq!(index.record_count(), 1);
        assert_eq!(index.get("m1").unwrap().text, "second");
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let index = MockVectorIndex::new().with_failure();
        let err = index
            .upsert(&record("m1", "text", Uuid::nil()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Index(_)));
        assert!(!index.health_check().await.unwrap());
        // Calls are still recorded even when failing.
        assert_eq!(index.calls().len(), 2);
    }
}
