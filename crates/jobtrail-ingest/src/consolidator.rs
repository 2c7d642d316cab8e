//! Thread resolution and aggregate update construction.
//!
//! Identifier precedence: a provider-supplied conversation id is
//! authoritative when present (later messages in the same provider
//! conversation must group together); otherwise an AI-proposed match
//! against existing threads is honored when the proposed thread actually
//! exists; otherwise a fresh identifier is minted. The aggregate update
//! itself is applied by the store as one conditional upsert, so resolution
//! here never pre-creates anything.

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use jobtrail_core::defaults::MINTED_THREAD_PREFIX;
use jobtrail_core::{
    MessageCategory, Result, ThreadRepository, ThreadUpsert,
};

/// Outcome of thread resolution for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadResolution {
    /// The message joins a thread already present in the store.
    Existing(String),
    /// The message starts a thread under this identifier.
    New(String),
}

impl ThreadResolution {
    pub fn thread_id(&self) -> &str {
        match self {
            Self::Existing(id) | Self::New(id) => id,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::New(_))
    }
}

/// Mint a fresh thread identifier from the current time.
pub fn mint_thread_id() -> String {
    format!("{}{}", MINTED_THREAD_PREFIX, Utc::now().timestamp_millis())
}

/// Resolve which thread a message belongs to.
pub async fn resolve_thread(
    threads: &dyn ThreadRepository,
    user_id: Uuid,
    provider_thread_id: Option<&str>,
    ai_proposed_id: Option<&str>,
) -> Result<ThreadResolution> {
    if let Some(id) = provider_thread_id {
        let resolution = if threads.get(user_id, id).await?.is_some() {
            ThreadResolution::Existing(id.to_string())
        } else {
            ThreadResolution::New(id.to_string())
        };
        return Ok(resolution);
    }

    if let Some(id) = ai_proposed_id {
        if threads.get(user_id, id).await?.is_some() {
            debug!(
                subsystem = "ingest",
                op = "resolve_thread",
                thread_id = %id,
                "Accepted AI-proposed thread match"
            );
            return Ok(ThreadResolution::Existing(id.to_string()));
        }
        // Proposed id does not exist; the proposal is untrusted, mint fresh.
    }

    Ok(ThreadResolution::New(mint_thread_id()))
}

/// Build the aggregate update a consolidated message contributes to its
/// thread.
pub fn build_upsert(
    thread_id: &str,
    subject: &str,
    from: &str,
    to: &[String],
    company_id: Option<Uuid>,
    date: &str,
    category: MessageCategory,
) -> ThreadUpsert {
    let mut participants: Vec<String> = Vec::with_capacity(to.len() + 1);
    if !from.is_empty() {
        participants.push(from.to_string());
    }
    for addr in to {
        if !addr.is_empty() && !participants.contains(addr) {
            participants.push(addr.clone());
        }
    }

    ThreadUpsert {
        thread_id: thread_id.to_string(),
        subject: subject.to_string(),
        participants,
        company_id,
        date: date.to_string(),
        category,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[tokio::test]
    async fn test_provider_id_reused_even_when_thread_absent() {
        let store = MemoryStore::new();
        let user = Uuid::now_v7();
        let resolution = resolve_thread(&store, user, Some("t-prov"), None)
            .await
            .unwrap();
        assert_eq!(resolution, ThreadResolution::New("t-prov".to_string()));
    }

    #[tokio::test]
    async fn test_provider_id_finds_existing_thread() {
        let store = MemoryStore::new();
        let user = Uuid::now_v7();
        store
            .upsert_consolidated(
                user,
                &build_upsert(
                    "t-prov",
                    "Interview",
                    "jane@acme.io",
                    &[],
                    None,
                    "2024-01-01",
                    MessageCategory::InterviewScheduling,
                ),
            )
            .await
            .unwrap();

        let resolution = resolve_thread(&store, user, Some("t-prov"), None)
            .await
            .unwrap();
        assert_eq!(resolution, ThreadResolution::Existing("t-prov".to_string()));
    }

    #[tokio::test]
    async fn test_ai_proposal_requires_existing_thread() {
        let store = MemoryStore::new();
        let user = Uuid::now_v7();
        let resolution = resolve_thread(&store, user, None, Some("t-ghost"))
            .await
            .unwrap();
        assert!(resolution.is_new());
        assert!(resolution.thread_id().starts_with(MINTED_THREAD_PREFIX));
    }

    #[tokio::test]
    async fn test_minted_id_when_no_signals() {
        let store = MemoryStore::new();
        let user = Uuid::now_v7();
        let resolution = resolve_thread(&store, user, None, None).await.unwrap();
        assert!(resolution.is_new());
        assert!(resolution.thread_id().starts_with(MINTED_THREAD_PREFIX));
    }

    #[test]
    fn test_build_upsert_dedupes_participants() {
        let upsert = build_upsert(
            "t1",
            "s",
            "a@x.com",
            &["b@y.com".to_string(), "b@y.com".to_string()],
            None,
            "2024-01-01",
            MessageCategory::General,
        );
        assert_eq!(upsert.participants, vec!["a@x.com", "b@y.com"]);
    }
}
