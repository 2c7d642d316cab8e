//! Core traits for jobtrail abstractions.
//!
//! These traits define the seams between the pipeline and its collaborators
//! (primary store, vector index, AI parser, mail provider), enabling
//! pluggable backends and testability.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// PRIMARY STORE TRAITS
// =============================================================================

/// Repository for company identities.
///
/// Companies are owned by the enrichment process; the pipeline reads them
/// and only writes back a newly discovered `email_domain`.
#[async_trait]
pub trait CompanyRepository: Send + Sync {
    /// List all companies belonging to a user.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Company>>;

    /// Get a company by id.
    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<Company>>;

    /// Create a company (used when interactive ingestion accepts an AI
    /// best-guess name with no existing match).
    async fn create(&self, user_id: Uuid, name: &str, email_domain: Option<&str>) -> Result<Uuid>;

    /// Set `email_domain` only if it is currently unset.
    async fn backfill_domain(&self, user_id: Uuid, id: Uuid, domain: &str) -> Result<()>;
}

/// Repository for contacts.
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// List all contacts belonging to a user.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Contact>>;

    /// Create a contact link.
    async fn create(&self, user_id: Uuid, email: &str, company_id: Uuid) -> Result<()>;
}

/// Repository for immutable message records.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Insert a message. The id is caller-derived (deterministic for bulk
    /// imports) and the insert is idempotent on conflict. Returns `true`
    /// when a row was actually written, `false` when the id already
    /// existed, so callers can skip the thread aggregate update for
    /// duplicates.
    async fn insert(&self, message: &Message) -> Result<bool>;

    /// Preload `(thread_id, date)` composite keys of all stored messages
    /// for a user, for seeding the dedup guard.
    async fn dedup_keys(&self, user_id: Uuid) -> Result<Vec<(String, String)>>;

    /// List messages belonging to a thread, oldest first.
    async fn list_for_thread(&self, user_id: Uuid, thread_id: &str) -> Result<Vec<Message>>;

    /// Count messages sharing a thread id.
    async fn count_for_thread(&self, user_id: Uuid, thread_id: &str) -> Result<i64>;
}

/// Facts about a newly consolidated message, applied to its thread
/// aggregate through a single atomic create-if-absent / merge operation.
#[derive(Debug, Clone)]
pub struct ThreadUpsert {
    pub thread_id: String,
    /// Subject used only when the thread is created.
    pub subject: String,
    /// Participants contributed by this message (unioned into the thread).
    pub participants: Vec<String>,
    /// Company backfilled only if the thread has none yet.
    pub company_id: Option<Uuid>,
    /// Message date; raises `latest_date` when greater.
    pub date: String,
    /// Message category; raises the thread category when higher priority.
    pub category: MessageCategory,
}

/// Repository for thread aggregates.
#[async_trait]
pub trait ThreadRepository: Send + Sync {
    /// Get a thread by user and thread id.
    async fn get(&self, user_id: Uuid, thread_id: &str) -> Result<Option<Thread>>;

    /// Apply a consolidated message to the thread aggregate.
    ///
    /// Must behave as a single conditional upsert keyed by
    /// `(user_id, thread_id)`: create with `message_count = 1` when absent,
    /// otherwise merge (increment count, raise latest date, raise category
    /// by priority, backfill company, union participants). Two concurrent
    /// first messages must not create two aggregates.
    async fn upsert_consolidated(&self, user_id: Uuid, upsert: &ThreadUpsert) -> Result<Thread>;

    /// List a user's most recently active threads.
    async fn list_recent(&self, user_id: Uuid, limit: i64) -> Result<Vec<Thread>>;
}

/// Directory of registered accounts, used by webhook ingestion to resolve
/// the owning user from the message's `from`/`to` addresses.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Find the user whose registered account email matches `email`.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<Uuid>>;

    /// The user's own address, used to exclude their domain from
    /// company-domain inference and to filter self-sent mail.
    async fn self_email(&self, user_id: Uuid) -> Result<Option<String>>;
}

// =============================================================================
// VECTOR INDEX TRAITS
// =============================================================================

/// Similarity-searchable secondary store. Eventually consistent and
/// non-authoritative: a derived, rebuildable cache, never the source of
/// truth.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Upsert a record into the index.
    async fn upsert(&self, record: &VectorRecord) -> Result<()>;

    /// Similarity search returning scored candidates with metadata.
    async fn query(&self, text: &str, user_id: Uuid, top_k: usize) -> Result<Vec<ScoredMatch>>;

    /// Check if the index is available and responding.
    async fn health_check(&self) -> Result<bool>;
}

// =============================================================================
// AI EXTRACTION TRAITS
// =============================================================================

/// LLM-based structured extraction capability: raw text in, typed draft out.
#[async_trait]
pub trait MailParser: Send + Sync {
    /// Parse unstructured correspondence into a draft record.
    ///
    /// `context` carries nearby existing threads (from a similarity
    /// pre-search) so the model can propose a thread match. Implementations
    /// must bound the prompt size by truncating the input text.
    async fn parse_email(
        &self,
        raw_text: &str,
        context: &[ThreadContext],
    ) -> Result<ParsedEmailDraft>;

    /// Check if the backend is available and responding.
    async fn health_check(&self) -> Result<bool>;
}

// =============================================================================
// MAIL PROVIDER TRAITS
// =============================================================================

/// Mail-provider API surface used by the bulk scanner.
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// List message references matching a provider query string.
    async fn list_messages(
        &self,
        access_token: &str,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<MessageRef>>;

    /// Fetch one full message by provider id.
    async fn get_message(&self, access_token: &str, id: &str) -> Result<ProviderMessage>;
}
