//! Core data models for jobtrail.
//!
//! These types are shared across all jobtrail crates and represent
//! the core domain entities of the correspondence-ingestion pipeline.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

// =============================================================================
// COMPANY / CONTACT TYPES
// =============================================================================

/// A canonical employer identity.
///
/// Owned by the contact-enrichment process; the ingestion pipeline reads
/// companies and only writes back a newly discovered `email_domain`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    /// Canonical email domain, once discovered (e.g. "acme.io").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_domain: Option<String>,
}

/// A known person linked to a company.
///
/// Used only as a secondary domain-resolution signal when the company's
/// own domain is unknown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub email: String,
    pub company_id: Uuid,
}

// =============================================================================
// MESSAGE TYPES
// =============================================================================

/// Categorical label assigned to a message by the content classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageCategory {
    /// Application-received confirmation
    Confirmation,
    /// Cold recruiter outreach
    RecruiterOutreach,
    /// Interview/onsite/phone-screen scheduling
    InterviewScheduling,
    /// Not-moving-forward notice
    Rejection,
    /// Offer letter / compensation package
    Offer,
    /// Counter-offer and compensation negotiation
    Negotiation,
    /// Checking-in / following-up
    FollowUp,
    Spam,
    Newsletter,
    #[default]
    General,
}

impl MessageCategory {
    /// Priority used when aggregating a thread's category from its members:
    /// the highest-priority category among member messages wins.
    ///
    /// offer > negotiation > interview_scheduling > rejection >
    /// recruiter_outreach > confirmation > follow_up > everything else.
    pub fn priority(self) -> i16 {
        match self {
            MessageCategory::Offer => 8,
            MessageCategory::Negotiation => 7,
            MessageCategory::InterviewScheduling => 6,
            MessageCategory::Rejection => 5,
            MessageCategory::RecruiterOutreach => 4,
            MessageCategory::Confirmation => 3,
            MessageCategory::FollowUp => 2,
            MessageCategory::General | MessageCategory::Spam | MessageCategory::Newsletter => 1,
        }
    }

    /// Stable string form matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageCategory::Confirmation => "confirmation",
            MessageCategory::RecruiterOutreach => "recruiter_outreach",
            MessageCategory::InterviewScheduling => "interview_scheduling",
            MessageCategory::Rejection => "rejection",
            MessageCategory::Offer => "offer",
            MessageCategory::Negotiation => "negotiation",
            MessageCategory::FollowUp => "follow_up",
            MessageCategory::Spam => "spam",
            MessageCategory::Newsletter => "newsletter",
            MessageCategory::General => "general",
        }
    }

    /// Parse the stable string form back into a category.
    ///
    /// Unknown strings map to `General` rather than erroring, since stored
    /// rows may predate new categories.
    pub fn parse(s: &str) -> Self {
        match s {
            "confirmation" => MessageCategory::Confirmation,
            "recruiter_outreach" => MessageCategory::RecruiterOutreach,
            "interview_scheduling" => MessageCategory::InterviewScheduling,
            "rejection" => MessageCategory::Rejection,
            "offer" => MessageCategory::Offer,
            "negotiation" => MessageCategory::Negotiation,
            "follow_up" => MessageCategory::FollowUp,
            "spam" => MessageCategory::Spam,
            "newsletter" => MessageCategory::Newsletter,
            _ => MessageCategory::General,
        }
    }
}

/// An ingested email message. Immutable once written; corrections happen
/// by re-ingesting, not editing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub user_id: Uuid,
    pub thread_id: String,
    pub subject: String,
    pub from: String,
    pub to: Vec<String>,
    /// ISO 8601 date string as supplied by the source.
    pub date: String,
    pub body: String,
    pub labels: Vec<String>,
    pub category: MessageCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<Uuid>,
}

/// Conversation aggregate derived from its member messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub user_id: Uuid,
    pub thread_id: String,
    pub subject: String,
    pub participants: Vec<String>,
    /// Set once discovered; never cleared, only backfilled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<Uuid>,
    /// Max date across member messages (ISO 8601 string comparison).
    pub latest_date: String,
    /// Highest-priority category present among members.
    pub category: MessageCategory,
    pub message_count: i64,
}

// =============================================================================
// AI EXTRACTION TYPES
// =============================================================================

/// Candidate thread supplied as context to the AI mail parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadContext {
    pub thread_id: String,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    pub latest_date: String,
}

/// Typed draft record returned by the AI extraction capability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedEmailDraft {
    pub subject: String,
    pub from: String,
    #[serde(default)]
    pub to: Vec<String>,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Category guess; used as a fallback signal, never overriding the
    /// deterministic classifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_guess: Option<MessageCategory>,
    /// AI-guessed company name when no domain signal exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_guess: Option<String>,
    /// Whether the parser believes this message belongs to one of the
    /// candidate threads it was shown.
    #[serde(default)]
    pub matches_existing_thread: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_thread_id: Option<String>,
}

// =============================================================================
// VECTOR INDEX TYPES
// =============================================================================

/// Record upserted into the vector index mirror.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub text: String,
    pub metadata: JsonValue,
}

/// Scored candidate returned by a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredMatch {
    pub id: String,
    pub score: f32,
    pub metadata: JsonValue,
}

// =============================================================================
// MAIL PROVIDER TYPES
// =============================================================================

/// Lightweight reference returned by a list-messages query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRef {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

/// Full message fetched from the mail provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderMessage {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    pub subject: String,
    pub from: String,
    #[serde(default)]
    pub to: Vec<String>,
    pub date: String,
    pub body: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

// =============================================================================
// WEBHOOK TYPES
// =============================================================================

/// Inbound webhook payload (already JSON-decoded by the transport layer).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    /// Shared secret; compared in constant time before any other work.
    pub secret: String,
    pub from: String,
    pub subject: String,
    pub body_text: String,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gmail_thread_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,
}

// =============================================================================
// INGESTION SUMMARY
// =============================================================================

/// Structured outcome of an ingestion run.
///
/// Every entry point returns this instead of a pass/fail boolean so partial
/// success is always distinguishable from total failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestSummary {
    /// Messages considered by the run.
    pub total: u64,
    /// Messages durably written to the primary store.
    pub imported: u64,
    /// Messages skipped (dedup hit, self-sent, no company match).
    pub skipped: u64,
    /// Distinct threads touched by the run.
    pub threads: u64,
    /// Non-fatal errors observed (vector index failures, per-message
    /// upstream failures).
    pub errors: Vec<String>,
}

impl IngestSummary {
    pub fn record_error(&mut self, context: &str, err: impl std::fmt::Display) {
        self.errors.push(format!("{context}: {err}"));
    }
}
