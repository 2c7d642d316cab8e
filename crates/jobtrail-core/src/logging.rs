//! Structured logging schema and field name constants for jobtrail.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied (vector mirror failures land here) |
//! | INFO  | Lifecycle events, ingestion run completions |
//! | DEBUG | Decision points: resolution misses, dedup hits, thread transitions |
//! | TRACE | Per-message iteration inside bulk scans |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated across an ingestion request.
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "resolve", "db", "index", "inference", "mail", "ingest"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "domain_index", "classifier", "consolidator", "writer", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "bulk_scan", "match_email", "upsert_thread", "parse_email"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// User UUID owning the ingestion run.
pub const USER_ID: &str = "user_id";

/// Message store UUID.
pub const MESSAGE_ID: &str = "message_id";

/// Thread identifier (provider-supplied or minted).
pub const THREAD_ID: &str = "thread_id";

/// Resolved company UUID.
pub const COMPANY_ID: &str = "company_id";

/// Assigned message category.
pub const CATEGORY: &str = "category";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Messages considered by a run.
pub const TOTAL: &str = "total";

/// Messages durably written.
pub const IMPORTED: &str = "imported";

/// Messages skipped (dedup, self-sent, no match).
pub const SKIPPED: &str = "skipped";

/// Distinct threads touched by a run.
pub const THREAD_COUNT: &str = "thread_count";

/// Byte length of a prompt sent to the AI parser.
pub const PROMPT_LEN: &str = "prompt_len";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
