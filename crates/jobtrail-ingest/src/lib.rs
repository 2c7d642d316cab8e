//! # jobtrail-ingest
//!
//! The ingestion pipeline: three entry points (bulk scan, interactive
//! paste, webhook push) funneling through one resolve → classify → dedup →
//! consolidate → write sequence.
//!
//! - [`BulkScanner`] — bounded provider window, dedup-guarded, skip on
//!   resolution miss, aborts only on authentication failure
//! - [`InteractiveIngestor`] — AI extraction with similarity context, best
//!   -effort company fallback, no dedup
//! - [`WebhookIngestor`] — constant-time secret check before any work,
//!   provider thread id preferred
//!
//! Every entry point returns an [`IngestSummary`] with counts and a
//! non-fatal error list, so partial success is always distinguishable from
//! total failure.

pub mod bulk;
pub mod config;
pub mod consolidator;
pub mod dedup;
pub mod interactive;
pub mod memory;
pub mod webhook;
pub mod writer;

pub use bulk::BulkScanner;
pub use config::IngestConfig;
pub use consolidator::{build_upsert, mint_thread_id, resolve_thread, ThreadResolution};
pub use dedup::DedupGuard;
pub use interactive::InteractiveIngestor;
pub use memory::MemoryStore;
pub use webhook::WebhookIngestor;
pub use writer::DualStoreWriter;

pub use jobtrail_core::IngestSummary;
