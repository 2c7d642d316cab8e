//! # jobtrail-index
//!
//! Vector index client for semantic retrieval over ingested mail.
//!
//! The index is a best-effort mirror of the primary store: ingestion keeps
//! going when it is down, and it can be rebuilt from the message table at
//! any time. Two backends:
//!
//! - [`HttpVectorIndex`] — JSON client for an external similarity service
//! - [`MockVectorIndex`] — in-memory backend for tests

pub mod http;
pub mod mock;

pub use http::HttpVectorIndex;
pub use mock::{IndexCall, MockVectorIndex};

pub use jobtrail_core::{ScoredMatch, VectorIndex, VectorRecord};
