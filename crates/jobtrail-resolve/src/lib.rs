//! # jobtrail-resolve
//!
//! Company resolution and content classification for jobtrail.
//!
//! This crate provides:
//! - The Domain Index: a per-request, four-table lookup structure built from
//!   the user's companies and contacts
//! - The Company Resolver: email/domain/free-text → canonical company id
//! - The Content Classifier: ordered heuristic decision list assigning one
//!   category per message
//!
//! Everything here is pure logic with no I/O, built fresh per ingestion
//! request.
//!
//! ## Example
//!
//! ```
//! use jobtrail_resolve::{classify, DomainIndex};
//! use jobtrail_core::{Company, MessageCategory};
//! use uuid::Uuid;
//!
//! let companies = vec![Company {
//!     id: Uuid::from_u128(1),
//!     name: "Acme Robotics".into(),
//!     email_domain: Some("acme.io".into()),
//! }];
//! let index = DomainIndex::build(&companies, &[], None);
//!
//! assert_eq!(index.match_email("jane@acme.io"), Some(Uuid::from_u128(1)));
//! assert_eq!(
//!     classify("Interview scheduling — next week", "", "jane@acme.io"),
//!     MessageCategory::InterviewScheduling
//! );
//! ```

pub mod classifier;
pub mod domain_index;
mod resolver;

pub use classifier::{classify, EmailText, Rule, RULES};
pub use domain_index::{email_domain, extract_address, normalize_name, DomainIndex};

// Re-export core types
pub use jobtrail_core::*;
