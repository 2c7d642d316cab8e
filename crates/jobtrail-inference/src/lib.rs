//! # jobtrail-inference
//!
//! AI extraction backend: raw correspondence text in, typed
//! [`ParsedEmailDraft`] out.
//!
//! The draft is advisory. Deterministic logic (classifier, resolver,
//! dedup) always wins over model output; extraction only fills gaps the
//! deterministic path cannot (free-text company guesses, thread matching
//! for pasted text with no provider ids).

pub mod mock;
pub mod parser;

pub use mock::{MockMailParser, ParseCall};
pub use parser::HttpMailParser;

pub use jobtrail_core::{MailParser, ParsedEmailDraft, ThreadContext};
