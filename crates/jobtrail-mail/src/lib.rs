//! # jobtrail-mail
//!
//! Mail-provider client used by the bulk scanner: list message references
//! for a query window, then fetch full bodies with bounded concurrency.
//!
//! Token expiry is a distinct error ([`jobtrail_core::Error::TokenExpired`])
//! so a scan can abort early instead of failing every remaining message.

pub mod fetch;
pub mod mock;
pub mod provider;

pub use fetch::{fetch_bodies, FetchResult};
pub use mock::MockMailProvider;
pub use provider::{HttpMailProvider, DEFAULT_MAIL_API_URL};

pub use jobtrail_core::{MailProvider, MessageRef, ProviderMessage};
