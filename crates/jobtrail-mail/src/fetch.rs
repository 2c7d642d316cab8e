//! Bounded-parallel message body fetching.
//!
//! Full-body fetches are the slow half of a bulk scan, so they run with
//! bounded concurrency against the provider. Per-message failures are
//! reported alongside the successes; a token expiry is surfaced as a
//! failure for every affected message and the caller aborts on the first
//! one it sees.

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use jobtrail_core::defaults::FETCH_BATCH_SIZE;
use jobtrail_core::{Error, MailProvider, MessageRef, ProviderMessage};

/// Outcome of one message fetch.
pub type FetchResult = (MessageRef, Result<ProviderMessage, Error>);

/// Fetch full bodies for `refs`, at most [`FETCH_BATCH_SIZE`] in flight.
///
/// Results preserve the input order regardless of completion order, so
/// downstream processing stays deterministic.
pub async fn fetch_bodies<P: MailProvider>(
    provider: &P,
    access_token: &str,
    refs: Vec<MessageRef>,
) -> Vec<FetchResult> {
    let total = refs.len();
    debug!(
        subsystem = "mail",
        op = "fetch_bodies",
        total,
        batch_size = FETCH_BATCH_SIZE,
        "Fetching message bodies"
    );

    let results: Vec<(usize, FetchResult)> = stream::iter(refs.into_iter().enumerate())
        .map(|(idx, msg_ref)| async move {
            let result = provider.get_message(access_token, &msg_ref.id).await;
            if let Err(e) = &result {
                warn!(
                    subsystem = "mail",
                    message_id = %msg_ref.id,
                    error_msg = %e,
                    "Message fetch failed"
                );
            }
            (idx, (msg_ref, result))
        })
        .buffer_unordered(FETCH_BATCH_SIZE)
        .collect()
        .await;

    let mut ordered = results;
    ordered.sort_by_key(|(idx, _)| *idx);
    ordered.into_iter().map(|(_, r)| r).collect()
}
