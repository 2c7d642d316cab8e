//! Per-run duplicate suppression for bulk scans.
//!
//! The composite key is `(thread_id, date)`: dates are not unique across
//! unrelated threads but are effectively unique within one, so the pair
//! identifies a message without depending on provider message ids. The
//! set is seeded from the user's stored messages and grows as the run
//! imports, which makes overlapping scan windows and re-runs of a
//! cancelled scan safe.

use std::collections::HashSet;

use tracing::debug;
use uuid::Uuid;

use jobtrail_core::{MessageRepository, Result};

/// Seen-message set for one bulk-scan run.
pub struct DedupGuard {
    seen: HashSet<(String, String)>,
}

impl DedupGuard {
    /// Empty guard (interactive and webhook paths never use one).
    pub fn new() -> Self {
        Self {
            seen: HashSet::new(),
        }
    }

    /// Seed the guard from the user's already-stored messages.
    pub async fn preload(messages: &dyn MessageRepository, user_id: Uuid) -> Result<Self> {
        let keys = messages.dedup_keys(user_id).await?;
        debug!(
            subsystem = "ingest",
            op = "dedup_preload",
            total = keys.len(),
            "Preloaded dedup keys"
        );
        Ok(Self {
            seen: keys.into_iter().collect(),
        })
    }

    /// True if the key was already seen. A fresh key is recorded so the
    /// same message later in the run is a hit.
    pub fn check_and_insert(&mut self, thread_id: &str, date: &str) -> bool {
        !self
            .seen
            .insert((thread_id.to_string(), date.to_string()))
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl Default for DedupGuard {
    fn default() -> Self {
        Self::new()
    }
}
