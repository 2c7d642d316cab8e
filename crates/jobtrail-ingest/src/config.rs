//! Ingestion configuration.

use std::time::Duration;

use jobtrail_core::defaults::{
    REQUEST_DEADLINE_SECS, SCAN_MAX_MESSAGES, THREAD_CONTEXT_CANDIDATES,
};

/// Tunables shared by the three ingestion entry points.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Overall deadline for one ingestion request. External calls beyond
    /// this surface as a request-level timeout; messages already written
    /// stay written.
    pub request_deadline: Duration,
    /// Window size for bulk scans.
    pub scan_max_messages: u32,
    /// Candidate threads retrieved by similarity pre-search for AI context.
    pub context_candidates: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            request_deadline: Duration::from_secs(REQUEST_DEADLINE_SECS),
            scan_max_messages: SCAN_MAX_MESSAGES,
            context_candidates: THREAD_CONTEXT_CANDIDATES,
        }
    }
}

impl IngestConfig {
    /// Load from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(secs) = read_u64("JOBTRAIL_REQUEST_DEADLINE_SECS") {
            config.request_deadline = Duration::from_secs(secs);
        }
        if let Some(max) = read_u64("JOBTRAIL_SCAN_MAX_MESSAGES") {
            config.scan_max_messages = max as u32;
        }
        if let Some(n) = read_u64("JOBTRAIL_CONTEXT_CANDIDATES") {
            config.context_candidates = n as usize;
        }
        config
    }
}

fn read_u64(var: &str) -> Option<u64> {
    std::env::var(var).ok().and_then(|v| v.parse().ok())
}
