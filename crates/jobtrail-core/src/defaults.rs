//! Default constants shared across jobtrail crates.

/// Default chat-completion endpoint for the AI mail parser.
pub const PARSER_URL: &str = "http://localhost:11434";

/// Default model for structured mail extraction.
pub const PARSER_MODEL: &str = "llama3.1:8b";

/// Character budget for text sent to the AI parser. Input beyond this is
/// truncated before prompt assembly.
pub const MAX_PROMPT_CHARS: usize = 8_000;

/// Timeout for AI extraction requests (seconds).
pub const PARSER_TIMEOUT_SECS: u64 = 60;

/// Timeout for vector index requests (seconds).
pub const INDEX_TIMEOUT_SECS: u64 = 10;

/// Timeout for mail-provider requests (seconds).
pub const MAIL_TIMEOUT_SECS: u64 = 30;

/// Overall deadline for one ingestion request (seconds).
pub const REQUEST_DEADLINE_SECS: u64 = 120;

/// Bounded batch size for parallel message-body fetches against the mail
/// provider (respects upstream rate limits).
pub const FETCH_BATCH_SIZE: usize = 10;

/// Default window size for bulk scans.
pub const SCAN_MAX_MESSAGES: u32 = 100;

/// Candidate threads retrieved by similarity pre-search for AI context.
pub const THREAD_CONTEXT_CANDIDATES: usize = 5;

/// Prefix for freshly minted thread identifiers.
pub const MINTED_THREAD_PREFIX: &str = "thread-";

/// Consumer webmail domains always excluded from company-domain inference.
pub const GENERIC_PROVIDERS: &[&str] = &[
    "gmail.com",
    "googlemail.com",
    "yahoo.com",
    "hotmail.com",
    "outlook.com",
    "live.com",
    "msn.com",
    "icloud.com",
    "me.com",
    "aol.com",
    "proton.me",
    "protonmail.com",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_providers_contains_major_webmail() {
        assert!(GENERIC_PROVIDERS.contains(&"gmail.com"));
        assert!(GENERIC_PROVIDERS.contains(&"outlook.com"));
        assert!(!GENERIC_PROVIDERS.contains(&"acme.io"));
    }

    #[test]
    fn test_batch_size_is_bounded() {
        assert!(FETCH_BATCH_SIZE > 0 && FETCH_BATCH_SIZE <= 50);
    }
}
