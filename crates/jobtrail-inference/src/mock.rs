//! Mock mail parser for tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use jobtrail_core::{Error, MailParser, ParsedEmailDraft, Result, ThreadContext};

/// Recorded extraction call.
#[derive(Debug, Clone)]
pub struct ParseCall {
    pub raw_text: String,
    pub context_thread_ids: Vec<String>,
}

#[derive(Default)]
struct MockState {
    drafts: Vec<ParsedEmailDraft>,
    calls: Vec<ParseCall>,
    fail: bool,
}

/// Mock parser backend returning canned drafts in order, repeating the
/// last one when exhausted.
#[derive(Clone, Default)]
pub struct MockMailParser {
    state: Arc<Mutex<MockState>>,
}

impl MockMailParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a draft to return.
    pub fn with_draft(self, draft: ParsedEmailDraft) -> Self {
        self.state.lock().unwrap().drafts.push(draft);
        self
    }

    /// All subsequent calls return `Error::Inference`.
    pub fn with_failure(self) -> Self {
        self.state.lock().unwrap().fail = true;
        self
    }

    pub fn calls(&self) -> Vec<ParseCall> {
        self.state.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl MailParser for MockMailParser {
    async fn parse_email(
        &self,
        raw_text: &str,
        context: &[ThreadContext],
    ) -> Result<ParsedEmailDraft> {
        let mut state = self.state.lock().unwrap();
        let call_index = state.calls.len();
        state.calls.push(ParseCall {
            raw_text: raw_text.to_string(),
            context_thread_ids: context.iter().map(|c| c.thread_id.clone()).collect(),
        });

        if state.fail {
            return Err(Error::Inference("mock parser failure".to_string()));
        }

        let draft = state
            .drafts
            .get(call_index)
            .or_else(|| state.drafts.last())
            .cloned()
            .unwrap_or_default();
        Ok(draft)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.state.lock().unwrap().fail)
    }
}
