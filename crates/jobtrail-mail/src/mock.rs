//! In-memory mail provider for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use jobtrail_core::{Error, MailProvider, MessageRef, ProviderMessage, Result};

#[derive(Default)]
struct MockState {
    messages: HashMap<String, ProviderMessage>,
    order: Vec<String>,
    expired_token: bool,
    fail_ids: Vec<String>,
    get_calls: Vec<String>,
}

/// Mock mail provider seeded with canned messages.
#[derive(Clone, Default)]
pub struct MockMailProvider {
    state: Arc<Mutex<MockState>>,
}

impl MockMailProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a message; list order follows insertion order.
    pub fn with_message(self, message: ProviderMessage) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.order.push(message.id.clone());
            state.messages.insert(message.id.clone(), message);
        }
        self
    }

    /// Every call fails with `Error::TokenExpired`.
    pub fn with_expired_token(self) -> Self {
        self.state.lock().unwrap().expired_token = true;
        self
    }

    /// `get_message` for this id fails with `Error::Mail`.
    pub fn with_failing_message(self, id: &str) -> Self {
        self.state.lock().unwrap().fail_ids.push(id.to_string());
        self
    }

    pub fn get_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().get_calls.clone()
    }
}

#[async_trait]
impl MailProvider for MockMailProvider {
    async fn list_messages(
        &self,
        _access_token: &str,
        _query: &str,
        max_results: u32,
    ) -> Result<Vec<MessageRef>> {
        let state = self.state.lock().unwrap();
        if state.expired_token {
            return Err(Error::TokenExpired);
        }
        Ok(state
            .order
            .iter()
            .take(max_results as usize)
            .map(|id| {
                let msg = &state.messages[id];
                MessageRef {
                    id: msg.id.clone(),
                    thread_id: msg.thread_id.clone(),
                }
            })
            .collect())
    }

    async fn get_message(&self, _access_token: &str, id: &str) -> Result<ProviderMessage> {
        let mut state = self.state.lock().unwrap();
        state.get_calls.push(id.to_string());
        if state.expired_token {
            return Err(Error::TokenExpired);
        }
        if state.fail_ids.iter().any(|f| f == id) {
            return Err(Error::Mail(format!("mock failure fetching {id}")));
        }
        state
            .messages
            .get(id)
            .cloned()
            .ok_or_else(|| Error::Mail(format!("unknown message {id}")))
    }
}
