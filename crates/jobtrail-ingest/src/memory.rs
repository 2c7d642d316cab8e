//! In-memory store backend.
//!
//! Implements every primary-store trait over shared maps, with the same
//! merge semantics as the PostgreSQL repositories (idempotent message
//! insert, single conditional thread upsert). Used throughout the
//! pipeline tests and usable as a scratch backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use jobtrail_core::uuid_utils;
use jobtrail_core::{
    AccountDirectory, Company, CompanyRepository, Contact, ContactRepository, Error, Message,
    MessageRepository, Result, Thread, ThreadRepository, ThreadUpsert,
};

#[derive(Default)]
struct StoreState {
    companies: HashMap<(Uuid, Uuid), Company>,
    contacts: Vec<(Uuid, Contact)>,
    messages: HashMap<(Uuid, Uuid), Message>,
    threads: HashMap<(Uuid, String), Thread>,
    accounts: HashMap<Uuid, String>,
}

/// Shared in-memory store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a company with a fixed id.
    pub fn add_company(&self, user_id: Uuid, company: Company) {
        self.state
            .lock()
            .unwrap()
            .companies
            .insert((user_id, company.id), company);
    }

    /// Seed a contact.
    pub fn add_contact(&self, user_id: Uuid, contact: Contact) {
        self.state.lock().unwrap().contacts.push((user_id, contact));
    }

    /// Register an account email.
    pub fn add_account(&self, user_id: Uuid, email: &str) {
        self.state
            .lock()
            .unwrap()
            .accounts
            .insert(user_id, email.to_lowercase());
    }

    pub fn message_count(&self, user_id: Uuid) -> usize {
        self.state
            .lock()
            .unwrap()
            .messages
            .values()
            .filter(|m| m.user_id == user_id)
            .count()
    }

    pub fn thread_count(&self, user_id: Uuid) -> usize {
        self.state
            .lock()
            .unwrap()
            .threads
            .keys()
            .filter(|(u, _)| *u == user_id)
            .count()
    }
}

#[async_trait]
impl CompanyRepository for MemoryStore {
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Company>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .companies
            .iter()
            .filter(|((u, _), _)| *u == user_id)
            .map(|(_, c)| c.clone())
            .collect())
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<Company>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .companies
            .get(&(user_id, id))
            .cloned())
    }

    async fn create(&self, user_id: Uuid, name: &str, email_domain: Option<&str>) -> Result<Uuid> {
        let id = uuid_utils::deterministic_id("company", &format!("{user_id}:{}", name.to_lowercase()));
        let mut state = self.state.lock().unwrap();
        state.companies.entry((user_id, id)).or_insert(Company {
            id,
            name: name.to_string(),
            email_domain: email_domain.map(String::from),
        });
        Ok(id)
    }

    async fn backfill_domain(&self, user_id: Uuid, id: Uuid, domain: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let company = state
            .companies
            .get_mut(&(user_id, id))
            .ok_or_else(|| Error::NotFound(format!("company {id}")))?;
        if company.email_domain.is_none() {
            company.email_domain = Some(domain.to_lowercase());
        }
        Ok(())
    }
}

#[async_trait]
impl ContactRepository for MemoryStore {
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Contact>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .contacts
            .iter()
            .filter(|(u, _)| *u == user_id)
            .map(|(_, c)| c.clone())
            .collect())
    }

    async fn create(&self, user_id: Uuid, email: &str, company_id: Uuid) -> Result<()> {
        self.state.lock().unwrap().contacts.push((
            user_id,
            Contact {
                email: email.to_lowercase(),
                company_id,
            },
        ));
        Ok(())
    }
}

#[async_trait]
impl MessageRepository for MemoryStore {
    async fn insert(&self, message: &Message) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let key = (message.user_id, message.id);
        if state.messages.contains_key(&key) {
            return Ok(false);
        }
        state.messages.insert(key, message.clone());
        Ok(true)
    }

    async fn dedup_keys(&self, user_id: Uuid) -> Result<Vec<(String, String)>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .messages
            .values()
            .filter(|m| m.user_id == user_id)
            .map(|m| (m.thread_id.clone(), m.date.clone()))
            .collect())
    }

    async fn list_for_thread(&self, user_id: Uuid, thread_id: &str) -> Result<Vec<Message>> {
        let mut messages: Vec<Message> = self
            .state
            .lock()
            .unwrap()
            .messages
            .values()
            .filter(|m| m.user_id == user_id && m.thread_id == thread_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(messages)
    }

    async fn count_for_thread(&self, user_id: Uuid, thread_id: &str) -> Result<i64> {
        Ok(self.list_for_thread(user_id, thread_id).await?.len() as i64)
    }
}

#[async_trait]
impl ThreadRepository for MemoryStore {
    async fn get(&self, user_id: Uuid, thread_id: &str) -> Result<Option<Thread>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .threads
            .get(&(user_id, thread_id.to_string()))
            .cloned())
    }

    async fn upsert_consolidated(&self, user_id: Uuid, upsert: &ThreadUpsert) -> Result<Thread> {
        let mut state = self.state.lock().unwrap();
        let thread = state
            .threads
            .entry((user_id, upsert.thread_id.clone()))
            .and_modify(|t| {
                t.message_count += 1;
                if upsert.date > t.latest_date {
                    t.latest_date = upsert.date.clone();
                }
                if t.company_id.is_none() {
                    t.company_id = upsert.company_id;
                }
                for p in &upsert.participants {
                    if !t.participants.contains(p) {
                        t.participants.push(p.clone());
                    }
                }
                if upsert.category.priority() > t.category.priority() {
                    t.category = upsert.category;
                }
            })
            .or_insert_with(|| Thread {
                user_id,
                thread_id: upsert.thread_id.clone(),
                subject: upsert.subject.clone(),
                participants: upsert.participants.clone(),
                company_id: upsert.company_id,
                latest_date: upsert.date.clone(),
                category: upsert.category,
                message_count: 1,
            });
        Ok(thread.clone())
    }

    async fn list_recent(&self, user_id: Uuid, limit: i64) -> Result<Vec<Thread>> {
        let mut threads: Vec<Thread> = self
            .state
            .lock()
            .unwrap()
            .threads
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        threads.sort_by(|a, b| b.latest_date.cmp(&a.latest_date));
        threads.truncate(limit as usize);
        Ok(threads)
    }
}

#[async_trait]
impl AccountDirectory for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<Uuid>> {
        let needle = email.to_lowercase();
        Ok(self
            .state
            .lock()
            .unwrap()
            .accounts
            .iter()
            .find(|(_, e)| **e == needle)
            .map(|(u, _)| *u))
    }

    async fn self_email(&self, user_id: Uuid) -> Result<Option<String>> {
        Ok(self.state.lock().unwrap().accounts.get(&user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobtrail_core::MessageCategory;

    fn upsert(thread_id: &str, date: &str, category: MessageCategory) -> ThreadUpsert {
        ThreadUpsert {
            thread_id: thread_id.to_string(),
            subject: "subject".to_string(),
            participants: vec!["jane@acme.io".to_string()],
            company_id: None,
            date: date.to_string(),
            category,
        }
    }

    #[tokio::test]
    async fn test_thread_upsert_creates_then_merges() {
        let store = MemoryStore::new();
        let user = Uuid::now_v7();

        let t = store
            .upsert_consolidated(user, &upsert("t1", "2024-01-01", MessageCategory::General))
            .await
            .unwrap();
        assert_eq!(t.message_count, 1);

        let t = store
            .upsert_consolidated(
                user,
                &upsert("t1", "2024-01-03", MessageCategory::InterviewScheduling),
            )
            .await
            .unwrap();
        assert_eq!(t.message_count, 2);
        assert_eq!(t.latest_date, "2024-01-03");
        assert_eq!(t.category, MessageCategory::InterviewScheduling);
    }

    #[tokio::test]
    async fn test_thread_category_never_downgrades() {
        let store = MemoryStore::new();
        let user = Uuid::now_v7();
        store
            .upsert_consolidated(user, &upsert("t1", "2024-01-01", MessageCategory::Offer))
            .await
            .unwrap();
        let t = store
            .upsert_consolidated(user, &upsert("t1", "2024-01-02", MessageCategory::Rejection))
            .await
            .unwrap();
        assert_eq!(t.category, MessageCategory::Offer);
    }

    #[tokio::test]
    async fn test_message_insert_is_idempotent() {
        let store = MemoryStore::new();
        let user = Uuid::now_v7();
        let message = Message {
            id: Uuid::now_v7(),
            user_id: user,
            thread_id: "t1".to_string(),
            subject: "s".to_string(),
            from: "a@b.c".to_string(),
            to: vec![],
            date: "2024-01-01".to_string(),
            body: "b".to_string(),
            labels: vec![],
            category: MessageCategory::General,
            company_id: None,
        };
        assert!(store.insert(&message).await.unwrap());
        assert!(!store.insert(&message).await.unwrap());
        assert_eq!(store.message_count(user), 1);
    }

    #[tokio::test]
    async fn test_company_create_is_deterministic() {
        let store = MemoryStore::new();
        let user = Uuid::now_v7();
        let a = CompanyRepository::create(&store, user, "Acme Robotics", None)
            .await
            .unwrap();
        let b = CompanyRepository::create(&store, user, "Acme Robotics", Some("acme.io"))
            .await
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(CompanyRepository::list_for_user(&store, user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_backfill_domain_only_when_unset() {
        let store = MemoryStore::new();
        let user = Uuid::now_v7();
        let id = CompanyRepository::create(&store, user, "Acme", Some("acme.io"))
            .await
            .unwrap();
        store.backfill_domain(user, id, "other.com").await.unwrap();
        let company = CompanyRepository::get(&store, user, id).await.unwrap().unwrap();
        assert_eq!(company.email_domain.as_deref(), Some("acme.io"));
    }

    #[tokio::test]
    async fn test_account_lookup() {
        let store = MemoryStore::new();
        let user = Uuid::now_v7();
        store.add_account(user, "Me@Example.com");
        assert_eq!(
            store.find_user_by_email("me@example.com").await.unwrap(),
            Some(user)
        );
        assert_eq!(
            store.self_email(user).await.unwrap().as_deref(),
            Some("me@example.com")
        );
    }
}
