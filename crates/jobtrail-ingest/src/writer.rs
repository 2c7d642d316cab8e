//! Dual-store write sequencing.
//!
//! Fixed order: immutable message record first, thread aggregate second,
//! vector mirror last. The mirror is best-effort: a failed index upsert is
//! logged and appended to the run's error list, and the primary-store
//! writes stand.

use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use jobtrail_core::uuid_utils;
use jobtrail_core::{
    IngestSummary, Message, MessageRepository, Result, Thread, ThreadRepository, ThreadUpsert,
    VectorIndex, VectorRecord,
};

/// Writer over the primary store plus the best-effort vector index.
pub struct DualStoreWriter<'a> {
    messages: &'a dyn MessageRepository,
    threads: &'a dyn ThreadRepository,
    index: &'a dyn VectorIndex,
}

impl<'a> DualStoreWriter<'a> {
    pub fn new(
        messages: &'a dyn MessageRepository,
        threads: &'a dyn ThreadRepository,
        index: &'a dyn VectorIndex,
    ) -> Self {
        Self {
            messages,
            threads,
            index,
        }
    }

    /// Apply one consolidated message: durable writes, then the mirror.
    ///
    /// Returns `None` when the message id already exists in the store (a
    /// retried push or overlapping re-import). The thread aggregate only
    /// counts messages actually written, so a duplicate leaves it
    /// untouched.
    pub async fn write(
        &self,
        message: &Message,
        upsert: &ThreadUpsert,
        summary: &mut IngestSummary,
    ) -> Result<Option<Thread>> {
        if !self.messages.insert(message).await? {
            debug!(
                subsystem = "ingest",
                op = "write",
                message_id = %message.id,
                thread_id = %message.thread_id,
                "Message id already stored, leaving thread aggregate untouched"
            );
            return Ok(None);
        }
        let thread = self.threads.upsert_consolidated(message.user_id, upsert).await?;

        self.mirror(message, &thread, summary).await;

        debug!(
            subsystem = "ingest",
            op = "write",
            message_id = %message.id,
            thread_id = %message.thread_id,
            category = message.category.as_str(),
            "Wrote consolidated message"
        );
        Ok(Some(thread))
    }

    /// Mirror the message and its thread into the vector index.
    async fn mirror(&self, message: &Message, thread: &Thread, summary: &mut IngestSummary) {
        let message_record = VectorRecord {
            id: message.id.to_string(),
            text: format!("{}\n{}", message.subject, message.body),
            metadata: json!({
                "kind": "message",
                "user_id": message.user_id.to_string(),
                "thread_id": message.thread_id,
                "subject": message.subject,
                "from": message.from,
                "date": message.date,
                "category": message.category.as_str(),
                "company_id": message.company_id.map(|id| id.to_string()),
            }),
        };
        self.mirror_record(&message_record, summary).await;

        let thread_record = VectorRecord {
            id: thread_record_key(thread.user_id, &thread.thread_id),
            text: format!("{}\n{}", thread.subject, thread.participants.join(" ")),
            metadata: json!({
                "kind": "thread",
                "user_id": thread.user_id.to_string(),
                "thread_id": thread.thread_id,
                "subject": thread.subject,
                "latest_date": thread.latest_date,
                "category": thread.category.as_str(),
                "company_id": thread.company_id.map(|id| id.to_string()),
                "message_count": thread.message_count,
            }),
        };
        self.mirror_record(&thread_record, summary).await;
    }

    async fn mirror_record(&self, record: &VectorRecord, summary: &mut IngestSummary) {
        if let Err(e) = self.index.upsert(record).await {
            warn!(
                subsystem = "ingest",
                op = "mirror",
                record_id = %record.id,
                error_msg = %e,
                "Vector mirror failed, primary store write stands"
            );
            summary.record_error("vector mirror", e);
        }
    }
}

/// Stable index key for a thread record, derived from its natural key so
/// re-ingestion maps to the same record.
pub fn thread_record_key(user_id: Uuid, thread_id: &str) -> String {
    uuid_utils::thread_record_id(user_id, thread_id).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consolidator::build_upsert;
    use crate::memory::MemoryStore;
    use jobtrail_core::MessageCategory;
    use jobtrail_index::MockVectorIndex;

    fn message(user: Uuid, thread_id: &str, date: &str) -> Message {
        Message {
            id: uuid_utils::message_id(user, &format!("{thread_id}:{date}")),
            user_id: user,
            thread_id: thread_id.to_string(),
            subject: "Interview".to_string(),
            from: "jane@acme.io".to_string(),
            to: vec!["me@example.com".to_string()],
            date: date.to_string(),
            body: "Are you free Monday?".to_string(),
            labels: vec![],
            category: MessageCategory::InterviewScheduling,
            company_id: None,
        }
    }

    #[tokio::test]
    async fn test_write_mirrors_message_and_thread() {
        let store = MemoryStore::new();
        let index = MockVectorIndex::new();
        let user = Uuid::now_v7();
        let writer = DualStoreWriter::new(&store, &store, &index);

        let msg = message(user, "t1", "2024-01-01");
        let upsert = build_upsert(
            "t1",
            &msg.subject,
            &msg.from,
            &msg.to,
            None,
            &msg.date,
            msg.category,
        );
        let mut summary = IngestSummary::default();
        let thread = writer
            .write(&msg, &upsert, &mut summary)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(thread.message_count, 1);
        assert_eq!(store.message_count(user), 1);
        assert_eq!(index.record_count(), 2);
        assert!(summary.errors.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_message_leaves_thread_count_intact() {
        let store = MemoryStore::new();
        let index = MockVectorIndex::new();
        let user = Uuid::now_v7();
        let writer = DualStoreWriter::new(&store, &store, &index);

        let msg = message(user, "t1", "2024-01-01");
        let upsert = build_upsert(
            "t1",
            &msg.subject,
            &msg.from,
            &msg.to,
            None,
            &msg.date,
            msg.category,
        );
        let mut summary = IngestSummary::default();
        let first = writer.write(&msg, &upsert, &mut summary).await.unwrap();
        let second = writer.write(&msg, &upsert, &mut summary).await.unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(store.message_count(user), 1);
        let thread = ThreadRepository::get(&store, user, "t1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(thread.message_count, 1);
    }

    #[tokio::test]
    async fn test_index_failure_is_non_fatal() {
        let store = MemoryStore::new();
        let index = MockVectorIndex::new().with_failure();
        let user = Uuid::now_v7();
        let writer = DualStoreWriter::new(&store, &store, &index);

        let msg = message(user, "t1", "2024-01-01");
        let upsert = build_upsert(
            "t1",
            &msg.subject,
            &msg.from,
            &msg.to,
            None,
            &msg.date,
            msg.category,
        );
        let mut summary = IngestSummary::default();
        let result = writer.write(&msg, &upsert, &mut summary).await;

        assert!(result.is_ok());
        assert_eq!(store.message_count(user), 1);
        assert_eq!(store.thread_count(user), 1);
        assert_eq!(summary.errors.len(), 2);
    }

    #[tokio::test]
    async fn test_thread_mirror_key_is_stable() {
        let user = Uuid::now_v7();
        assert_eq!(
            thread_record_key(user, "t1"),
            thread_record_key(user, "t1")
        );
        assert_ne!(
            thread_record_key(user, "t1"),
            thread_record_key(user, "t2")
        );
    }
}
