//! Immutable message records.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use jobtrail_core::{Error, Message, MessageCategory, MessageRepository, Result};

/// PostgreSQL message repository.
#[derive(Clone)]
pub struct PgMessageRepository {
    pool: Pool<Postgres>,
}

impl PgMessageRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_row(row: &sqlx::postgres::PgRow) -> Message {
        Message {
            id: row.get("id"),
            user_id: row.get("user_id"),
            thread_id: row.get("thread_id"),
            subject: row.get("subject"),
            from: row.get("from_addr"),
            to: row.get("to_addrs"),
            date: row.get("date"),
            body: row.get("body"),
            labels: row.get("labels"),
            category: MessageCategory::parse(row.get::<String, _>("category").as_str()),
            company_id: row.get("company_id"),
        }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn insert(&self, message: &Message) -> Result<bool> {
        // Ids are caller-derived (deterministic for bulk imports), so a
        // re-run of the same source lands on the same id. DO NOTHING keeps
        // the first write authoritative: messages are immutable.
        let result = sqlx::query(
            "INSERT INTO message
                 (id, user_id, thread_id, subject, from_addr, to_addrs, \"date\",
                  body, labels, category, company_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(message.id)
        .bind(message.user_id)
        .bind(&message.thread_id)
        .bind(&message.subject)
        .bind(&message.from)
        .bind(&message.to)
        .bind(&message.date)
        .bind(&message.body)
        .bind(&message.labels)
        .bind(message.category.as_str())
        .bind(message.company_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn dedup_keys(&self, user_id: Uuid) -> Result<Vec<(String, String)>> {
        let rows = sqlx::query("SELECT thread_id, \"date\" FROM message WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|r| (r.get("thread_id"), r.get("date")))
            .collect())
    }

    async fn list_for_thread(&self, user_id: Uuid, thread_id: &str) -> Result<Vec<Message>> {
        let rows = sqlx::query(
            "SELECT id, user_id, thread_id, subject, from_addr, to_addrs, \"date\",
                    body, labels, category, company_id
             FROM message
             WHERE user_id = $1 AND thread_id = $2
             ORDER BY \"date\" ASC",
        )
        .bind(user_id)
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(Self::parse_row).collect())
    }

    async fn count_for_thread(&self, user_id: Uuid, thread_id: &str) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM message WHERE user_id = $1 AND thread_id = $2",
        )
        .bind(user_id)
        .bind(thread_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(row.get("n"))
    }
}
