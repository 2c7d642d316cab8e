//! Thread aggregates.
//!
//! The aggregate's derived fields (message count, latest date, category,
//! participants, company backfill) are owned exclusively by the pipeline
//! and mutated through a single conditional upsert. Two producers landing
//! the first message of a thread concurrently must not create two
//! aggregates, so creation and merge are one `INSERT .. ON CONFLICT`
//! statement rather than read-then-write.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use jobtrail_core::{
    Error, MessageCategory, Result, Thread, ThreadRepository, ThreadUpsert,
};

/// PostgreSQL thread repository.
#[derive(Clone)]
pub struct PgThreadRepository {
    pool: Pool<Postgres>,
}

impl PgThreadRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_row(row: &sqlx::postgres::PgRow) -> Thread {
        Thread {
            user_id: row.get("user_id"),
            thread_id: row.get("thread_id"),
            subject: row.get("subject"),
            participants: row.get("participants"),
            company_id: row.get("company_id"),
            latest_date: row.get("latest_date"),
            category: MessageCategory::parse(row.get::<String, _>("category").as_str()),
            message_count: row.get("message_count"),
        }
    }
}

const THREAD_COLUMNS: &str =
    "user_id, thread_id, subject, participants, company_id, latest_date, category, message_count";

#[async_trait]
impl ThreadRepository for PgThreadRepository {
    async fn get(&self, user_id: Uuid, thread_id: &str) -> Result<Option<Thread>> {
        let row = sqlx::query(&format!(
            "SELECT {THREAD_COLUMNS} FROM thread WHERE user_id = $1 AND thread_id = $2"
        ))
        .bind(user_id)
        .bind(thread_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(Self::parse_row))
    }

    async fn upsert_consolidated(&self, user_id: Uuid, upsert: &ThreadUpsert) -> Result<Thread> {
        // Dates are ISO 8601 strings, so GREATEST() on text yields the max
        // date. Category resolution is priority-based: the stored priority
        // column decides which label survives the merge.
        let row = sqlx::query(
            "INSERT INTO thread
                 (user_id, thread_id, subject, participants, company_id,
                  latest_date, category, category_priority, message_count)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 1)
             ON CONFLICT (user_id, thread_id) DO UPDATE SET
                 message_count = thread.message_count + 1,
                 latest_date = GREATEST(thread.latest_date, EXCLUDED.latest_date),
                 company_id = COALESCE(thread.company_id, EXCLUDED.company_id),
                 participants = (
                     SELECT ARRAY(
                         SELECT DISTINCT p
                         FROM unnest(thread.participants || EXCLUDED.participants) AS p
                     )
                 ),
                 category = CASE
                     WHEN EXCLUDED.category_priority > thread.category_priority
                         THEN EXCLUDED.category
                     ELSE thread.category
                 END,
                 category_priority = GREATEST(thread.category_priority, EXCLUDED.category_priority),
                 updated_at = now()
             RETURNING user_id, thread_id, subject, participants, company_id,
                       latest_date, category, message_count",
        )
        .bind(user_id)
        .bind(&upsert.thread_id)
        .bind(&upsert.subject)
        .bind(&upsert.participants)
        .bind(upsert.company_id)
        .bind(&upsert.date)
        .bind(upsert.category.as_str())
        .bind(upsert.category.priority())
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(Self::parse_row(&row))
    }

    async fn list_recent(&self, user_id: Uuid, limit: i64) -> Result<Vec<Thread>> {
        let rows = sqlx::query(&format!(
            "SELECT {THREAD_COLUMNS} FROM thread
             WHERE user_id = $1
             ORDER BY latest_date DESC
             LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(Self::parse_row).collect())
    }
}
