//! Registered account directory.
//!
//! Webhook ingestion resolves the owning user by matching the inbound
//! message's addresses against registered account emails; the bulk scanner
//! uses the same table for the user's self address.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use jobtrail_core::{AccountDirectory, Error, Result};

/// PostgreSQL account directory.
#[derive(Clone)]
pub struct PgAccountDirectory {
    pool: Pool<Postgres>,
}

impl PgAccountDirectory {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Register an account email for a user (idempotent).
    pub async fn register(&self, user_id: Uuid, email: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO account (user_id, email) VALUES ($1, $2)
             ON CONFLICT (user_id) DO UPDATE SET email = EXCLUDED.email",
        )
        .bind(user_id)
        .bind(email.to_lowercase())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }
}

#[async_trait]
impl AccountDirectory for PgAccountDirectory {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<Uuid>> {
        let row = sqlx::query("SELECT user_id FROM account WHERE email = $1")
            .bind(email.to_lowercase())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.map(|r| r.get("user_id")))
    }

    async fn self_email(&self, user_id: Uuid) -> Result<Option<String>> {
        let row = sqlx::query("SELECT email FROM account WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.map(|r| r.get("email")))
    }
}
