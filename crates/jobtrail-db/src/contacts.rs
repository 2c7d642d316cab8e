//! Contact repository.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use jobtrail_core::{Contact, ContactRepository, Error, Result};

/// PostgreSQL contact repository.
#[derive(Clone)]
pub struct PgContactRepository {
    pool: Pool<Postgres>,
}

impl PgContactRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContactRepository for PgContactRepository {
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Contact>> {
        let rows = sqlx::query("SELECT email, company_id FROM contact WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|r| Contact {
                email: r.get("email"),
                company_id: r.get("company_id"),
            })
            .collect())
    }

    async fn create(&self, user_id: Uuid, email: &str, company_id: Uuid) -> Result<()> {
        sqlx::query(
            "INSERT INTO contact (user_id, email, company_id) VALUES ($1, $2, $3)
             ON CONFLICT (user_id, email) DO NOTHING",
        )
        .bind(user_id)
        .bind(email.to_lowercase())
        .bind(company_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }
}
