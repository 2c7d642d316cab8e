//! Company repository.
//!
//! Companies are owned by the contact-enrichment process; the pipeline
//! reads them and writes back only a newly discovered `email_domain`.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use jobtrail_core::{deterministic_id, Company, CompanyRepository, Error, Result};

/// PostgreSQL company repository.
#[derive(Clone)]
pub struct PgCompanyRepository {
    pool: Pool<Postgres>,
}

impl PgCompanyRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_row(row: &sqlx::postgres::PgRow) -> Company {
        Company {
            id: row.get("id"),
            name: row.get("name"),
            email_domain: row.get("email_domain"),
        }
    }
}

#[async_trait]
impl CompanyRepository for PgCompanyRepository {
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Company>> {
        let rows = sqlx::query(
            "SELECT id, name, email_domain FROM company WHERE user_id = $1 ORDER BY name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(Self::parse_row).collect())
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<Company>> {
        let row = sqlx::query(
            "SELECT id, name, email_domain FROM company WHERE user_id = $1 AND id = $2",
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(Self::parse_row))
    }

    async fn create(
        &self,
        user_id: Uuid,
        name: &str,
        email_domain: Option<&str>,
    ) -> Result<Uuid> {
        // Deterministic id over the natural key: re-ingesting the same
        // guessed name maps to the same company instead of a duplicate.
        let id = deterministic_id("company", &format!("{user_id}:{}", name.to_lowercase()));
        sqlx::query(
            "INSERT INTO company (id, user_id, name, email_domain) VALUES ($1, $2, $3, $4)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(id)
        .bind(user_id)
        .bind(name)
        .bind(email_domain)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(id)
    }

    async fn backfill_domain(&self, user_id: Uuid, id: Uuid, domain: &str) -> Result<()> {
        // Only fills an absent domain; an established canonical domain is
        // never overwritten by the pipeline.
        sqlx::query(
            "UPDATE company SET email_domain = $1, updated_at = now()
             WHERE user_id = $2 AND id = $3 AND email_domain IS NULL",
        )
        .bind(domain)
        .bind(user_id)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }
}
