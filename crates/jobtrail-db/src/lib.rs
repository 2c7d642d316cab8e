//! # jobtrail-db
//!
//! PostgreSQL database layer for jobtrail.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for companies, contacts, messages, threads
//! - The atomic thread upsert that closes the concurrent-first-message race
//!
//! ## Example
//!
//! ```rust,ignore
//! use jobtrail_db::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/jobtrail").await?;
//!     let companies = db.companies.list_for_user(user_id).await?;
//!     Ok(())
//! }
//! ```

pub mod accounts;
pub mod companies;
pub mod contacts;
pub mod messages;
pub mod pool;
pub mod threads;

// Re-export core types
pub use jobtrail_core::*;

pub use accounts::PgAccountDirectory;
pub use companies::PgCompanyRepository;
pub use contacts::PgContactRepository;
pub use messages::PgMessageRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use threads::PgThreadRepository;

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Registered account directory.
    pub accounts: PgAccountDirectory,
    /// Company repository.
    pub companies: PgCompanyRepository,
    /// Contact repository.
    pub contacts: PgContactRepository,
    /// Immutable message records.
    pub messages: PgMessageRepository,
    /// Thread aggregates.
    pub threads: PgThreadRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            accounts: PgAccountDirectory::new(pool.clone()),
            companies: PgCompanyRepository::new(pool.clone()),
            contacts: PgContactRepository::new(pool.clone()),
            messages: PgMessageRepository::new(pool.clone()),
            threads: PgThreadRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
