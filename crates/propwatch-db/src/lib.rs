//! # propwatch-db
//!
//! PostgreSQL database layer for propwatch.
//!
//! This crate provides:
//! - Connection pool management
//! - The change-set store (`PgChangeSetRepository`): transactional
//!   persistence of change sets and their records
//! - The watch-group registry backend (`PgWatchGroupRepository`):
//!   criteria matching and membership
//!
//! ## Example
//!
//! ```rust,ignore
//! use propwatch_db::Database;
//! use propwatch_core::{ChangeSet, ChangeSetRepository, DocumentRef, RawChangeEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/propwatch").await?;
//!
//!     let doc = DocumentRef::new(42, 0, "Berlin");
//!     let mut set = ChangeSet::from_raw(doc, &RawChangeEvent::default());
//!     set.set_actor(uuid::Uuid::now_v7())?;
//!     let outcome = db.changesets.persist(&mut set, &[]).await?;
//!
//!     println!("Persisted change set: {}", outcome.id);
//!     Ok(())
//! }
//! ```

pub mod changesets;
pub mod groups;
pub mod pool;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use propwatch_core::*;

// Re-export repository implementations
pub use changesets::PgChangeSetRepository;
pub use groups::PgWatchGroupRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Change-set store.
    pub changesets: PgChangeSetRepository,
    /// Watch-group registry backend.
    pub groups: PgWatchGroupRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            changesets: PgChangeSetRepository::new(pool.clone()),
            groups: PgWatchGroupRepository::new(pool.clone()),
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

impl Clone for Database {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}
