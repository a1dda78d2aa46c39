//! Database connection management
//!
//! Pool construction, migrations and health checks over SQLite. Foreign
//! keys are enabled on every connection so task deletes cascade through
//! the owned tables.

use crate::db::error::DbResult;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Type alias for the connection pool
pub type DatabasePool = SqlitePool;

/// Shared database handle
#[derive(Debug, Clone)]
pub struct DatabaseConnection {
    pool: DatabasePool,
}

impl DatabaseConnection {
    /// Connect to a SQLite database, creating the file if missing
    pub async fn new(database_url: &str) -> DbResult<Self> {
        Self::with_max_connections(database_url, 5).await
    }

    /// Connect with a custom pool size
    pub async fn with_max_connections(database_url: &str, max_connections: u32) -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(sqlx::Error::from)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// In-process database for unit tests; single connection so the
    /// in-memory database is shared by every query.
    pub async fn in_memory() -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(sqlx::Error::from)?
            .foreign_keys(true);
        // A single pinned connection: the in-memory database lives and
        // dies with it.
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Apply pending migrations
    pub async fn run_migrations(&self) -> DbResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Run a trivial query to confirm the database is reachable
    pub async fn health_check(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    /// Close the pool gracefully
    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_connect_and_migrate() {
        let db = DatabaseConnection::in_memory().await.unwrap();
        db.run_migrations().await.unwrap();
        db.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = DatabaseConnection::in_memory().await.unwrap();
        db.run_migrations().await.unwrap();
        db.run_migrations().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_backed_connect() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}/test.db", dir.path().display());
        let db = DatabaseConnection::new(&url).await.unwrap();
        db.run_migrations().await.unwrap();
        db.health_check().await.unwrap();
    }
}
