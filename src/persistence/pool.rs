//! Database connection pool management

use crate::persistence::error::PersistenceError;
use crate::persistence::StorageConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

/// Whether `name` can be spliced into SQL as a table or column name
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Double-quote a validated identifier
pub fn quote_identifier(name: &str) -> Result<String, PersistenceError> {
    if is_valid_identifier(name) {
        Ok(format!("\"{}\"", name))
    } else {
        Err(PersistenceError::InvalidIdentifier(name.to_string()))
    }
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Shared SQLite pool. Cloning is cheap and shares connections.
#[derive(Clone)]
pub struct ConnectionPool {
    pool: SqlitePool,
}

impl ConnectionPool {
    /// Open the pool described by `config`.
    ///
    /// At least one connection is established before returning, so an
    /// unreachable or unopenable file fails here as
    /// [`PersistenceError::StorageUnavailable`]. The busy timeout bounds how
    /// long a writer waits for the exclusive lock.
    pub async fn open(config: &StorageConfig) -> Result<Self, PersistenceError> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| PersistenceError::StorageUnavailable(e.to_string()))?
            .create_if_missing(config.create_if_missing)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_millis(config.lock_timeout_ms));

        let mut pool_options = SqlitePoolOptions::new()
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs));

        if is_memory_url(&config.url) {
            // every connection to :memory: is a separate database
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        } else {
            pool_options = pool_options.max_connections(config.max_connections);
        }

        tracing::info!(
            url = %config.url,
            max_connections = config.max_connections,
            lock_timeout_ms = config.lock_timeout_ms,
            "Opening token pool database"
        );

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| PersistenceError::StorageUnavailable(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the token table if it does not exist yet
    pub async fn ensure_schema(&self, table: &str, column: &str) -> Result<(), PersistenceError> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({} TEXT NOT NULL UNIQUE)",
            quote_identifier(table)?,
            quote_identifier(column)?
        );

        sqlx::query(&sql).execute(&self.pool).await?;
        tracing::debug!(table, column, "Token table ready");
        Ok(())
    }

    /// Check if the database connection is healthy
    pub async fn health_check(&self) -> Result<(), PersistenceError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                PersistenceError::StorageUnavailable(format!("Health check failed: {}", e))
            })?;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Close the pool, waiting for borrowed connections to come back
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
