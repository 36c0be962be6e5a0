//! Durable storage for the token pool
//!
//! # Architecture
//!
//! - `ConnectionPool`: managed SQLite pool opened once per process
//! - `TokenRepository`: dispense, count, insert and provision operations
//! - `PendingDispense`: the open exclusive transaction between select/delete and commit
//!
//! # Example
//!
//! ```rust,no_run
//! use tokenpool::persistence::{ConnectionPool, SqlxTokenRepository, StorageConfig, TokenRepository};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StorageConfig::default();
//!     let pool = ConnectionPool::open(&config).await?;
//!     pool.ensure_schema(&config.table, &config.column).await?;
//!
//!     let tokens = SqlxTokenRepository::from_config(pool, &config)?;
//!     if let Some(token) = tokens.dispense().await?.into_token() {
//!         println!("{}", token);
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod pool;
pub mod repository;

pub use error::PersistenceError;
pub use pool::ConnectionPool;
pub use repository::{
    parse_tokens, InsertReport, PendingDispense, MAX_PROVISION_COUNT, SharedTokenRepository, SqlxTokenRepository,
    TokenRepository,
};

use serde::{Deserialize, Serialize};

/// Configuration for the token store
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// SQLite URL: `sqlite://tokens.db` or `sqlite::memory:`
    #[serde(default = "default_url")]
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a request waits for a free connection
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,

    /// How long a dispenser waits for the exclusive lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    /// Table holding the pool
    #[serde(default = "default_table")]
    pub table: String,

    /// Text column holding each token
    #[serde(default = "default_column")]
    pub column: String,

    /// Create the table on startup if it is missing
    #[serde(default = "default_true")]
    pub create_schema: bool,

    /// Create the database file if it is missing
    #[serde(default = "default_true")]
    pub create_if_missing: bool,
}

fn default_url() -> String {
    "sqlite://tokens.db".to_string()
}

fn default_max_connections() -> u32 {
    8
}

fn default_acquire_timeout_secs() -> u64 {
    5
}

fn default_lock_timeout_ms() -> u64 {
    5000
}

fn default_table() -> String {
    "tokens".to_string()
}

fn default_column() -> String {
    "token".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
            lock_timeout_ms: default_lock_timeout_ms(),
            table: default_table(),
            column: default_column(),
            create_schema: default_true(),
            create_if_missing: default_true(),
        }
    }
}
