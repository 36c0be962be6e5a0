//! Token pool repository: the exclusive-transaction dispenser and provisioning

use crate::domain::{DispenseOutcome, Token};
use crate::persistence::error::PersistenceError;
use crate::persistence::pool::{quote_identifier, ConnectionPool};
use crate::persistence::StorageConfig;
use async_trait::async_trait;
use sqlx::{Sqlite, Transaction};
use std::collections::HashSet;
use std::sync::Arc;

/// Takes the write lock at BEGIN so two dispensers can never both read the
/// same row before either deletes it.
const BEGIN_EXCLUSIVE: &str = "BEGIN IMMEDIATE";

/// Attempts per requested token before provisioning gives up on collisions
const GENERATION_ATTEMPTS_PER_TOKEN: usize = 16;

/// Largest batch a single `provision` call will generate
pub const MAX_PROVISION_COUNT: usize = 100_000;

/// Repository over the pool of unused tokens
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Atomically remove one token from the pool and return it
    async fn dispense(&self) -> Result<DispenseOutcome, PersistenceError>;

    /// Number of tokens still available
    async fn count(&self) -> Result<u64, PersistenceError>;

    /// Add tokens in one transaction, skipping values already present
    async fn insert(&self, tokens: &[Token]) -> Result<InsertReport, PersistenceError>;

    /// Generate `count` fresh tokens of `length` hex digits and add them
    async fn provision(&self, count: usize, length: usize) -> Result<Vec<Token>, PersistenceError>;

    /// Check that storage answers queries
    async fn health_check(&self) -> Result<(), PersistenceError>;
}

pub type SharedTokenRepository = Arc<dyn TokenRepository>;

/// Outcome of a batch insert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertReport {
    pub inserted: usize,
    /// Values that were already in the pool or repeated within the batch
    pub skipped: usize,
}

/// Validate raw values, reporting the first offender by position
pub fn parse_tokens<I, S>(values: I) -> Result<Vec<Token>, PersistenceError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            Token::parse(value).map_err(|source| PersistenceError::InvalidToken { index, source })
        })
        .collect()
}

/// SQL for one configured table/column pair. Identifiers are validated and
/// quoted once; token values are always bound.
#[derive(Debug, Clone)]
struct TokenQueries {
    select_next: String,
    delete_by_rowid: String,
    count: String,
    insert: String,
}

impl TokenQueries {
    fn new(table: &str, column: &str) -> Result<Self, PersistenceError> {
        let table = quote_identifier(table)?;
        let column = quote_identifier(column)?;

        Ok(Self {
            select_next: format!(
                "SELECT rowid, CAST({column} AS TEXT) FROM {table} \
                 WHERE {column} IS NOT NULL ORDER BY rowid LIMIT 1"
            ),
            delete_by_rowid: format!("DELETE FROM {table} WHERE rowid = ?"),
            count: format!("SELECT COUNT(*) FROM {table} WHERE {column} IS NOT NULL"),
            // skips values already present even when the column has no UNIQUE constraint
            insert: format!(
                "INSERT INTO {table} ({column}) SELECT ?1 \
                 WHERE NOT EXISTS (SELECT 1 FROM {table} WHERE {column} = ?1)"
            ),
        })
    }
}

/// A token selected and deleted inside an open exclusive transaction.
///
/// Nothing is visible to other connections until [`commit`](Self::commit).
/// Dropping the guard or calling [`rollback`](Self::rollback) leaves the
/// token in the pool.
pub struct PendingDispense {
    tx: Transaction<'static, Sqlite>,
    row_id: i64,
    token: Token,
}

impl PendingDispense {
    pub fn token(&self) -> &Token {
        &self.token
    }

    pub async fn commit(self) -> Result<Token, PersistenceError> {
        let Self { tx, row_id, token } = self;
        tx.commit().await?;
        tracing::debug!(row_id, "Token dispensed");
        Ok(token)
    }

    pub async fn rollback(self) -> Result<(), PersistenceError> {
        let Self { tx, row_id, .. } = self;
        tx.rollback().await?;
        tracing::debug!(row_id, "Dispense rolled back, token kept");
        Ok(())
    }
}

/// SQLx-based implementation of TokenRepository
pub struct SqlxTokenRepository {
    pool: ConnectionPool,
    queries: TokenQueries,
}

impl SqlxTokenRepository {
    pub fn new(pool: ConnectionPool, table: &str, column: &str) -> Result<Self, PersistenceError> {
        Ok(Self {
            pool,
            queries: TokenQueries::new(table, column)?,
        })
    }

    pub fn from_config(pool: ConnectionPool, config: &StorageConfig) -> Result<Self, PersistenceError> {
        Self::new(pool, &config.table, &config.column)
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Take the exclusive lock, select one token and delete it, without
    /// committing. An empty pool commits the no-op transaction and yields
    /// `None`.
    pub async fn begin_dispense(&self) -> Result<Option<PendingDispense>, PersistenceError> {
        let mut tx = self.pool.pool().begin_with(BEGIN_EXCLUSIVE).await?;

        let next: Option<(i64, String)> = sqlx::query_as(&self.queries.select_next)
            .fetch_optional(&mut *tx)
            .await?;

        let Some((row_id, value)) = next else {
            tx.commit().await?;
            return Ok(None);
        };

        let deleted = sqlx::query(&self.queries.delete_by_rowid)
            .bind(row_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted != 1 {
            tx.rollback().await?;
            return Err(PersistenceError::TransactionConflict(format!(
                "row {} disappeared before it could be removed",
                row_id
            )));
        }

        Ok(Some(PendingDispense {
            tx,
            row_id,
            token: Token::from_stored(value),
        }))
    }
}

#[async_trait]
impl TokenRepository for SqlxTokenRepository {
    async fn dispense(&self) -> Result<DispenseOutcome, PersistenceError> {
        match self.begin_dispense().await? {
            Some(pending) => Ok(DispenseOutcome::Dispensed(pending.commit().await?)),
            None => {
                tracing::debug!("Token pool is empty");
                Ok(DispenseOutcome::Empty)
            }
        }
    }

    async fn count(&self) -> Result<u64, PersistenceError> {
        let (count,): (i64,) = sqlx::query_as(&self.queries.count)
            .fetch_one(self.pool.pool())
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn insert(&self, tokens: &[Token]) -> Result<InsertReport, PersistenceError> {
        let mut tx = self.pool.pool().begin_with(BEGIN_EXCLUSIVE).await?;
        let mut report = InsertReport::default();

        for token in tokens {
            let affected = sqlx::query(&self.queries.insert)
                .bind(token.as_str())
                .execute(&mut *tx)
                .await?
                .rows_affected();

            if affected == 0 {
                report.skipped += 1;
            } else {
                report.inserted += 1;
            }
        }

        tx.commit().await?;
        tracing::info!(
            inserted = report.inserted,
            skipped = report.skipped,
            "Tokens added to pool"
        );
        Ok(report)
    }

    async fn provision(&self, count: usize, length: usize) -> Result<Vec<Token>, PersistenceError> {
        // validate the request before taking the lock
        if count > MAX_PROVISION_COUNT {
            return Err(PersistenceError::TooManyTokens {
                requested: count,
                max: MAX_PROVISION_COUNT,
            });
        }
        Token::generate(length).map_err(|source| PersistenceError::InvalidToken { index: 0, source })?;

        let mut tx = self.pool.pool().begin_with(BEGIN_EXCLUSIVE).await?;
        let mut created = Vec::with_capacity(count);
        let mut seen = HashSet::with_capacity(count);
        let max_attempts = count.saturating_mul(GENERATION_ATTEMPTS_PER_TOKEN);
        let mut attempts = 0;

        while created.len() < count {
            if attempts >= max_attempts {
                tx.rollback().await?;
                return Err(PersistenceError::Duplicate(format!(
                    "could not generate {} unique tokens of length {} after {} attempts",
                    count, length, attempts
                )));
            }
            attempts += 1;

            let token = Token::generate(length)
                .map_err(|source| PersistenceError::InvalidToken { index: created.len(), source })?;
            if !seen.insert(token.clone()) {
                continue;
            }

            let affected = sqlx::query(&self.queries.insert)
                .bind(token.as_str())
                .execute(&mut *tx)
                .await?
                .rows_affected();

            if affected == 1 {
                created.push(token);
            }
        }

        tx.commit().await?;
        tracing::info!(count = created.len(), length, "Provisioned new tokens");
        Ok(created)
    }

    async fn health_check(&self) -> Result<(), PersistenceError> {
        self.pool.health_check().await
    }
}
