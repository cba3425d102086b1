//! Token blacklist repository
//!
//! Stores the `jti` of revoked refresh tokens. `insert` relies on the
//! primary key for an atomic check-and-insert: when two requests race to
//! consume the same refresh token, exactly one insert succeeds. Entries are
//! irrelevant once their expiry passes and can be pruned lazily.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, SqlitePool};
use std::sync::Arc;

/// Blacklist repository trait
#[async_trait]
pub trait BlacklistRepository: Send + Sync {
    /// Insert a revoked token id.
    ///
    /// Returns `true` if the entry was inserted, `false` if the `jti` was
    /// already present (the token has been consumed before).
    async fn insert(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<bool>;

    /// Check whether a token id has been revoked
    async fn contains(&self, jti: &str) -> Result<bool>;

    /// Remove entries whose expiry has passed. Returns the number removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

/// SQLx-based blacklist repository implementation
pub struct SqlxBlacklistRepository {
    pool: DynDatabasePool,
}

impl SqlxBlacklistRepository {
    /// Create a new SQLx blacklist repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn BlacklistRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl BlacklistRepository for SqlxBlacklistRepository {
    async fn insert(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                insert_sqlite(self.pool.as_sqlite().unwrap(), jti, expires_at).await
            }
            DatabaseDriver::Mysql => {
                insert_mysql(self.pool.as_mysql().unwrap(), jti, expires_at).await
            }
        }
    }

    async fn contains(&self, jti: &str) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => contains_sqlite(self.pool.as_sqlite().unwrap(), jti).await,
            DatabaseDriver::Mysql => contains_mysql(self.pool.as_mysql().unwrap(), jti).await,
        }
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                purge_expired_sqlite(self.pool.as_sqlite().unwrap(), now).await
            }
            DatabaseDriver::Mysql => purge_expired_mysql(self.pool.as_mysql().unwrap(), now).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn insert_sqlite(pool: &SqlitePool, jti: &str, expires_at: DateTime<Utc>) -> Result<bool> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO token_blacklist (jti, expires_at) VALUES (?, ?)",
    )
    .bind(jti)
    .bind(expires_at)
    .execute(pool)
    .await
    .context("Failed to insert blacklist entry")?;

    Ok(result.rows_affected() == 1)
}

async fn contains_sqlite(pool: &SqlitePool, jti: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM token_blacklist WHERE jti = ?")
        .bind(jti)
        .fetch_one(pool)
        .await
        .context("Failed to query blacklist")?;

    Ok(count > 0)
}

async fn purge_expired_sqlite(pool: &SqlitePool, now: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query("DELETE FROM token_blacklist WHERE expires_at < ?")
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to purge blacklist")?;

    Ok(result.rows_affected())
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn insert_mysql(pool: &MySqlPool, jti: &str, expires_at: DateTime<Utc>) -> Result<bool> {
    let result = sqlx::query(
        "INSERT IGNORE INTO token_blacklist (jti, expires_at) VALUES (?, ?)",
    )
    .bind(jti)
    .bind(expires_at)
    .execute(pool)
    .await
    .context("Failed to insert blacklist entry")?;

    Ok(result.rows_affected() == 1)
}

async fn contains_mysql(pool: &MySqlPool, jti: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM token_blacklist WHERE jti = ?")
        .bind(jti)
        .fetch_one(pool)
        .await
        .context("Failed to query blacklist")?;

    Ok(count > 0)
}

async fn purge_expired_mysql(pool: &MySqlPool, now: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query("DELETE FROM token_blacklist WHERE expires_at < ?")
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to purge blacklist")?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;

    async fn setup_test_repo() -> SqlxBlacklistRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxBlacklistRepository::new(pool)
    }

    #[tokio::test]
    async fn test_insert_and_contains() {
        let repo = setup_test_repo().await;
        let expires = Utc::now() + Duration::days(7);

        assert!(!repo.contains("jti-1").await.unwrap());
        assert!(repo.insert("jti-1", expires).await.unwrap());
        assert!(repo.contains("jti-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_insert_twice_returns_false() {
        // Second insert of the same jti must report "already consumed"
        let repo = setup_test_repo().await;
        let expires = Utc::now() + Duration::days(7);

        assert!(repo.insert("jti-once", expires).await.unwrap());
        assert!(!repo.insert("jti-once", expires).await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_expired_keeps_live_entries() {
        let repo = setup_test_repo().await;
        let now = Utc::now();

        repo.insert("expired", now - Duration::hours(1)).await.unwrap();
        repo.insert("live", now + Duration::days(1)).await.unwrap();

        let purged = repo.purge_expired(now).await.unwrap();
        assert_eq!(purged, 1);
        assert!(!repo.contains("expired").await.unwrap());
        assert!(repo.contains("live").await.unwrap());
    }
}
