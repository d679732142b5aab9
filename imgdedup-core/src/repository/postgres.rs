//! PostgreSQL implementation of the repository.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::{Repository, RepositoryError};
use crate::fingerprint::HashKind;
use crate::record::{FingerprintRecord, NewFingerprintRecord};

const COLUMNS: &str = "id, storage_path, content_digest, phash, ahash, dhash, created_at";

/// PostgreSQL-backed fingerprint store.
///
/// Uniqueness of `storage_path` and `content_digest` is enforced by the
/// schema, which is what resolves two concurrent admissions of the same
/// bytes: the loser gets [`RepositoryError::DuplicateKey`].
#[derive(Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Connect and run migrations.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .connect(database_url)
            .await
            .map_err(|e| RepositoryError::Connection(e.to_string()))?;

        let repo = Self { pool };
        repo.migrate().await?;
        Ok(repo)
    }

    /// Create from an existing pool (for testing).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), RepositoryError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RepositoryError::Migration(e.to_string()))?;

        tracing::info!("Fingerprint store connected and migrations applied");
        Ok(())
    }
}

impl From<sqlx::Error> for RepositoryError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                let key = db.constraint().unwrap_or("unique constraint").to_string();
                Self::DuplicateKey(key)
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Connection(e.to_string())
            }
            _ => Self::Query(e.to_string()),
        }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_by_exact_hash(
        &self,
        kind: HashKind,
        value: &str,
    ) -> Result<Option<FingerprintRecord>, RepositoryError> {
        // Column names come from a closed enum, never from input
        let sql = format!(
            "SELECT {COLUMNS} FROM image_fingerprints WHERE {} = $1 ORDER BY created_at DESC LIMIT 1",
            kind.as_str()
        );
        let row = sqlx::query_as::<_, FingerprintRecord>(&sql)
            .bind(value.to_ascii_lowercase())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn scan(&self, limit: usize) -> Result<Vec<FingerprintRecord>, RepositoryError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM image_fingerprints ORDER BY created_at DESC, id LIMIT $1"
        );
        let rows = sqlx::query_as::<_, FingerprintRecord>(&sql)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn insert(&self, record: NewFingerprintRecord) -> Result<FingerprintRecord, RepositoryError> {
        let sql = format!(
            r#"
            INSERT INTO image_fingerprints (storage_path, content_digest, phash, ahash, dhash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COLUMNS}
            "#
        );
        let stored = sqlx::query_as::<_, FingerprintRecord>(&sql)
            .bind(record.storage_path())
            .bind(record.content_digest())
            .bind(record.phash())
            .bind(record.ahash())
            .bind(record.dhash())
            .fetch_one(&self.pool)
            .await?;

        tracing::debug!(id = %stored.id, path = %stored.storage_path, "Stored fingerprint record");

        Ok(stored)
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM image_fingerprints")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }

    async fn clear(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM image_fingerprints")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn check_health(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Connection(e.to_string()))?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
