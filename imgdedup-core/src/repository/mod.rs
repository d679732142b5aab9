//! Durable keyed storage of fingerprint records.
//!
//! The pipeline only talks to the [`Repository`] trait; handles are
//! constructed explicitly and passed in. Two backends are provided:
//! - [`MemoryRepository`]: process-local, for tests, tooling and development
//! - `PostgresRepository` (feature `postgres`): production storage with
//!   UNIQUE constraints on `storage_path` and `content_digest`

mod memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use memory::MemoryRepository;
#[cfg(feature = "postgres")]
pub use postgres::PostgresRepository;

use async_trait::async_trait;
use thiserror::Error;

use crate::fingerprint::HashKind;
use crate::record::{FingerprintRecord, NewFingerprintRecord};

/// Errors raised by a repository backend.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A UNIQUE constraint rejected the insert. Carries the offending key.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Query error: {0}")]
    Query(String),
}

#[async_trait]
pub trait Repository: Send + Sync {
    /// Look up a record whose `kind` column equals `value` exactly.
    async fn find_by_exact_hash(
        &self,
        kind: HashKind,
        value: &str,
    ) -> Result<Option<FingerprintRecord>, RepositoryError>;

    /// Up to `limit` records, newest first.
    async fn scan(&self, limit: usize) -> Result<Vec<FingerprintRecord>, RepositoryError>;

    /// Insert a new record. Uniqueness violations surface as
    /// [`RepositoryError::DuplicateKey`] and leave the store unchanged.
    async fn insert(&self, record: NewFingerprintRecord) -> Result<FingerprintRecord, RepositoryError>;

    async fn count(&self) -> Result<u64, RepositoryError>;

    /// Delete every record. Maintenance only; the detection path never deletes.
    async fn clear(&self) -> Result<u64, RepositoryError>;

    async fn check_health(&self) -> Result<(), RepositoryError>;

    /// Short backend name for health reporting.
    fn backend(&self) -> &'static str;
}
