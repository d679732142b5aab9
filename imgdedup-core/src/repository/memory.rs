//! In-memory repository.
//!
//! Enforces the same uniqueness rules as the database schema so pipeline
//! behaviour is identical across backends. Contents are lost on restart.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Repository, RepositoryError};
use crate::fingerprint::HashKind;
use crate::record::{FingerprintRecord, NewFingerprintRecord};

#[derive(Debug, Default)]
pub struct MemoryRepository {
    // Insertion order; newest last.
    records: RwLock<Vec<FingerprintRecord>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing records, e.g. legacy rows in tests.
    pub fn with_records(records: Vec<FingerprintRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_by_exact_hash(
        &self,
        kind: HashKind,
        value: &str,
    ) -> Result<Option<FingerprintRecord>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .rev()
            .find(|r| r.value(kind).is_some_and(|v| v.eq_ignore_ascii_case(value)))
            .cloned())
    }

    async fn scan(&self, limit: usize) -> Result<Vec<FingerprintRecord>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.iter().rev().take(limit).cloned().collect())
    }

    async fn insert(&self, record: NewFingerprintRecord) -> Result<FingerprintRecord, RepositoryError> {
        // Check and push under one write lock so concurrent inserts serialise
        let mut records = self.records.write().await;

        if records.iter().any(|r| r.storage_path == record.storage_path()) {
            return Err(RepositoryError::DuplicateKey(format!(
                "storage_path={}",
                record.storage_path()
            )));
        }
        if let Some(digest) = record.content_digest() {
            if records.iter().any(|r| r.content_digest.as_deref() == Some(digest)) {
                return Err(RepositoryError::DuplicateKey(format!("content_digest={}", digest)));
            }
        }

        let stored = record.into_record();
        records.push(stored.clone());
        Ok(stored)
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.records.read().await.len() as u64)
    }

    async fn clear(&self) -> Result<u64, RepositoryError> {
        let mut records = self.records.write().await;
        let removed = records.len() as u64;
        records.clear();
        Ok(removed)
    }

    async fn check_health(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::{ContentDigest, Fingerprint, PerceptualHash};

    fn fingerprint(seed: u64) -> Fingerprint {
        Fingerprint {
            phash: PerceptualHash::from_bits(seed),
            ahash: PerceptualHash::from_bits(seed.rotate_left(8)),
            dhash: PerceptualHash::from_bits(seed.rotate_left(16)),
            content_digest: ContentDigest::of(&seed.to_be_bytes()),
        }
    }

    #[tokio::test]
    async fn test_insert_and_exact_lookup() {
        let repo = MemoryRepository::new();
        let fp = fingerprint(0xabc);
        let stored = repo
            .insert(NewFingerprintRecord::new("a.png", &fp, true))
            .await
            .unwrap();

        for kind in [HashKind::Phash, HashKind::Ahash, HashKind::Dhash, HashKind::ContentDigest] {
            let found = repo.find_by_exact_hash(kind, &fp.hex(kind)).await.unwrap();
            assert_eq!(found.as_ref().map(|r| r.id), Some(stored.id), "{kind}");
        }
        assert!(repo
            .find_by_exact_hash(HashKind::Phash, "ffffffffffffffff")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_scan_is_newest_first_and_bounded() {
        let repo = MemoryRepository::new();
        for i in 0..5u64 {
            repo.insert(NewFingerprintRecord::new(format!("{i}.png"), &fingerprint(i + 1), true))
                .await
                .unwrap();
        }

        let scanned = repo.scan(3).await.unwrap();
        let paths: Vec<_> = scanned.iter().map(|r| r.storage_path.as_str()).collect();
        assert_eq!(paths, ["4.png", "3.png", "2.png"]);
        assert_eq!(repo.count().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_duplicate_storage_path_rejected() {
        let repo = MemoryRepository::new();
        repo.insert(NewFingerprintRecord::new("same.png", &fingerprint(1), true))
            .await
            .unwrap();
        let err = repo
            .insert(NewFingerprintRecord::new("same.png", &fingerprint(2), true))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateKey(_)));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_digest_rejected_only_when_tracked() {
        let repo = MemoryRepository::new();
        let fp = fingerprint(7);
        repo.insert(NewFingerprintRecord::new("a.png", &fp, true))
            .await
            .unwrap();

        let err = repo
            .insert(NewFingerprintRecord::new("b.png", &fp, true))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateKey(ref k) if k.starts_with("content_digest")));

        // NULL digests never collide
        repo.insert(NewFingerprintRecord::new("c.png", &fp, false))
            .await
            .unwrap();
        repo.insert(NewFingerprintRecord::new("d.png", &fp, false))
            .await
            .unwrap();
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_clear() {
        let repo = MemoryRepository::new();
        repo.insert(NewFingerprintRecord::new("a.png", &fingerprint(1), true))
            .await
            .unwrap();
        assert_eq!(repo.clear().await.unwrap(), 1);
        assert_eq!(repo.count().await.unwrap(), 0);
        assert!(repo.check_health().await.is_ok());
        assert_eq!(repo.backend(), "memory");
    }
}
