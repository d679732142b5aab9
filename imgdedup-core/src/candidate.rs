//! Candidate selection.
//!
//! Finding the stored images worth scoring against a new fingerprint runs
//! in up to three phases, each of which can end the search:
//!
//! 0. **Content digest.** A stored record with the same SHA3-256 digest is a
//!    byte-identical copy, reported at 100.
//! 1. **Exact hash.** Any record whose `phash`, `ahash` or `dhash` equals the
//!    new value is reported at 100. These are indexed lookups.
//! 2. **Bounded scan.** The `scan_limit` newest records are scored; those at
//!    or above the threshold qualify, and the scan stops early once
//!    `max_matches` have qualified.
//!
//! Recall vs latency: phase 2 never looks past the newest `scan_limit`
//! records, so a near-duplicate of an old image (with no exact hash match)
//! goes undetected once the corpus outgrows the window. Raising
//! `scan_limit` trades latency for recall linearly.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::DetectionConfig;
use crate::error::Result;
use crate::fingerprint::{Fingerprint, HashKind};
use crate::record::FingerprintRecord;
use crate::repository::Repository;
use crate::similarity;

/// How a candidate was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "phase", content = "hash")]
pub enum MatchKind {
    ContentDigest,
    ExactHash(HashKind),
    Scored,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateMatch {
    pub record: FingerprintRecord,
    /// Similarity in percent, two decimals.
    pub similarity: f64,
    pub kind: MatchKind,
}

/// Chooses and scores stored records against a new fingerprint.
#[derive(Debug, Clone)]
pub struct CandidateSelector {
    config: DetectionConfig,
}

impl CandidateSelector {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Qualifying matches, sorted by similarity descending.
    ///
    /// Candidates that cannot be scored are logged and skipped; only
    /// repository failures are returned as errors.
    pub async fn select(
        &self,
        repo: &dyn Repository,
        fingerprint: &Fingerprint,
    ) -> Result<Vec<CandidateMatch>> {
        if self.config.track_content_digest {
            let digest = fingerprint.hex(HashKind::ContentDigest);
            if let Some(record) = repo
                .find_by_exact_hash(HashKind::ContentDigest, &digest)
                .await?
            {
                debug!(path = %record.storage_path, "Content digest match");
                return Ok(vec![CandidateMatch {
                    record,
                    similarity: 100.0,
                    kind: MatchKind::ContentDigest,
                }]);
            }
        }

        let exact = self.exact_matches(repo, fingerprint).await?;
        if !exact.is_empty() {
            debug!(count = exact.len(), "Exact hash match, skipping scan");
            return Ok(exact);
        }

        self.scan(repo, fingerprint).await
    }

    async fn exact_matches(
        &self,
        repo: &dyn Repository,
        fingerprint: &Fingerprint,
    ) -> Result<Vec<CandidateMatch>> {
        let mut seen: HashSet<Uuid> = HashSet::new();
        let mut matches = Vec::new();

        for kind in HashKind::PERCEPTUAL {
            let value = fingerprint.hex(kind);
            if let Some(record) = repo.find_by_exact_hash(kind, &value).await? {
                if seen.insert(record.id) {
                    matches.push(CandidateMatch {
                        record,
                        similarity: 100.0,
                        kind: MatchKind::ExactHash(kind),
                    });
                }
            }
        }

        Ok(matches)
    }

    async fn scan(
        &self,
        repo: &dyn Repository,
        fingerprint: &Fingerprint,
    ) -> Result<Vec<CandidateMatch>> {
        let query = fingerprint.set();
        let records = repo.scan(self.config.scan_limit).await?;
        let scanned = records.len();
        let mut matches = Vec::new();

        for record in records {
            let similarity = match record
                .fingerprints()
                .and_then(|stored| similarity::score(&query, &stored))
            {
                Ok(s) => s,
                Err(e) => {
                    warn!(id = %record.id, path = %record.storage_path, error = %e, "Skipping candidate");
                    continue;
                }
            };

            if similarity >= self.config.similarity_threshold {
                matches.push(CandidateMatch {
                    record,
                    similarity,
                    kind: MatchKind::Scored,
                });
                if matches.len() >= self.config.max_matches {
                    debug!(max = self.config.max_matches, "Match cap reached, stopping scan");
                    break;
                }
            }
        }

        sort_by_similarity(&mut matches);
        debug!(scanned, qualified = matches.len(), "Bounded scan complete");
        Ok(matches)
    }
}

/// Sort descending; equal scores keep scan order (newest first).
pub fn sort_by_similarity(matches: &mut [CandidateMatch]) {
    matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::{ContentDigest, PerceptualHash};
    use crate::record::NewFingerprintRecord;
    use crate::repository::MemoryRepository;

    fn fp(p: u64, a: u64, d: u64, bytes: &[u8]) -> Fingerprint {
        Fingerprint {
            phash: PerceptualHash::from_bits(p),
            ahash: PerceptualHash::from_bits(a),
            dhash: PerceptualHash::from_bits(d),
            content_digest: ContentDigest::of(bytes),
        }
    }

    async fn seed(repo: &MemoryRepository, path: &str, fingerprint: &Fingerprint) -> FingerprintRecord {
        repo.insert(NewFingerprintRecord::new(path, fingerprint, true))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_digest_fast_path() {
        let repo = MemoryRepository::new();
        let stored = fp(1, 2, 3, b"same bytes");
        seed(&repo, "a.png", &stored).await;

        // Perceptual hashes are unrelated; only the digest matches
        let query = fp(u64::MAX, u64::MAX, u64::MAX, b"same bytes");
        let matches = CandidateSelector::new(DetectionConfig::default())
            .select(&repo, &query)
            .await
            .unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].kind, MatchKind::ContentDigest);
        assert_eq!(matches[0].similarity, 100.0);
    }

    #[tokio::test]
    async fn test_digest_ignored_when_not_tracked() {
        let repo = MemoryRepository::new();
        seed(&repo, "a.png", &fp(1, 2, 3, b"same bytes")).await;

        let config = DetectionConfig {
            track_content_digest: false,
            ..Default::default()
        };
        let query = fp(u64::MAX, u64::MAX, u64::MAX, b"same bytes");
        let matches = CandidateSelector::new(config)
            .select(&repo, &query)
            .await
            .unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn test_exact_match_short_circuits_scan() {
        let repo = MemoryRepository::new();
        // Shares only ahash with the query
        let exact = seed(&repo, "exact.png", &fp(0xf0f0, 0x1234, 0x0f0f, b"a")).await;
        // One bit off on every hash: a scan would report it at 98.44
        seed(&repo, "near.png", &fp(0xaaab, 0x1235, 0x5554, b"b")).await;

        let query = fp(0xaaaa, 0x1234, 0x5555, b"c");
        let matches = CandidateSelector::new(DetectionConfig::default())
            .select(&repo, &query)
            .await
            .unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].record.id, exact.id);
        assert_eq!(matches[0].similarity, 100.0);
        assert_eq!(matches[0].kind, MatchKind::ExactHash(HashKind::Ahash));
    }

    #[tokio::test]
    async fn test_phash_only_match_short_circuits_scan() {
        let repo = MemoryRepository::new();
        // Same phash, ahash and dhash half a hash away
        let exact = seed(&repo, "resized.jpg", &fp(0xdead_beef, 0xffff_ffff, 0xffff_ffff, b"a")).await;
        // One bit off on every hash: a scan would rank it at 98.44
        seed(&repo, "near.png", &fp(0xdead_beee, 1, 1, b"b")).await;

        let query = fp(0xdead_beef, 0, 0, b"c");
        let matches = CandidateSelector::new(DetectionConfig::default())
            .select(&repo, &query)
            .await
            .unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].record.id, exact.id);
        assert_eq!(matches[0].similarity, 100.0);
        assert_eq!(matches[0].kind, MatchKind::ExactHash(HashKind::Phash));
    }

    #[tokio::test]
    async fn test_exact_matches_deduplicated_by_id() {
        let repo = MemoryRepository::new();
        let stored = fp(7, 8, 9, b"a");
        seed(&repo, "a.png", &stored).await;

        let query = fp(7, 8, 9, b"different bytes");
        let matches = CandidateSelector::new(DetectionConfig::default())
            .select(&repo, &query)
            .await
            .unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].kind, MatchKind::ExactHash(HashKind::Phash));
    }

    #[tokio::test]
    async fn test_scan_filters_and_sorts() {
        let repo = MemoryRepository::new();
        // 1, 1, 1 bits off: 98.44
        seed(&repo, "close.png", &fp(0b1, 0b1, 0b1, b"1")).await;
        // 6, 6, 7 bits off: 90.1
        seed(&repo, "near.png", &fp(0b11_1111, 0b11_1111, 0b111_1111, b"2")).await;
        // 32 bits off everywhere: 50
        let far = u64::from(u32::MAX);
        seed(&repo, "far.png", &fp(far, far, far, b"3")).await;

        let query = fp(0, 0, 0, b"q");
        let matches = CandidateSelector::new(DetectionConfig::default())
            .select(&repo, &query)
            .await
            .unwrap();

        let got: Vec<_> = matches
            .iter()
            .map(|m| (m.record.storage_path.as_str(), m.similarity))
            .collect();
        assert_eq!(got, [("close.png", 98.44), ("near.png", 90.1)]);
        assert!(matches.iter().all(|m| m.kind == MatchKind::Scored));
    }

    #[tokio::test]
    async fn test_scan_respects_limit_and_cap() {
        let repo = MemoryRepository::new();
        for i in 0..10u64 {
            // Each differs from the query by one phash bit, never exactly equal
            seed(&repo, &format!("{i}.png"), &fp(1 << (i + 1), 0, 0, &i.to_be_bytes())).await;
        }
        // One bit off per hash against every record, no exact hits
        let query = fp(0, 1 << 40, 1 << 41, b"q");

        let limited = CandidateSelector::new(DetectionConfig {
            scan_limit: 4,
            ..Default::default()
        })
        .select(&repo, &query)
        .await
        .unwrap();
        assert_eq!(limited.len(), 4);

        let capped = CandidateSelector::new(DetectionConfig {
            max_matches: 3,
            ..Default::default()
        })
        .select(&repo, &query)
        .await
        .unwrap();
        assert_eq!(capped.len(), 3);
        // Newest first
        assert_eq!(capped[0].record.storage_path, "9.png");
    }

    #[tokio::test]
    async fn test_unscorable_candidate_is_skipped() {
        let good = NewFingerprintRecord::new("good.png", &fp(0b1, 0, 0, b"g"), true).into_record();
        let mut corrupt = NewFingerprintRecord::new("corrupt.png", &fp(0, 0, 0, b"c"), true).into_record();
        corrupt.phash = Some("zz".to_string());
        let mut empty = NewFingerprintRecord::new("empty.png", &fp(0, 0, 0, b"e"), true).into_record();
        empty.phash = None;
        empty.ahash = None;
        empty.dhash = None;

        let repo = MemoryRepository::with_records(vec![good, corrupt, empty]);
        let query = fp(0, 1, 1, b"q");
        let matches = CandidateSelector::new(DetectionConfig::default())
            .select(&repo, &query)
            .await
            .unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].record.storage_path, "good.png");
    }
}
