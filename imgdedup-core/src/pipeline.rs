//! Admission pipeline.
//!
//! One submission moves through
//! `RECEIVED -> FINGERPRINTED -> {DUPLICATE | ADMITTED}`, or
//! `RECEIVED -> REJECTED` when the bytes cannot be fingerprinted.
//!
//! The pipeline holds no per-submission state and is shared behind an
//! `Arc`. Every submission re-reads the corpus; two concurrent admissions of
//! the same bytes are resolved by the repository's unique constraints, and
//! the loser is reported as a duplicate after its file is rolled back.

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::candidate::{CandidateMatch, CandidateSelector};
use crate::config::{DetectionConfig, StorageConfig};
use crate::error::{DedupError, Result};
use crate::fingerprint::{Extraction, HashExtractor, HashKind};
use crate::record::{FingerprintRecord, NewFingerprintRecord};
use crate::repository::{Repository, RepositoryError};
use crate::storage::StorageLayout;

/// Lifecycle stage of a submission, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStage {
    Received,
    Fingerprinted,
    Duplicate,
    Admitted,
    Rejected,
}

impl fmt::Display for SubmissionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Received => "received",
            Self::Fingerprinted => "fingerprinted",
            Self::Duplicate => "duplicate",
            Self::Admitted => "admitted",
            Self::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// Why a submission was rejected before any duplicate check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum RejectReason {
    /// Not a decodable raster image.
    Decode(String),
    /// The bytes could not be fully read. Retrying may succeed.
    Io(String),
}

impl RejectReason {
    pub fn message(&self) -> &str {
        match self {
            Self::Decode(m) | Self::Io(m) => m,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone)]
pub enum SubmissionOutcome {
    Admitted {
        record: FingerprintRecord,
        /// Stored location, relative to the upload root.
        path: String,
        elapsed: Duration,
    },
    Duplicate {
        /// Best matches first, truncated to the presentation limit.
        matches: Vec<CandidateMatch>,
        /// Qualifying matches before truncation.
        total: usize,
    },
    Rejected {
        reason: RejectReason,
    },
}

impl SubmissionOutcome {
    pub fn stage(&self) -> SubmissionStage {
        match self {
            Self::Admitted { .. } => SubmissionStage::Admitted,
            Self::Duplicate { .. } => SubmissionStage::Duplicate,
            Self::Rejected { .. } => SubmissionStage::Rejected,
        }
    }
}

/// Orchestrates extraction, candidate search, thresholding and the
/// store-or-reject decision.
pub struct AdmissionPipeline {
    repo: Arc<dyn Repository>,
    selector: CandidateSelector,
    layout: StorageLayout,
    extractor: Arc<HashExtractor>,
}

impl AdmissionPipeline {
    pub fn new(repo: Arc<dyn Repository>, detection: DetectionConfig, storage: &StorageConfig) -> Self {
        Self {
            repo,
            selector: CandidateSelector::new(detection),
            layout: StorageLayout::new(storage),
            extractor: Arc::new(HashExtractor::new()),
        }
    }

    pub fn repository(&self) -> &Arc<dyn Repository> {
        &self.repo
    }

    pub fn config(&self) -> &DetectionConfig {
        self.selector.config()
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Submit a file from disk. A failed read is a retryable rejection.
    pub async fn submit_path(&self, path: &Path) -> Result<SubmissionOutcome> {
        match tokio::fs::read(path).await {
            Ok(data) => self.submit(data).await,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not read submission");
                Ok(SubmissionOutcome::Rejected {
                    reason: RejectReason::Io(e.to_string()),
                })
            }
        }
    }

    /// Run one submission to completion.
    ///
    /// Input problems come back as [`SubmissionOutcome::Rejected`]; `Err`
    /// is reserved for server-side failures (storage, repository).
    pub async fn submit(&self, data: Vec<u8>) -> Result<SubmissionOutcome> {
        let started = Instant::now();
        debug!(stage = %SubmissionStage::Received, bytes = data.len(), "Submission received");

        let layout = self.layout.clone();
        let extractor = Arc::clone(&self.extractor);
        let (temp, extraction) = tokio::task::spawn_blocking(move || {
            receive(&layout, &extractor, &data)
        })
        .await
        .map_err(|e| DedupError::Internal(format!("fingerprint worker failed: {}", e)))??;

        let extraction = match extraction {
            Ok(extraction) => extraction,
            Err(e) if e.is_input_error() => {
                let reason = match e {
                    DedupError::Io(io) => RejectReason::Io(io.to_string()),
                    other => RejectReason::Decode(other.to_string()),
                };
                info!(stage = %SubmissionStage::Rejected, reason = %reason, "Submission rejected");
                return Ok(SubmissionOutcome::Rejected { reason });
            }
            Err(e) => return Err(e),
        };
        debug!(
            stage = %SubmissionStage::Fingerprinted,
            phash = %extraction.fingerprint.phash,
            ahash = %extraction.fingerprint.ahash,
            dhash = %extraction.fingerprint.dhash,
            "Fingerprint extracted"
        );

        let matches = self.selector.select(self.repo.as_ref(), &extraction.fingerprint).await?;
        if !matches.is_empty() {
            return Ok(self.duplicate(matches));
        }

        self.admit(temp, extraction, started).await
    }

    fn duplicate(&self, mut matches: Vec<CandidateMatch>) -> SubmissionOutcome {
        let total = matches.len();
        matches.truncate(self.selector.config().presentation_limit);
        info!(
            stage = %SubmissionStage::Duplicate,
            total,
            best = matches.first().map(|m| m.similarity),
            "Duplicate detected"
        );
        SubmissionOutcome::Duplicate { matches, total }
    }

    async fn admit(
        &self,
        temp: NamedTempFile,
        extraction: Extraction,
        started: Instant,
    ) -> Result<SubmissionOutcome> {
        let track_digest = self.selector.config().track_content_digest;
        let fingerprint = extraction.fingerprint;
        let relative = self.layout.relative_path(
            track_digest.then_some(&fingerprint.content_digest),
            extraction.extension(),
        );

        let layout = self.layout.clone();
        let dest = relative.clone();
        let created = tokio::task::spawn_blocking(move || layout.place(temp, &dest))
            .await
            .map_err(|e| DedupError::Internal(format!("storage worker failed: {}", e)))?
            .map_err(|e| DedupError::Persistence(format!("failed to store {}: {}", relative, e)))?;

        let new_record = NewFingerprintRecord::new(relative.clone(), &fingerprint, track_digest);
        match self.repo.insert(new_record).await {
            Ok(record) => {
                let elapsed = started.elapsed();
                info!(
                    stage = %SubmissionStage::Admitted,
                    id = %record.id,
                    path = %relative,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Image admitted"
                );
                Ok(SubmissionOutcome::Admitted {
                    record,
                    path: relative,
                    elapsed,
                })
            }
            Err(RepositoryError::DuplicateKey(key)) => {
                // Lost a race against a concurrent admission
                let digest = track_digest.then(|| fingerprint.hex(HashKind::ContentDigest));
                self.release_contested(&relative, created, digest).await;

                let matches = self.selector.select(self.repo.as_ref(), &fingerprint).await?;
                if matches.is_empty() {
                    return Err(DedupError::DuplicateKey(key));
                }
                debug!(key = %key, "Insert conflict resolved as duplicate");
                Ok(self.duplicate(matches))
            }
            Err(e) => {
                if created {
                    self.rollback(&relative);
                }
                Err(DedupError::Persistence(format!(
                    "failed to record {}: {}",
                    relative, e
                )))
            }
        }
    }

    /// After a uniqueness conflict, delete the file this call placed unless
    /// the committed winner points at it. Content-addressed paths are shared
    /// by every copy of the same bytes.
    async fn release_contested(&self, relative: &str, created: bool, digest: Option<String>) {
        if !created {
            return;
        }
        if let Some(digest) = digest {
            match self.repo.find_by_exact_hash(HashKind::ContentDigest, &digest).await {
                Ok(Some(owner)) if owner.storage_path == relative => {
                    debug!(path = %relative, "Stored file belongs to a committed record, keeping it");
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    // A row with this key exists; its file may be this one
                    warn!(path = %relative, error = %e, "Could not check file ownership after conflict");
                    return;
                }
            }
        }
        self.rollback(relative);
    }

    /// Delete a file placed by a failed admission.
    fn rollback(&self, relative: &str) {
        match self.layout.remove(relative) {
            Ok(()) => warn!(path = %relative, "Rolled back stored file after failed insert"),
            Err(e) => warn!(path = %relative, error = %e, "Failed to roll back stored file"),
        }
    }
}

/// RECEIVED: persist the bytes into a scoped temp file, then fingerprint
/// from that file. Failing to create the temp file is a server-side error;
/// extraction errors are handed back for classification.
fn receive(
    layout: &StorageLayout,
    extractor: &HashExtractor,
    data: &[u8],
) -> Result<(NamedTempFile, Result<Extraction>)> {
    let mut temp = layout
        .temp_file()
        .map_err(|e| DedupError::Persistence(format!("failed to create temp file: {}", e)))?;
    temp.write_all(data)
        .and_then(|()| temp.flush())
        .map_err(|e| DedupError::Persistence(format!("failed to write temp file: {}", e)))?;

    let extraction = extractor.extract_path(temp.path());
    Ok((temp, extraction))
}
