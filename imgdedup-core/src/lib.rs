//! imgdedup Core - perceptual duplicate-detection engine
//!
//! A client submits an image and learns whether a near-duplicate already
//! exists in the corpus; if not, the image is durably admitted.
//!
//! # Features
//!
//! - Three 64-bit perceptual hashes (pHash, aHash, dHash) plus a SHA3-256
//!   content digest per image
//! - Similarity as the mean per-hash Hamming similarity, 0 to 100
//! - Two-phase candidate search: indexed exact lookups, then a bounded scan
//! - Atomic admission: no orphan files, no duplicate records under races
//! - In-memory and PostgreSQL (`postgres` feature) repositories
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use imgdedup_core::{
//!     AdmissionPipeline, DetectionConfig, MemoryRepository, StorageConfig, SubmissionOutcome,
//! };
//!
//! # async fn example() -> imgdedup_core::Result<()> {
//! let pipeline = AdmissionPipeline::new(
//!     Arc::new(MemoryRepository::new()),
//!     DetectionConfig::default(),
//!     &StorageConfig::default(),
//! );
//!
//! let bytes = std::fs::read("photo.jpg")?;
//! match pipeline.submit(bytes).await? {
//!     SubmissionOutcome::Admitted { path, .. } => println!("stored at {path}"),
//!     SubmissionOutcome::Duplicate { matches, .. } => {
//!         for m in matches {
//!             println!("{} ({:.2}%)", m.record.storage_path, m.similarity);
//!         }
//!     }
//!     SubmissionOutcome::Rejected { reason } => println!("rejected: {reason}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod candidate;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod fingerprint;
pub mod pipeline;
pub mod record;
pub mod repository;
pub mod similarity;
pub mod storage;

// Re-export main types for convenience
pub use candidate::{CandidateMatch, CandidateSelector, MatchKind};
pub use config::{DatabaseConfig, DetectionConfig, StorageConfig};
pub use error::{DedupError, Result};
pub use fingerprint::{
    ContentDigest, Extraction, Fingerprint, FingerprintSet, HashExtractor, HashKind,
    PerceptualHash,
};
pub use pipeline::{AdmissionPipeline, RejectReason, SubmissionOutcome, SubmissionStage};
pub use record::{FingerprintRecord, NewFingerprintRecord};
pub use repository::{MemoryRepository, Repository, RepositoryError};
pub use similarity::score;
pub use storage::StorageLayout;

#[cfg(feature = "postgres")]
pub use repository::PostgresRepository;
