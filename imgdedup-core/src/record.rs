//! Persisted fingerprint records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::fingerprint::{Fingerprint, FingerprintSet, HashKind, PerceptualHash};

/// One admitted image. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct FingerprintRecord {
    pub id: Uuid,
    /// Location of the stored bytes, relative to the upload root.
    pub storage_path: String,
    /// SHA3-256 of the raw bytes, 64 hex characters.
    pub content_digest: Option<String>,
    pub phash: Option<String>,
    pub ahash: Option<String>,
    pub dhash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FingerprintRecord {
    /// Decode the stored perceptual hashes.
    ///
    /// Missing columns stay `None`; a present but malformed value is an
    /// [`crate::DedupError::InvalidFingerprint`].
    pub fn fingerprints(&self) -> Result<FingerprintSet> {
        Ok(FingerprintSet {
            phash: decode(self.phash.as_deref())?,
            ahash: decode(self.ahash.as_deref())?,
            dhash: decode(self.dhash.as_deref())?,
        })
    }

    /// Stored value for `kind`, as persisted.
    pub fn value(&self, kind: HashKind) -> Option<&str> {
        match kind {
            HashKind::Phash => self.phash.as_deref(),
            HashKind::Ahash => self.ahash.as_deref(),
            HashKind::Dhash => self.dhash.as_deref(),
            HashKind::ContentDigest => self.content_digest.as_deref(),
        }
    }
}

fn decode(value: Option<&str>) -> Result<Option<PerceptualHash>> {
    value.map(PerceptualHash::from_hex).transpose()
}

/// A record about to be inserted. Only constructible from a complete
/// [`Fingerprint`], so all three perceptual hashes are always present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFingerprintRecord {
    storage_path: String,
    content_digest: Option<String>,
    phash: String,
    ahash: String,
    dhash: String,
}

impl NewFingerprintRecord {
    pub fn new(storage_path: impl Into<String>, fingerprint: &Fingerprint, track_digest: bool) -> Self {
        Self {
            storage_path: storage_path.into(),
            content_digest: track_digest.then(|| fingerprint.content_digest.to_hex()),
            phash: fingerprint.phash.to_hex(),
            ahash: fingerprint.ahash.to_hex(),
            dhash: fingerprint.dhash.to_hex(),
        }
    }

    pub fn storage_path(&self) -> &str {
        &self.storage_path
    }

    pub fn content_digest(&self) -> Option<&str> {
        self.content_digest.as_deref()
    }

    pub fn phash(&self) -> &str {
        &self.phash
    }

    pub fn ahash(&self) -> &str {
        &self.ahash
    }

    pub fn dhash(&self) -> &str {
        &self.dhash
    }

    /// Materialise with a fresh id and timestamp. Used by backends that do
    /// not assign these themselves.
    pub fn into_record(self) -> FingerprintRecord {
        FingerprintRecord {
            id: Uuid::new_v4(),
            storage_path: self.storage_path,
            content_digest: self.content_digest,
            phash: Some(self.phash),
            ahash: Some(self.ahash),
            dhash: Some(self.dhash),
            created_at: Utc::now(),
        }
    }
}
