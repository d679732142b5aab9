//! Image fingerprints.
//!
//! A fingerprint is three 64-bit perceptual hashes (`phash`, `ahash`, `dhash`)
//! plus a SHA3-256 digest of the raw bytes. Perceptual hashes survive
//! re-encoding and small edits; the digest only matches byte-identical files.
//!
//! # Usage
//!
//! ```no_run
//! use imgdedup_core::fingerprint::HashExtractor;
//! use imgdedup_core::similarity::score;
//!
//! let a = HashExtractor::new().extract_bytes(&std::fs::read("a.jpg").unwrap()).unwrap();
//! let b = HashExtractor::new().extract_bytes(&std::fs::read("b.png").unwrap()).unwrap();
//! let similarity = score(&a.fingerprint.set(), &b.fingerprint.set()).unwrap();
//! println!("{similarity:.2}%");
//! ```

mod extract;

pub use extract::{Extraction, HashExtractor};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use crate::error::{DedupError, Result};

/// Width of every perceptual hash in bits.
pub const HASH_BITS: u32 = 64;

/// Length of the canonical hex encoding of a perceptual hash.
pub const HASH_HEX_LEN: usize = 16;

/// Length of the hex encoding of a content digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// A 64-bit perceptual hash, persisted as 16 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PerceptualHash(u64);

impl PerceptualHash {
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Number of differing bits.
    pub fn hamming_distance(self, other: Self) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    pub fn to_hex(self) -> String {
        format!("{:016x}", self.0)
    }

    /// Decode exactly 16 hex characters.
    pub fn from_hex(s: &str) -> Result<Self> {
        if s.len() != HASH_HEX_LEN {
            return Err(DedupError::InvalidFingerprint(format!(
                "expected {} hex characters, got {}",
                HASH_HEX_LEN,
                s.len()
            )));
        }
        if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(DedupError::InvalidFingerprint(format!("invalid hex '{}'", s)));
        }
        u64::from_str_radix(s, 16)
            .map(Self)
            .map_err(|e| DedupError::InvalidFingerprint(format!("invalid hex '{}': {}", s, e)))
    }
}

impl fmt::Display for PerceptualHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for PerceptualHash {
    type Err = DedupError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for PerceptualHash {
    type Error = DedupError;

    fn try_from(s: String) -> Result<Self> {
        Self::from_hex(&s)
    }
}

impl From<PerceptualHash> for String {
    fn from(h: PerceptualHash) -> Self {
        h.to_hex()
    }
}

/// SHA3-256 digest of the raw (undecoded) bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    pub fn of(data: &[u8]) -> Self {
        let mut hasher = Sha3_256::new();
        hasher.update(data);
        let result = hasher.finalize();

        let mut digest = [0u8; 32];
        digest.copy_from_slice(&result);
        Self(digest)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Keys a record can be looked up by exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashKind {
    Phash,
    Ahash,
    Dhash,
    ContentDigest,
}

impl HashKind {
    /// The three perceptual families, in scoring order.
    pub const PERCEPTUAL: [HashKind; 3] = [HashKind::Phash, HashKind::Ahash, HashKind::Dhash];

    /// Column name in the persisted layout.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Phash => "phash",
            Self::Ahash => "ahash",
            Self::Dhash => "dhash",
            Self::ContentDigest => "content_digest",
        }
    }
}

impl fmt::Display for HashKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complete fingerprint of a freshly extracted image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    pub phash: PerceptualHash,
    pub ahash: PerceptualHash,
    pub dhash: PerceptualHash,
    pub content_digest: ContentDigest,
}

impl Fingerprint {
    /// Perceptual view used for scoring.
    pub fn set(&self) -> FingerprintSet {
        FingerprintSet {
            phash: Some(self.phash),
            ahash: Some(self.ahash),
            dhash: Some(self.dhash),
        }
    }

    /// Canonical encoding of the value stored under `kind`.
    pub fn hex(&self, kind: HashKind) -> String {
        match kind {
            HashKind::Phash => self.phash.to_hex(),
            HashKind::Ahash => self.ahash.to_hex(),
            HashKind::Dhash => self.dhash.to_hex(),
            HashKind::ContentDigest => self.content_digest.to_hex(),
        }
    }
}

/// Perceptual hashes of one side of a comparison. Stored records may lack a
/// hash type; such types are left out of the similarity mean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FingerprintSet {
    pub phash: Option<PerceptualHash>,
    pub ahash: Option<PerceptualHash>,
    pub dhash: Option<PerceptualHash>,
}

impl FingerprintSet {
    pub fn get(&self, kind: HashKind) -> Option<PerceptualHash> {
        match kind {
            HashKind::Phash => self.phash,
            HashKind::Ahash => self.ahash,
            HashKind::Dhash => self.dhash,
            HashKind::ContentDigest => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.phash.is_none() && self.ahash.is_none() && self.dhash.is_none()
    }
}
