//! Fingerprint extraction.
//!
//! Every hash starts from the same normalisation: decode (format guessed
//! from the content, never from a file name), convert to 8-bit luminance,
//! then let `image_hasher` downsample with Lanczos3 to the size each
//! algorithm needs. Container format therefore never leaks into the output.
//!
//! - `ahash`: [`HashAlg::Mean`] over an 8x8 grid.
//! - `dhash`: [`HashAlg::Gradient`] over a 9x8 grid, neighbours along rows.
//! - `phash`: [`HashAlg::Median`] over the 8x8 lowest DCT frequencies.
//!
//! Each 64-bit hash is read big-endian from the hasher's bytes.

use std::fmt;
use std::io::Read;
use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use image_hasher::{HashAlg, Hasher, HasherConfig, ImageHash};

use super::{ContentDigest, Fingerprint, PerceptualHash};
use crate::error::{DedupError, Result};

const HASH_SIDE: u32 = 8;

/// Result of extracting one image.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub fingerprint: Fingerprint,
    /// Container format detected from the bytes.
    pub format: ImageFormat,
    pub byte_len: usize,
}

impl Extraction {
    /// Canonical file extension for the detected format.
    pub fn extension(&self) -> &'static str {
        self.format.extensions_str().first().copied().unwrap_or("bin")
    }
}

/// Fingerprint extractor holding one configured hasher per hash kind.
///
/// Hashers are immutable once built; share one extractor behind an `Arc`.
pub struct HashExtractor {
    phash: Hasher,
    ahash: Hasher,
    dhash: Hasher,
}

impl HashExtractor {
    pub fn new() -> Self {
        let config = |alg| {
            HasherConfig::new()
                .hash_size(HASH_SIDE, HASH_SIDE)
                .resize_filter(FilterType::Lanczos3)
                .hash_alg(alg)
        };
        Self {
            phash: config(HashAlg::Median).preproc_dct().to_hasher(),
            ahash: config(HashAlg::Mean).to_hasher(),
            dhash: config(HashAlg::Gradient).to_hasher(),
        }
    }

    /// Read the stream to the end, then fingerprint the bytes.
    ///
    /// A short or failing read is an [`DedupError::Io`]; nothing is hashed
    /// from a partial stream.
    pub fn extract_reader<R: Read>(&self, mut reader: R) -> Result<Extraction> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        self.extract_bytes(&data)
    }

    pub fn extract_path(&self, path: &Path) -> Result<Extraction> {
        let file = std::fs::File::open(path)?;
        self.extract_reader(std::io::BufReader::new(file))
    }

    pub fn extract_bytes(&self, data: &[u8]) -> Result<Extraction> {
        let content_digest = ContentDigest::of(data);

        let format = image::guess_format(data)
            .map_err(|e| DedupError::Decode(format!("Unrecognised image format: {}", e)))?;
        let image = image::load_from_memory_with_format(data, format)
            .map_err(|e| DedupError::Decode(format!("Failed to decode image: {}", e)))?;

        let (phash, ahash, dhash) = self.perceptual_hashes(&image)?;

        Ok(Extraction {
            fingerprint: Fingerprint {
                phash,
                ahash,
                dhash,
                content_digest,
            },
            format,
            byte_len: data.len(),
        })
    }

    /// Compute `(phash, ahash, dhash)` for an already decoded image.
    pub fn perceptual_hashes(
        &self,
        image: &DynamicImage,
    ) -> Result<(PerceptualHash, PerceptualHash, PerceptualHash)> {
        let luma = DynamicImage::ImageLuma8(image.to_luma8());
        Ok((
            to_perceptual(self.phash.hash_image(&luma))?,
            to_perceptual(self.ahash.hash_image(&luma))?,
            to_perceptual(self.dhash.hash_image(&luma))?,
        ))
    }

    /// MIME type of the image format recognised from the leading bytes.
    ///
    /// Only magic bytes are inspected; nothing is decoded.
    pub fn sniff_mime(data: &[u8]) -> Option<&'static str> {
        image::guess_format(data).ok().map(|f| f.to_mime_type())
    }
}

impl Default for HashExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HashExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashExtractor")
            .field("hash_bits", &(HASH_SIDE * HASH_SIDE))
            .finish_non_exhaustive()
    }
}

fn to_perceptual(hash: ImageHash) -> Result<PerceptualHash> {
    let bytes: [u8; 8] = hash.as_bytes().try_into().map_err(|_| {
        DedupError::Internal(format!(
            "expected a 64-bit hash, got {} bytes",
            hash.as_bytes().len()
        ))
    })?;
    Ok(PerceptualHash::from_bits(u64::from_be_bytes(bytes)))
}
