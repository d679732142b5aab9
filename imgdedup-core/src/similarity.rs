//! Similarity scoring between two fingerprint sets.
//!
//! Each perceptual hash type present on both sides contributes
//! `100 * (1 - d / 64)` where `d` is the Hamming distance. The score is the
//! mean over the compared types, rounded to two decimals.

use crate::error::{DedupError, Result};
use crate::fingerprint::{FingerprintSet, HashKind, HASH_BITS};

/// Similarity of a single hash pair, in percent.
pub fn hash_similarity(distance: u32) -> f64 {
    100.0 * (1.0 - f64::from(distance) / f64::from(HASH_BITS))
}

/// Score two fingerprint sets. Pure, deterministic and symmetric.
///
/// Types missing on either side are left out of the mean. Fails with
/// [`DedupError::IncompleteFingerprint`] only if nothing can be compared.
pub fn score(a: &FingerprintSet, b: &FingerprintSet) -> Result<f64> {
    let mut total = 0.0;
    let mut compared = 0u32;

    for kind in HashKind::PERCEPTUAL {
        if let (Some(x), Some(y)) = (a.get(kind), b.get(kind)) {
            total += hash_similarity(x.hamming_distance(y));
            compared += 1;
        }
    }

    if compared == 0 {
        return Err(DedupError::IncompleteFingerprint(
            "no hash type present on both sides".to_string(),
        ));
    }

    Ok(round2(total / f64::from(compared)))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::PerceptualHash;

    fn set(p: u64, a: u64, d: u64) -> FingerprintSet {
        FingerprintSet {
            phash: Some(PerceptualHash::from_bits(p)),
            ahash: Some(PerceptualHash::from_bits(a)),
            dhash: Some(PerceptualHash::from_bits(d)),
        }
    }

    #[test]
    fn test_self_similarity_is_100() {
        let s = set(0x1234, 0xdead_beef, u64::MAX);
        assert_eq!(score(&s, &s).unwrap(), 100.0);
    }

    #[test]
    fn test_opposite_hashes_score_zero() {
        let a = set(0, 0, 0);
        let b = set(u64::MAX, u64::MAX, u64::MAX);
        assert_eq!(score(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn test_mean_is_rounded_to_two_decimals() {
        // distances 1, 2, 3: (98.4375 + 96.875 + 95.3125) / 3 = 96.875
        let a = set(0, 0, 0);
        let b = set(0b1, 0b11, 0b111);
        assert_eq!(score(&a, &b).unwrap(), 96.88);

        // distances 6, 6, 7: (90.625 + 90.625 + 89.0625) / 3 = 90.104..
        let c = set(0b11_1111, 0b11_1111, 0b111_1111);
        assert_eq!(score(&a, &c).unwrap(), 90.1);
    }

    #[test]
    fn test_symmetric() {
        let a = set(0x0f0f, 0xff00_ff00, 0x1357_9bdf);
        let b = set(0xf0f0, 0x00ff_00ff, 0x2468_ace0);
        assert_eq!(score(&a, &b).unwrap(), score(&b, &a).unwrap());
    }

    #[test]
    fn test_bounded_for_many_pairs() {
        let mut x = 0x9e37_79b9_7f4a_7c15u64;
        for _ in 0..200 {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let a = set(x, x.rotate_left(7), x.rotate_left(13));
            let b = set(x.rotate_right(3), !x, x ^ 0xffff);
            let s = score(&a, &b).unwrap();
            assert!((0.0..=100.0).contains(&s), "out of range: {}", s);
        }
    }

    #[test]
    fn test_missing_type_is_excluded() {
        let full = set(0, 0, 0);
        let partial = FingerprintSet {
            phash: Some(PerceptualHash::from_bits(0)),
            ahash: None,
            dhash: Some(PerceptualHash::from_bits(u64::MAX)),
        };
        // Only phash (100) and dhash (0) are compared
        assert_eq!(score(&full, &partial).unwrap(), 50.0);
        assert_eq!(score(&partial, &full).unwrap(), 50.0);
    }

    #[test]
    fn test_nothing_comparable_is_incomplete() {
        let only_p = FingerprintSet {
            phash: Some(PerceptualHash::from_bits(0)),
            ..Default::default()
        };
        let only_a = FingerprintSet {
            ahash: Some(PerceptualHash::from_bits(0)),
            ..Default::default()
        };
        assert!(matches!(
            score(&only_p, &only_a),
            Err(DedupError::IncompleteFingerprint(_))
        ));
        assert!(score(&FingerprintSet::default(), &only_p).is_err());
    }

    #[test]
    fn test_hash_similarity() {
        assert_eq!(hash_similarity(0), 100.0);
        assert_eq!(hash_similarity(64), 0.0);
        assert_eq!(hash_similarity(16), 75.0);
    }
}
