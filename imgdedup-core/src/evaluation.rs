//! Offline evaluation against labelled ground truth.
//!
//! Replays every stored pair through [`similarity::score`], the same
//! function the admission path uses, and reports precision, recall and F1.
//!
//! Ground truth is a JSON object mapping a storage path to the paths of the
//! images labelled as its duplicates:
//!
//! ```json
//! { "cat.jpg": ["cat-resized.jpg"], "cat-resized.jpg": ["cat.jpg"] }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::record::FingerprintRecord;
use crate::similarity;

/// Default threshold for evaluation runs, lower than the admission default.
pub const DEFAULT_EVALUATION_THRESHOLD: f64 = 70.0;

/// Image path to the paths of its labelled (or predicted) duplicates.
pub type SimilarityMap = BTreeMap<String, Vec<String>>;

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("Failed to read ground truth: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid ground truth JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

pub fn load_ground_truth(path: &Path) -> Result<SimilarityMap, EvaluationError> {
    let raw = std::fs::read_to_string(path)?;
    parse_ground_truth(&raw)
}

pub fn parse_ground_truth(raw: &str) -> Result<SimilarityMap, EvaluationError> {
    Ok(serde_json::from_str(raw)?)
}

/// For every record, all other records scoring at least `threshold`.
///
/// Pairs that cannot be scored are logged and treated as non-matches.
pub fn predict(records: &[FingerprintRecord], threshold: f64) -> SimilarityMap {
    let sets: Vec<_> = records
        .iter()
        .map(|r| match r.fingerprints() {
            Ok(set) => Some(set),
            Err(e) => {
                warn!(path = %r.storage_path, error = %e, "Unreadable fingerprint, excluded from evaluation");
                None
            }
        })
        .collect();

    let mut predictions = SimilarityMap::new();
    for (i, record) in records.iter().enumerate() {
        let mut similar = Vec::new();
        if let Some(a) = &sets[i] {
            for (j, other) in records.iter().enumerate() {
                if i == j || other.storage_path == record.storage_path {
                    continue;
                }
                let Some(b) = &sets[j] else { continue };
                match similarity::score(a, b) {
                    Ok(s) if s >= threshold => similar.push(other.storage_path.clone()),
                    Ok(_) => {}
                    Err(e) => {
                        warn!(a = %record.storage_path, b = %other.storage_path, error = %e, "Pair not comparable")
                    }
                }
            }
        }
        predictions.insert(record.storage_path.clone(), similar);
    }
    predictions
}

/// Micro-averaged precision, recall and F1.
///
/// Images missing from the ground truth are ignored. A zero denominator
/// yields 0 for that metric.
pub fn calculate_metrics(predictions: &SimilarityMap, ground_truth: &SimilarityMap) -> Metrics {
    let mut tp = 0;
    let mut fp = 0;
    let mut fn_ = 0;

    for (image, predicted) in predictions {
        let Some(labelled) = ground_truth.get(image) else {
            continue;
        };
        let truth: BTreeSet<&str> = labelled.iter().map(String::as_str).collect();
        let predicted: BTreeSet<&str> = predicted.iter().map(String::as_str).collect();

        tp += truth.intersection(&predicted).count();
        fp += predicted.difference(&truth).count();
        fn_ += truth.difference(&predicted).count();
    }

    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1_score = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    Metrics {
        precision,
        recall,
        f1_score,
        true_positives: tp,
        false_positives: fp,
        false_negatives: fn_,
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}
