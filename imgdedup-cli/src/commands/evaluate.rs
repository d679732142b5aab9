//! Evaluate command implementation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use imgdedup_core::evaluation::{calculate_metrics, load_ground_truth, predict};
use imgdedup_core::{DatabaseConfig, FingerprintRecord, NewFingerprintRecord};
use serde_json::json;
use tracing::{info, warn};

use super::import::collect_images;
use crate::exit_codes::ExitCode;
use crate::utils::{fingerprint_file, open_repository};
use crate::OutputFormat;

/// Fingerprint every image under `dir`, keyed by its `/`-separated path relative to `dir`.
fn records_from_dir(dir: &Path) -> Result<Vec<FingerprintRecord>> {
    if !dir.is_dir() {
        anyhow::bail!("Failed to read directory: {} (not a directory)", dir.display());
    }

    let mut records = Vec::new();
    for path in collect_images(dir, true) {
        let relative = path
            .strip_prefix(dir)
            .unwrap_or(&path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        match fingerprint_file(&path) {
            Ok(extraction) => {
                records.push(NewFingerprintRecord::new(relative, &extraction.fingerprint, true).into_record())
            }
            Err(e) => warn!(file = %path.display(), error = %format!("{e:#}"), "Skipping image"),
        }
    }
    Ok(records)
}

async fn records_from_repository() -> Result<Vec<FingerprintRecord>> {
    let repo = open_repository(&DatabaseConfig::from_env()).await?;
    let count = repo.count().await.context("Repository error while counting records")?;
    let limit = usize::try_from(count).unwrap_or(usize::MAX);
    repo.scan(limit)
        .await
        .context("Repository error while loading records")
}

/// Execute the evaluate command.
pub async fn execute(
    ground_truth: PathBuf,
    images: Option<PathBuf>,
    threshold: f64,
    format: OutputFormat,
    quiet: bool,
) -> Result<ExitCode> {
    let truth = load_ground_truth(&ground_truth)?;

    let records = match &images {
        Some(dir) => records_from_dir(dir)?,
        None => records_from_repository().await?,
    };
    info!(records = records.len(), labelled = truth.len(), threshold, "Evaluating");

    let predictions = predict(&records, threshold);
    let metrics = calculate_metrics(&predictions, &truth);

    match format {
        OutputFormat::Json => {
            let out = json!({
                "threshold": threshold,
                "images": records.len(),
                "metrics": metrics,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text if quiet => println!("{:.3}", metrics.f1_score),
        OutputFormat::Text => {
            println!(
                "{} {} images at threshold {:.1}",
                "Evaluated".bold(),
                records.len(),
                threshold
            );
            println!("   {} {:.3}", "Precision:".dimmed(), metrics.precision);
            println!("   {} {:.3}", "Recall:".dimmed(), metrics.recall);
            println!("   {} {:.3}", "F1 score:".dimmed(), metrics.f1_score);
            println!(
                "   {} {} / {} / {}",
                "TP / FP / FN:".dimmed(),
                metrics.true_positives,
                metrics.false_positives,
                metrics.false_negatives
            );
        }
    }

    Ok(ExitCode::success())
}
