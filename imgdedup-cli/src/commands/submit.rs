//! Submit command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use imgdedup_core::{AdmissionPipeline, DatabaseConfig, DetectionConfig, SubmissionOutcome};
use serde_json::json;
use tracing::info;

use crate::exit_codes::{ExitCode, DATA_ERROR, DUPLICATE_FOUND, INPUT_ERROR};
use crate::utils::{format_timestamp, open_repository};
use crate::{CorpusArgs, OutputFormat};

/// Execute the submit command.
pub async fn execute(
    file: PathBuf,
    corpus: CorpusArgs,
    threshold: Option<f64>,
    format: OutputFormat,
    quiet: bool,
) -> Result<ExitCode> {
    let mut detection = DetectionConfig::from_env();
    if let Some(threshold) = threshold {
        detection = detection.with_threshold(threshold);
    }

    let repo = open_repository(&DatabaseConfig::from_env()).await?;
    let pipeline = AdmissionPipeline::new(repo, detection, &corpus.storage());
    pipeline
        .layout()
        .ensure_dirs()
        .context("Failed to write upload directory")?;

    if !file.is_file() {
        anyhow::bail!("Failed to read file: {} (not found)", file.display());
    }

    let outcome = pipeline
        .submit_path(&file)
        .await
        .with_context(|| format!("Submission of {} failed", file.display()))?;
    info!(path = %file.display(), stage = %outcome.stage(), "Submission finished");

    match outcome {
        SubmissionOutcome::Admitted {
            record,
            path,
            elapsed,
        } => {
            match format {
                OutputFormat::Json => {
                    let out = json!({
                        "status": "success",
                        "id": record.id,
                        "path": path,
                        "processing_time": elapsed.as_secs_f64(),
                    });
                    println!("{}", serde_json::to_string_pretty(&out)?);
                }
                OutputFormat::Text if quiet => {}
                OutputFormat::Text => {
                    println!("{} {}", "Admitted:".green().bold(), path);
                    println!("   {} {}", "Record:".dimmed(), record.id);
                    println!("   {} {:.1} ms", "Took:".dimmed(), elapsed.as_secs_f64() * 1000.0);
                }
            }
            Ok(ExitCode::success())
        }
        SubmissionOutcome::Duplicate { matches, total } => {
            match format {
                OutputFormat::Json => {
                    let out = json!({
                        "status": "duplicate",
                        "total": total,
                        "matches": matches,
                    });
                    println!("{}", serde_json::to_string_pretty(&out)?);
                }
                OutputFormat::Text if quiet => {}
                OutputFormat::Text => {
                    println!(
                        "{} found {} similar image(s)",
                        "Duplicate:".yellow().bold(),
                        total
                    );
                    for m in &matches {
                        println!(
                            "   {:>6.2}%  {}  {}",
                            m.similarity,
                            m.record.storage_path,
                            format_timestamp(m.record.created_at).dimmed()
                        );
                    }
                    if total > matches.len() {
                        println!("   {}", format!("... and {} more", total - matches.len()).dimmed());
                    }
                }
            }
            Ok(ExitCode::silent(DUPLICATE_FOUND))
        }
        SubmissionOutcome::Rejected { reason } => {
            let code = if reason.is_retryable() { INPUT_ERROR } else { DATA_ERROR };
            Ok(ExitCode::error(
                code,
                format!("Rejected {}: {}", file.display(), reason),
            ))
        }
    }
}
