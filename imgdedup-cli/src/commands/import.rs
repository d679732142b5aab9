//! Import command implementation.
//!
//! Walks a directory and submits every image through the admission
//! pipeline, at most `jobs` at a time.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use imgdedup_core::{AdmissionPipeline, DatabaseConfig, DetectionConfig, SubmissionOutcome};
use serde::Serialize;
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::exit_codes::{ExitCode, GENERAL_ERROR};
use crate::utils::{is_image_path, open_repository};
use crate::{CorpusArgs, OutputFormat};

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
struct ImportSummary {
    scanned: usize,
    admitted: usize,
    duplicate: usize,
    rejected: usize,
    failed: usize,
}

impl ImportSummary {
    fn record(&mut self, path: &Path, result: &imgdedup_core::Result<SubmissionOutcome>) {
        match result {
            Ok(SubmissionOutcome::Admitted { path: stored, .. }) => {
                debug!(file = %path.display(), stored = %stored, "Admitted");
                self.admitted += 1;
            }
            Ok(SubmissionOutcome::Duplicate { matches, total }) => {
                info!(
                    file = %path.display(),
                    total,
                    best = matches.first().map(|m| m.record.storage_path.as_str()),
                    "Duplicate"
                );
                self.duplicate += 1;
            }
            Ok(SubmissionOutcome::Rejected { reason }) => {
                warn!(file = %path.display(), reason = %reason, "Rejected");
                self.rejected += 1;
            }
            Err(e) => {
                error!(file = %path.display(), error = %e, "Submission failed");
                self.failed += 1;
            }
        }
    }
}

/// Image files under `dir`, sorted for a reproducible submission order.
pub(crate) fn collect_images(dir: &Path, recursive: bool) -> Vec<PathBuf> {
    let walker = WalkDir::new(dir)
        .follow_links(false)
        .max_depth(if recursive { usize::MAX } else { 1 });

    let mut files: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_image_path(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

/// Execute the import command.
pub async fn execute(
    dir: PathBuf,
    corpus: CorpusArgs,
    jobs: usize,
    recursive: bool,
    format: OutputFormat,
    quiet: bool,
) -> Result<ExitCode> {
    if !dir.is_dir() {
        bail!("Failed to read directory: {} (not a directory)", dir.display());
    }

    let storage = corpus.storage();
    let repo = open_repository(&DatabaseConfig::from_env()).await?;
    let pipeline = Arc::new(AdmissionPipeline::new(repo, DetectionConfig::from_env(), &storage));
    pipeline
        .layout()
        .ensure_dirs()
        .context("Failed to write upload directory")?;

    let files = collect_images(&dir, recursive);
    info!(dir = %dir.display(), files = files.len(), jobs, "Starting import");

    let started = Instant::now();
    let semaphore = Arc::new(Semaphore::new(jobs));
    let mut tasks = JoinSet::new();
    let mut summary = ImportSummary {
        scanned: files.len(),
        ..ImportSummary::default()
    };

    for path in files {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .context("Import worker pool closed")?;
        let pipeline = Arc::clone(&pipeline);
        tasks.spawn(async move {
            let result = pipeline.submit_path(&path).await;
            drop(permit);
            (path, result)
        });

        // Reap finished submissions so the set stays small
        while let Some(joined) = tasks.try_join_next() {
            let (path, result) = joined.context("Import worker panicked")?;
            summary.record(&path, &result);
        }
    }
    while let Some(joined) = tasks.join_next().await {
        let (path, result) = joined.context("Import worker panicked")?;
        summary.record(&path, &result);
    }

    let elapsed = started.elapsed().as_secs_f64();
    let throughput = if elapsed > 0.0 {
        summary.scanned as f64 / elapsed
    } else {
        0.0
    };

    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({
                "summary": summary,
                "elapsed_secs": elapsed,
                "images_per_sec": throughput,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text if quiet => {}
        OutputFormat::Text => {
            println!("{} {}", "Imported".bold(), dir.display());
            println!("   {} {}", "Scanned:".dimmed(), summary.scanned);
            println!("   {} {}", "Admitted:".dimmed(), summary.admitted.to_string().green());
            println!("   {} {}", "Duplicate:".dimmed(), summary.duplicate.to_string().yellow());
            println!("   {} {}", "Rejected:".dimmed(), summary.rejected);
            if summary.failed > 0 {
                println!("   {} {}", "Failed:".dimmed(), summary.failed.to_string().red());
            }
            println!("   {} {:.2}s ({:.1} images/s)", "Took:".dimmed(), elapsed, throughput);
        }
    }

    if summary.failed > 0 {
        Ok(ExitCode::error(
            GENERAL_ERROR,
            format!("{} of {} submissions failed", summary.failed, summary.scanned),
        ))
    } else {
        Ok(ExitCode::success())
    }
}
