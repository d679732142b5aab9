//! Reset command implementation.

use anyhow::{Context, Result};
use colored::Colorize;
use imgdedup_core::{DatabaseConfig, StorageLayout};
use tracing::info;

use crate::exit_codes::{ExitCode, USAGE_ERROR};
use crate::utils::open_repository;
use crate::CorpusArgs;

/// Execute the reset command.
pub async fn execute(corpus: CorpusArgs, yes: bool, quiet: bool) -> Result<ExitCode> {
    let storage = corpus.storage();
    if !yes {
        return Ok(ExitCode::error(
            USAGE_ERROR,
            format!(
                "Refusing to delete every record and {} without --yes",
                storage.upload_dir.display()
            ),
        ));
    }

    let repo = open_repository(&DatabaseConfig::from_env()).await?;
    let deleted = repo
        .clear()
        .await
        .context("Repository error while clearing records")?;

    let layout = StorageLayout::new(&storage);
    layout
        .reset()
        .with_context(|| format!("Failed to reset storage at {}", layout.root().display()))?;

    info!(records = deleted, root = %layout.root().display(), "Reset complete");
    if !quiet {
        println!("{} {} record(s) deleted", "Reset:".bold(), deleted);
        println!("   {} {}", "Storage:".dimmed(), layout.root().display());
    }

    Ok(ExitCode::success())
}
