//! Hash command implementation.

use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;
use imgdedup_core::HashKind;
use serde_json::json;
use tracing::info;

use crate::exit_codes::ExitCode;
use crate::utils::fingerprint_file;
use crate::OutputFormat;

/// Execute the hash command.
pub async fn execute(file: PathBuf, format: OutputFormat, quiet: bool) -> Result<ExitCode> {
    let extraction = fingerprint_file(&file)?;
    let fp = &extraction.fingerprint;

    info!(path = %file.display(), phash = %fp.phash, "Fingerprinted");

    match format {
        OutputFormat::Json => {
            let out = json!({
                "file": file.display().to_string(),
                "format": extraction.extension(),
                "bytes": extraction.byte_len,
                "phash": fp.hex(HashKind::Phash),
                "ahash": fp.hex(HashKind::Ahash),
                "dhash": fp.hex(HashKind::Dhash),
                "content_digest": fp.hex(HashKind::ContentDigest),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text if quiet => println!("{}", fp.phash),
        OutputFormat::Text => {
            println!("{}", file.display().to_string().bold());
            println!("   {} {} ({} bytes)", "Format:".dimmed(), extraction.extension(), extraction.byte_len);
            for kind in HashKind::PERCEPTUAL {
                println!("   {} {}", format!("{}:", kind).dimmed(), fp.hex(kind));
            }
            println!("   {} {}", "SHA3-256:".dimmed(), fp.hex(HashKind::ContentDigest));
        }
    }

    Ok(ExitCode::success())
}
