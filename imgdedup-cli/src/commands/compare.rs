//! Compare command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use imgdedup_core::{score, HashKind};
use serde_json::json;

use crate::exit_codes::ExitCode;
use crate::utils::fingerprint_file;
use crate::OutputFormat;

/// Execute the compare command.
pub async fn execute(a: PathBuf, b: PathBuf, format: OutputFormat, quiet: bool) -> Result<ExitCode> {
    let left = fingerprint_file(&a)?.fingerprint;
    let right = fingerprint_file(&b)?.fingerprint;

    let similarity = score(&left.set(), &right.set()).context("Fingerprints not comparable")?;
    let distances: Vec<(HashKind, u32)> = HashKind::PERCEPTUAL
        .iter()
        .filter_map(|&kind| {
            let (x, y) = (left.set().get(kind)?, right.set().get(kind)?);
            Some((kind, x.hamming_distance(y)))
        })
        .collect();
    let identical = left.content_digest == right.content_digest;

    match format {
        OutputFormat::Json => {
            let distance: serde_json::Map<String, serde_json::Value> = distances
                .iter()
                .map(|(kind, d)| (kind.as_str().to_string(), json!(d)))
                .collect();
            let out = json!({
                "a": a.display().to_string(),
                "b": b.display().to_string(),
                "similarity": similarity,
                "distance": distance,
                "identical_bytes": identical,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text if quiet => println!("{:.2}", similarity),
        OutputFormat::Text => {
            println!("{} {:.2}%", "Similarity:".bold(), similarity);
            for (kind, d) in &distances {
                println!("   {} {} bits", format!("{} distance:", kind).dimmed(), d);
            }
            if identical {
                println!("   {}", "Byte-identical files".green());
            }
        }
    }

    Ok(ExitCode::success())
}
