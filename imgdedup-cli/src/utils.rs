//! Common utility functions shared across CLI commands.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use imgdedup_core::{DatabaseConfig, Extraction, HashExtractor, MemoryRepository, Repository};
use tracing::{debug, warn};

/// File extensions picked up by directory walks, lowercase.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];

/// Whether `path` has one of [`IMAGE_EXTENSIONS`] (case-insensitive).
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// clap value parser for a percentage threshold.
pub fn parse_threshold(s: &str) -> std::result::Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    if (0.0..=100.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is outside 0-100"))
    }
}

/// Read and fingerprint one image file.
pub fn fingerprint_file(path: &Path) -> Result<Extraction> {
    let data =
        std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    debug!(path = %path.display(), bytes = data.len(), "Read file");

    HashExtractor::new()
        .extract_bytes(&data)
        .with_context(|| format!("Failed to fingerprint {}", path.display()))
}

/// PostgreSQL when `DATABASE_URL` is set, otherwise a process-local store.
pub async fn open_repository(database: &DatabaseConfig) -> Result<Arc<dyn Repository>> {
    match &database.url {
        #[cfg(feature = "postgres")]
        Some(url) => {
            let repo = imgdedup_core::PostgresRepository::connect(
                url,
                database.max_connections,
                database.min_connections,
            )
            .await
            .context("Failed to connect to database")?;
            Ok(Arc::new(repo))
        }
        #[cfg(not(feature = "postgres"))]
        Some(_) => {
            warn!("DATABASE_URL ignored: built without the postgres feature");
            Ok(Arc::new(MemoryRepository::new()))
        }
        None => {
            warn!("DATABASE_URL not set, using an in-memory repository for this run only");
            Ok(Arc::new(MemoryRepository::new()))
        }
    }
}

/// Format a timestamp as a human-readable UTC string.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_is_image_path() {
        assert!(is_image_path(Path::new("a/b/cat.PNG")));
        assert!(is_image_path(Path::new("photo.jpeg")));
        assert!(!is_image_path(Path::new("notes.txt")));
        assert!(!is_image_path(Path::new("noext")));
    }

    #[test]
    fn test_parse_threshold() {
        assert_eq!(parse_threshold("85"), Ok(85.0));
        assert_eq!(parse_threshold("0"), Ok(0.0));
        assert!(parse_threshold("100.5").is_err());
        assert!(parse_threshold("-1").is_err());
        assert!(parse_threshold("high").is_err());
    }

    #[test]
    fn test_format_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 12, 30, 45).unwrap();
        assert_eq!(format_timestamp(at), "2024-01-15 12:30:45 UTC");
    }
}
