//! Engine configuration.
//!
//! Every setting has a default and can be overridden from the environment.
//! Unparseable values fall back to the default.

use std::path::PathBuf;
use std::str::FromStr;

/// Duplicate-detection tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionConfig {
    /// Minimum similarity (percent) for a stored image to count as a duplicate (default: 85)
    pub similarity_threshold: f64,
    /// Records examined by the bounded scan, newest first (default: 1000)
    pub scan_limit: usize,
    /// The scan stops once this many matches qualify (default: 100)
    pub max_matches: usize,
    /// Matches reported to the client (default: 10)
    pub presentation_limit: usize,
    /// Store and look up SHA3-256 content digests (default: true)
    pub track_content_digest: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 85.0,
            scan_limit: 1000,
            max_matches: 100,
            presentation_limit: 10,
            track_content_digest: true,
        }
    }
}

impl DetectionConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            similarity_threshold: env_or("SIMILARITY_THRESHOLD", defaults.similarity_threshold)
                .clamp(0.0, 100.0),
            scan_limit: env_or("SCAN_LIMIT", defaults.scan_limit),
            max_matches: env_or("MAX_MATCHES", defaults.max_matches).max(1),
            presentation_limit: env_or("PRESENTATION_LIMIT", defaults.presentation_limit),
            track_content_digest: env_flag("TRACK_CONTENT_DIGEST", defaults.track_content_digest),
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }
}

/// Where admitted and in-flight bytes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Root of permanent storage (default: `uploads`)
    pub upload_dir: PathBuf,
    /// Scratch space for submissions in flight (default: `uploads/temp`)
    pub temp_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            temp_dir: PathBuf::from("uploads").join("temp"),
        }
    }
}

impl StorageConfig {
    pub fn from_env() -> Self {
        let upload_dir = std::env::var("UPLOAD_DIR")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("uploads"));

        let temp_dir = std::env::var("TEMP_DIR")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| upload_dir.join("temp"));

        Self {
            upload_dir,
            temp_dir,
        }
    }

    /// Rooted at `root`, with the temp dir inside it.
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let upload_dir = root.into();
        Self {
            temp_dir: upload_dir.join("temp"),
            upload_dir,
        }
    }
}

/// Database connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// PostgreSQL URL; `None` selects the in-memory repository
    pub url: Option<String>,
    /// Pool maximum connections (default: 20)
    pub max_connections: u32,
    /// Pool minimum connections (default: 2)
    pub min_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 20,
            min_connections: 2,
        }
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", defaults.max_connections),
            min_connections: env_or("DATABASE_MIN_CONNECTIONS", defaults.min_connections),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| !matches!(v.trim().to_lowercase().as_str(), "false" | "0" | "no" | "off"))
        .unwrap_or(default)
}
