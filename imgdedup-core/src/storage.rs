//! Permanent storage layout for admitted images.
//!
//! With a tracked digest, files are content-addressed and fanned out over
//! two directory levels: `<root>/<d[0..2]>/<d[2..4]>/<digest>.<ext>`.
//! Without one, names are `<root>/<millis>-<uuid>.<ext>`.
//! Record paths are stored relative to the root, always with `/`.

use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::fingerprint::ContentDigest;

#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
    temp_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: config.upload_dir.clone(),
            temp_dir: config.temp_dir.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Relative location for a new file.
    pub fn relative_path(&self, digest: Option<&ContentDigest>, extension: &str) -> String {
        match digest {
            Some(digest) => {
                let hex = digest.to_hex();
                format!("{}/{}/{}.{}", &hex[0..2], &hex[2..4], hex, extension)
            }
            None => format!(
                "{}-{}.{}",
                Utc::now().timestamp_millis(),
                Uuid::new_v4().simple(),
                extension
            ),
        }
    }

    pub fn absolute(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .fold(self.root.clone(), |path, part| path.join(part))
    }

    /// Create the root and temp directories.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(&self.temp_dir)
    }

    /// Scoped temporary file in the temp dir; deleted on drop.
    pub fn temp_file(&self) -> io::Result<NamedTempFile> {
        std::fs::create_dir_all(&self.temp_dir)?;
        tempfile::Builder::new()
            .prefix("upload-")
            .tempfile_in(&self.temp_dir)
    }

    /// Move `temp` to `relative`.
    ///
    /// Returns `true` when this call created the file, `false` when the
    /// destination already existed (content-addressed files are never
    /// overwritten). Falls back to a copy when rename is not possible.
    pub fn place(&self, temp: NamedTempFile, relative: &str) -> io::Result<bool> {
        let dest = self.absolute(relative);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if dest.exists() {
            return Ok(false);
        }

        match temp.persist_noclobber(&dest) {
            Ok(_) => Ok(true),
            Err(_) if dest.exists() => Ok(false),
            Err(e) => {
                // Rename across filesystems fails; copy, then drop the temp
                std::fs::copy(e.file.path(), &dest)?;
                Ok(true)
            }
        }
    }

    pub fn remove(&self, relative: &str) -> io::Result<()> {
        std::fs::remove_file(self.absolute(relative))
    }

    /// Remove everything under the root and recreate the empty directories.
    pub fn reset(&self) -> io::Result<()> {
        for dir in [&self.temp_dir, &self.root] {
            match std::fs::remove_dir_all(dir) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        self.ensure_dirs()
    }
}
