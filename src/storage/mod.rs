// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Flat upload directory for raw uploads and annotated derivatives
//!
//! Every upload and every annotated output is written under one directory,
//! named by original filename with an `annotated_` prefix for the
//! derivative. Same-named files overwrite silently. Retention is an
//! explicit policy: `KeepAll` (unbounded accumulation, the default) or
//! `MaxAge`, which sweeps expired files on each store.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use thiserror::Error;
use tracing::{debug, warn};

/// Filename prefix for annotated derivatives
pub const ANNOTATED_PREFIX: &str = "annotated_";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid filename: {0:?}")]
    InvalidFilename(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Retention rule for stored images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionPolicy {
    /// Keep every file forever
    KeepAll,
    /// Remove files older than the given age on each store
    MaxAge(Duration),
}

/// Store for uploaded images and their annotated derivatives
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
    retention: RetentionPolicy,
}

/// Derived filename for the annotated copy of an upload
pub fn annotated_name(original: &str) -> String {
    format!("{ANNOTATED_PREFIX}{original}")
}

impl ImageStore {
    /// Open (and create if needed) the store rooted at `root`
    pub fn new<P: AsRef<Path>>(root: P, retention: RetentionPolicy) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root, retention })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    /// Persist a raw upload under its original filename, overwriting any
    /// previous file with the same name
    pub fn save_upload(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, StoreError> {
        let name = sanitize(filename)?;
        self.sweep_expired();
        let path = self.root.join(name);
        fs::write(&path, bytes)?;
        debug!("Stored upload {} ({} bytes)", name, bytes.len());
        Ok(path)
    }

    /// Persist an annotated derivative and return its retrieval filename
    pub fn save_annotated(&self, original: &str, bytes: &[u8]) -> Result<String, StoreError> {
        let name = annotated_name(sanitize(original)?);
        self.sweep_expired();
        fs::write(self.root.join(&name), bytes)?;
        debug!("Stored annotated image {} ({} bytes)", name, bytes.len());
        Ok(name)
    }

    /// Read a previously stored file by its retrieval filename
    pub fn read(&self, filename: &str) -> Result<Vec<u8>, StoreError> {
        let name = sanitize(filename)?;
        fs::read(self.root.join(name)).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StoreError::NotFound(name.to_string()),
            _ => StoreError::Io(e),
        })
    }

    /// Remove files older than the retention limit
    ///
    /// Sweep failures are logged and never fail the store operation that
    /// triggered them.
    fn sweep_expired(&self) {
        let RetentionPolicy::MaxAge(max_age) = self.retention else {
            return;
        };
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Retention sweep could not list {}: {}", self.root.display(), e);
                return;
            }
        };
        let now = SystemTime::now();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let age = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok());
            if let Some(age) = age {
                if age >= max_age {
                    if let Err(e) = fs::remove_file(&path) {
                        warn!("Retention sweep failed to remove {}: {}", path.display(), e);
                    } else {
                        debug!("Retention sweep removed {}", path.display());
                    }
                }
            }
        }
    }
}

/// Strip a client-supplied filename down to a safe base name
///
/// Rejects empty names and anything carrying path components; stored files
/// must stay inside the upload directory.
fn sanitize(filename: &str) -> Result<&str, StoreError> {
    if filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains('/')
        || filename.contains('\\')
    {
        return Err(StoreError::InvalidFilename(filename.to_string()));
    }
    Ok(filename)
}
