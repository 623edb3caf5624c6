#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Shared snapshot-directory persistence.
//!
//! The store owns a single flat directory of image files. Writers land each
//! payload under a fresh collision-resistant name via write-then-rename, so a
//! file is never rewritten in place and observers can never list a
//! half-written current file. A `watch`-channel version counter announces
//! visible mutations; it coalesces bursts and carries no ordering guarantee —
//! consumers must re-list rather than trust notification order.

mod error;

pub use error::{StoreError, StoreResult};

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

/// Suffix applied to in-flight writes; suffixed files are never listed.
const PART_SUFFIX: &str = ".part";

/// Extensions considered snapshot candidates by `list`.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// One visible file in the snapshot directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Candidate {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// Filesystem modification time.
    pub modified_at: DateTime<Utc>,
    /// Encoded payload size on disk.
    pub size_bytes: u64,
}

impl Candidate {
    /// File name component of the candidate path.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }
}

/// Flat-directory store shared between the acquisition loop and the selector.
#[derive(Clone, Debug)]
pub struct DirectoryStore {
    root: PathBuf,
    changes: Arc<watch::Sender<u64>>,
}

impl DirectoryStore {
    /// Construct a store rooted at the given snapshot directory.
    ///
    /// The directory is not touched until `ensure_exists` or the first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            root: root.into(),
            changes: Arc::new(changes),
        }
    }

    /// Snapshot directory this store operates on.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the snapshot directory (and parents) if absent; idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the path exists
    /// but is not a directory.
    pub fn ensure_exists(&self) -> StoreResult<()> {
        fs::create_dir_all(&self.root)
            .map_err(|source| StoreError::io("ensure_exists.create_dir", &self.root, source))?;
        if !self.root.is_dir() {
            return Err(StoreError::NotADirectory {
                path: self.root.clone(),
            });
        }
        Ok(())
    }

    /// Persist one encoded image payload under a fresh unique name.
    ///
    /// The payload lands under a `.part`-suffixed temp name, is flushed, and
    /// only then renamed to its final name, so `list` never observes a
    /// partial write under a candidate name.
    ///
    /// # Errors
    ///
    /// Returns an error if the temp file cannot be created, written, flushed,
    /// or renamed into place.
    pub fn write_image(&self, bytes: &[u8], extension: &str) -> StoreResult<Candidate> {
        let token = Uuid::new_v4();
        let final_name = format!("{token}.{extension}");
        let temp_name = format!("{final_name}{PART_SUFFIX}");
        let temp_path = self.root.join(&temp_name);
        let final_path = self.root.join(&final_name);

        let mut file = File::create(&temp_path)
            .map_err(|source| StoreError::io("write_image.create", &temp_path, source))?;
        file.write_all(bytes)
            .map_err(|source| StoreError::io("write_image.write", &temp_path, source))?;
        file.flush()
            .map_err(|source| StoreError::io("write_image.flush", &temp_path, source))?;
        drop(file);

        fs::rename(&temp_path, &final_path).map_err(|source| {
            // Leave no orphaned temp file behind when the rename fails.
            if let Err(cleanup) = fs::remove_file(&temp_path)
                && cleanup.kind() != io::ErrorKind::NotFound
            {
                warn!(
                    error = %cleanup,
                    path = %temp_path.display(),
                    "failed to remove orphaned temp file"
                );
            }
            StoreError::io("write_image.rename", &final_path, source)
        })?;

        let metadata = fs::metadata(&final_path)
            .map_err(|source| StoreError::io("write_image.metadata", &final_path, source))?;
        let candidate = Candidate {
            path: final_path,
            modified_at: modified_time(&metadata),
            size_bytes: metadata.len(),
        };

        self.mark_changed();
        Ok(candidate)
    }

    /// Snapshot of all currently visible candidates.
    ///
    /// Temp files, dotfiles, subdirectories, and non-image extensions are
    /// excluded. Entries that vanish between the directory walk and their
    /// metadata read are skipped, not errors. The result is a restartable
    /// snapshot, not a live stream; no ordering is guaranteed beyond what the
    /// annotations allow consumers to compute.
    ///
    /// # Errors
    ///
    /// Returns an error only if the directory itself cannot be read.
    pub fn list(&self) -> StoreResult<Vec<Candidate>> {
        let entries = fs::read_dir(&self.root)
            .map_err(|source| StoreError::io("list.read_dir", &self.root, source))?;

        let mut candidates = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!(error = %err, path = %self.root.display(), "skipping unreadable entry");
                    continue;
                }
            };
            let path = entry.path();
            if !is_candidate_name(&path) {
                continue;
            }
            // The file may have been deleted between the walk and this read.
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            candidates.push(Candidate {
                path,
                modified_at: modified_time(&metadata),
                size_bytes: metadata.len(),
            });
        }
        Ok(candidates)
    }

    /// Read the full payload of a candidate.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read (it may have been deleted
    /// since it was listed).
    pub fn read(&self, path: &Path) -> StoreResult<Vec<u8>> {
        fs::read(path).map_err(|source| StoreError::io("read.read_file", path, source))
    }

    /// Best-effort removal of a candidate.
    ///
    /// The file may already be gone or locked; either way the failure is
    /// logged and swallowed, never propagated.
    pub fn delete(&self, path: &Path) {
        match fs::remove_file(path) {
            Ok(()) => {
                debug!(path = %path.display(), "deleted superseded snapshot");
                self.mark_changed();
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "snapshot already gone");
            }
            Err(err) => {
                warn!(error = %err, path = %path.display(), "failed to delete snapshot");
            }
        }
    }

    /// Subscribe to the coalescing change feed.
    ///
    /// The value is a version counter; any observed change means "re-list".
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    fn mark_changed(&self) {
        self.changes.send_modify(|version| *version += 1);
    }
}

fn is_candidate_name(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    if name.starts_with('.') || name.ends_with(PART_SUFFIX) {
        return false;
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext))
        })
}

fn modified_time(metadata: &fs::Metadata) -> DateTime<Utc> {
    metadata
        .modified()
        .map_or_else(|_| Utc::now(), DateTime::<Utc>::from)
}
