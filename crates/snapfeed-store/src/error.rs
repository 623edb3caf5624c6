//! # Design
//!
//! - Provide structured, constant-message errors for snapshot persistence.
//! - Capture operation context (operation name, path) to make failures
//!   reproducible in tests.
//! - Preserve source errors without interpolating context into messages.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for snapshot-directory operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors produced by the snapshot directory store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO failures while interacting with the snapshot directory.
    #[error("store io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The configured root exists but is not a directory.
    #[error("store root is not a directory")]
    NotADirectory {
        /// Offending path.
        path: PathBuf,
    },
}

impl StoreError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn io_helper_preserves_source() {
        let err = StoreError::io("list.read_dir", "/snapshots", io::Error::other("io"));
        assert!(matches!(err, StoreError::Io { .. }));
        assert!(err.source().is_some());
    }
}
