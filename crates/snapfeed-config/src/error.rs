//! # Design
//!
//! - Structured, constant-message configuration errors.
//! - Validation failures carry the field, a machine-readable reason, and the
//!   offending value when available.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors produced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO failures while reading a configuration file.
    #[error("config io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// YAML parsing failures.
    #[error("config parse failure")]
    Parse {
        /// Path of the file that failed to parse.
        path: PathBuf,
        /// Underlying YAML error.
        source: serde_yaml::Error,
    },
    /// Configuration values were invalid.
    #[error("invalid configuration")]
    Invalid {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
}

impl ConfigError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, source: serde_yaml::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }
}
