//! # Design
//!
//! - Centralize acquisition-engine errors with constant messages and
//!   context fields.
//! - Only `start` preconditions are fatal; everything inside the loop is
//!   logged and skipped, so no loop error appears here.

use thiserror::Error;

/// Result alias for acquisition-engine operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors surfaced by the acquisition engine.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The snapshot directory could not be created or accessed at `start`.
    #[error("snapshot directory unavailable")]
    Directory {
        /// Source store error.
        source: snapfeed_store::StoreError,
    },
    /// The HTTP client could not be constructed.
    #[error("http client construction failed")]
    Client {
        /// Operation identifier.
        operation: &'static str,
        /// Source HTTP client error.
        source: reqwest::Error,
    },
}
