//! # Design
//!
//! - Centralize application-level errors for bootstrap and orchestration.
//! - Keep error messages constant while carrying context fields for
//!   debugging.
//! - Preserve source errors without re-logging at call sites.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration operations failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: snapfeed_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: anyhow::Error,
    },
    /// Acquisition engine operations failed.
    #[error("fetch operation failed")]
    Fetch {
        /// Operation identifier.
        operation: &'static str,
        /// Source engine error.
        source: snapfeed_fetcher::FetchError,
    },
}

impl AppError {
    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) const fn config(
        operation: &'static str,
        source: snapfeed_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(operation: &'static str, source: anyhow::Error) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn fetch(
        operation: &'static str,
        source: snapfeed_fetcher::FetchError,
    ) -> Self {
        Self::Fetch { operation, source }
    }
}
