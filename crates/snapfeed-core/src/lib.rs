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

//! Engine-agnostic acquisition interfaces and DTOs.

/// Shared snapshot-acquisition model types.
pub mod model;

pub use model::{FetchOptions, FetchSnapshot};

use async_trait::async_trait;

/// Pluggable capability that produces one encoded image payload per call.
///
/// The polling loop treats this as an opaque, potentially slow network
/// operation; implementations must not hold locks shared with observers of
/// the snapshot directory. A stub returning canned bytes is sufficient for
/// tests.
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Fetch one encoded image from the remote source.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure or a non-success response; the
    /// caller treats every failure as transient and skips the iteration.
    async fn fetch_image(&self) -> anyhow::Result<Vec<u8>>;

    /// File extension (without the dot) matching the payloads this source
    /// produces, used when persisting fetched bytes.
    fn extension(&self) -> &'static str {
        "jpg"
    }
}
