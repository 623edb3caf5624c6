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

//! Acquisition engine: start/stop lifecycle, the polling loop, the HTTP
//! image source, and the one-shot benchmark window.

/// One-shot benchmark deadline.
pub mod bench;
/// Engine lifecycle and the polling loop.
pub mod engine;
mod error;
/// HTTP-backed image source.
pub mod source;

pub use bench::BenchmarkTimer;
pub use engine::{FetchEngine, STOP_GRACE, StartOutcome};
pub use error::{FetchError, FetchResult};
pub use source::HttpImageSource;
