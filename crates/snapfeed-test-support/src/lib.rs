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

//! Test fixtures shared across the snapfeed workspace.

/// Image payload fixtures.
pub mod fixtures;

pub use fixtures::{encoded_jpeg, encoded_png, scratch_dir, truncated};
