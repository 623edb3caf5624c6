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

//! Latest-candidate reconciliation over the snapshot directory.
//!
//! The worker treats the store's change feed as a coalescing trigger only:
//! every pass re-lists the directory and recomputes the true maximum, so
//! reordered or collapsed notifications can never cause an older snapshot to
//! be delivered after a newer one. Deletion is deferred — a candidate is
//! reclaimed only once a newer candidate has been validated and delivered in
//! its place, which protects files still being written from being destroyed.

mod worker;

pub use worker::spawn;
