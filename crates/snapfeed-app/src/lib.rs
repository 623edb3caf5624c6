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

//! Snapfeed application wiring.
//!
//! Layout: `facade.rs` (the control surface owning engine, selector, and
//! benchmark timer), `bootstrap.rs` (boot sequence for the binary).

/// Application boot sequence.
pub mod bootstrap;
mod error;
/// Pipeline control facade.
pub mod facade;

pub use bootstrap::run;
pub use error::{AppError, AppResult};
pub use facade::Snapfeed;
