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

//! Configuration loading for the snapfeed application.
//!
//! Layout: `model.rs` (typed configuration and validation), `loader.rs`
//! (file parsing and environment overrides).

mod error;
mod loader;
mod model;

pub use error::{ConfigError, ConfigResult};
pub use loader::{assemble, assemble_with_env, load, load_with_env};
pub use model::{AppConfig, DEFAULT_SOURCE_URL, LoggingSection};
