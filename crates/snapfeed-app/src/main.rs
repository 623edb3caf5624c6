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

//! Binary entrypoint that assembles configuration from file, environment,
//! and flags, then launches the pipeline.

use std::path::PathBuf;

use clap::Parser;
use snapfeed_app::{AppError, AppResult, run};

/// Continuously mirror the newest snapshot from a remote image endpoint.
#[derive(Debug, Parser)]
#[command(name = "snapfeed", version, about)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, env = "SNAPFEED_CONFIG")]
    config: Option<PathBuf>,
    /// Image endpoint to poll, overriding the configuration file.
    #[arg(long)]
    url: Option<String>,
    /// Snapshot directory, overriding the configuration file.
    #[arg(long)]
    directory: Option<PathBuf>,
    /// Delay between fetch iterations in milliseconds.
    #[arg(long)]
    interval_ms: Option<u64>,
    /// Arm a one-shot benchmark window of this many seconds at startup.
    #[arg(long)]
    benchmark_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let mut config = snapfeed_config::assemble(cli.config.as_deref())
        .map_err(|err| AppError::Config {
            operation: "config.assemble",
            source: err,
        })?;
    if let Some(url) = cli.url {
        config.source_url = url;
    }
    if let Some(directory) = cli.directory {
        config.directory = directory;
    }
    if let Some(interval_ms) = cli.interval_ms {
        config.interval_ms = interval_ms;
    }
    if let Some(benchmark_secs) = cli.benchmark_secs {
        config.benchmark_secs = Some(benchmark_secs);
    }
    config.validate().map_err(|err| AppError::Config {
        operation: "config.validate",
        source: err,
    })?;

    run(config).await
}
