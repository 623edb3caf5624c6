//! Application boot sequence: telemetry, pipeline wiring, run-until-done.

use snapfeed_config::AppConfig;
use snapfeed_events::Event;
use snapfeed_telemetry::{LogFormat, LoggingConfig, build_sha};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::facade::Snapfeed;

/// Boot the pipeline from configuration and run until a shutdown signal or,
/// when a benchmark window is configured, until the window reports.
///
/// # Errors
///
/// Returns an error if telemetry installation, pipeline construction, or the
/// initial `start` fails.
pub async fn run(config: AppConfig) -> AppResult<()> {
    let format = config
        .logging
        .format
        .as_deref()
        .map_or_else(LogFormat::infer, LogFormat::from_config);
    let logging = LoggingConfig {
        level: &config.logging.level,
        format,
        build_sha: build_sha(),
    };
    snapfeed_telemetry::init_logging(&logging)
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;

    info!("snapfeed bootstrap starting");
    let app = Snapfeed::from_config(&config)?;
    app.start(&config.directory)?;

    let benchmark = config.benchmark_window();
    if let Some(window) = benchmark {
        app.arm_benchmark(window);
        info!(window_secs = window.as_secs(), "benchmark window armed");
    }

    wait_for_shutdown(&app, benchmark.is_some()).await;
    app.stop();
    info!("snapfeed shutting down");
    Ok(())
}

/// Block until ctrl-c, the event stream closing, or — when a benchmark is
/// armed — the benchmark report.
async fn wait_for_shutdown(app: &Snapfeed, benchmark_armed: bool) {
    let mut stream = app.subscribe(None);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
            envelope = stream.next() => {
                match envelope {
                    Some(envelope) => {
                        if benchmark_armed
                            && matches!(envelope.event, Event::BenchmarkCompleted { .. })
                        {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }
}
