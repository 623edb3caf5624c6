//! Configuration model and validation.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use snapfeed_core::FetchOptions;

use crate::error::{ConfigError, ConfigResult};

/// Image endpoint used when no source is configured.
pub const DEFAULT_SOURCE_URL: &str = "https://picsum.photos/200/300";

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Image endpoint polled by the acquisition loop.
    #[serde(default = "default_source_url")]
    pub source_url: String,
    /// Snapshot directory shared between the loop and the selector.
    #[serde(default)]
    pub directory: PathBuf,
    /// Delay between loop iterations in milliseconds; zero means
    /// back-to-back iterations.
    #[serde(default)]
    pub interval_ms: u64,
    /// Optional one-shot benchmark window, armed at startup when present.
    #[serde(default)]
    pub benchmark_secs: Option<u64>,
    /// Logging section.
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Log level string passed to the subscriber (e.g. `info`).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format: `json`, `pretty`, or unset to infer from the build.
    #[serde(default)]
    pub format: Option<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source_url: default_source_url(),
            directory: PathBuf::new(),
            interval_ms: 0,
            benchmark_secs: None,
            logging: LoggingSection::default(),
        }
    }
}

impl AppConfig {
    /// Validate the assembled configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending field.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.source_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "source_url",
                reason: "empty",
                value: None,
            });
        }
        if !self.source_url.starts_with("http://") && !self.source_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                field: "source_url",
                reason: "unsupported_scheme",
                value: Some(self.source_url.clone()),
            });
        }
        if self.directory.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                field: "directory",
                reason: "empty",
                value: None,
            });
        }
        if let Some(secs) = self.benchmark_secs
            && secs == 0
        {
            return Err(ConfigError::Invalid {
                field: "benchmark_secs",
                reason: "zero",
                value: Some(secs.to_string()),
            });
        }
        Ok(())
    }

    /// Loop pacing derived from `interval_ms`.
    #[must_use]
    pub const fn fetch_options(&self) -> FetchOptions {
        FetchOptions::with_interval(Duration::from_millis(self.interval_ms))
    }

    /// Benchmark window derived from `benchmark_secs`.
    #[must_use]
    pub const fn benchmark_window(&self) -> Option<Duration> {
        match self.benchmark_secs {
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        }
    }
}

fn default_source_url() -> String {
    DEFAULT_SOURCE_URL.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            directory: PathBuf::from("/tmp/snapfeed"),
            ..AppConfig::default()
        }
    }

    #[test]
    fn defaults_point_at_the_public_endpoint() {
        let config = AppConfig::default();
        assert_eq!(config.source_url, DEFAULT_SOURCE_URL);
        assert_eq!(config.interval_ms, 0);
        assert!(config.benchmark_secs.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn validation_accepts_a_complete_config() {
        valid_config().validate().expect("config should validate");
    }

    #[test]
    fn validation_rejects_missing_directory() {
        let config = AppConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "directory",
                ..
            })
        ));
    }

    #[test]
    fn validation_rejects_non_http_urls() {
        let config = AppConfig {
            source_url: "ftp://example.test/cam.jpg".into(),
            ..valid_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "source_url",
                reason: "unsupported_scheme",
                ..
            })
        ));
    }

    #[test]
    fn validation_rejects_zero_benchmark_window() {
        let config = AppConfig {
            benchmark_secs: Some(0),
            ..valid_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "benchmark_secs",
                ..
            })
        ));
    }

    #[test]
    fn derived_durations_match_fields() {
        let config = AppConfig {
            interval_ms: 50,
            benchmark_secs: Some(60),
            ..valid_config()
        };
        assert_eq!(
            config.fetch_options().interval,
            Duration::from_millis(50)
        );
        assert_eq!(config.benchmark_window(), Some(Duration::from_secs(60)));
    }
}
