//! Configuration assembly: file, then environment overrides, then validation.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::model::AppConfig;

/// Environment variable prefix recognised by the loader.
const ENV_PREFIX: &str = "SNAPFEED_";

/// Load configuration from an optional YAML file plus process environment
/// overrides, then validate.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, an override cannot
/// be interpreted, or the assembled configuration fails validation.
pub fn load(path: Option<&Path>) -> ConfigResult<AppConfig> {
    load_with_env(path, |name| std::env::var(name).ok())
}

/// Load configuration with an injectable environment lookup.
///
/// # Errors
///
/// Same failure modes as [`load`].
pub fn load_with_env(
    path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> ConfigResult<AppConfig> {
    let config = assemble_with_env(path, env)?;
    config.validate()?;
    Ok(config)
}

/// Assemble configuration from file and environment without validating, so
/// callers can layer their own overrides (e.g. CLI flags) before validation.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or an override
/// cannot be interpreted.
pub fn assemble(path: Option<&Path>) -> ConfigResult<AppConfig> {
    assemble_with_env(path, |name| std::env::var(name).ok())
}

/// Assemble configuration with an injectable environment lookup.
///
/// # Errors
///
/// Same failure modes as [`assemble`].
pub fn assemble_with_env(
    path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> ConfigResult<AppConfig> {
    let mut config = match path {
        Some(path) => parse_file(path)?,
        None => AppConfig::default(),
    };
    apply_env_overrides(&mut config, env)?;
    Ok(config)
}

fn parse_file(path: &Path) -> ConfigResult<AppConfig> {
    let raw =
        fs::read_to_string(path).map_err(|source| ConfigError::io("load.read", path, source))?;
    let config = serde_yaml::from_str(&raw).map_err(|source| ConfigError::parse(path, source))?;
    debug!(path = %path.display(), "configuration file loaded");
    Ok(config)
}

fn apply_env_overrides(
    config: &mut AppConfig,
    env: impl Fn(&str) -> Option<String>,
) -> ConfigResult<()> {
    let var = |suffix: &str| env(&format!("{ENV_PREFIX}{suffix}"));

    if let Some(url) = var("SOURCE_URL") {
        config.source_url = url;
    }
    if let Some(directory) = var("DIRECTORY") {
        config.directory = PathBuf::from(directory);
    }
    if let Some(interval) = var("INTERVAL_MS") {
        config.interval_ms = parse_number("SNAPFEED_INTERVAL_MS", &interval)?;
    }
    if let Some(secs) = var("BENCHMARK_SECS") {
        config.benchmark_secs = Some(parse_number("SNAPFEED_BENCHMARK_SECS", &secs)?);
    }
    if let Some(level) = var("LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(format) = var("LOG_FORMAT") {
        config.logging.format = Some(format);
    }
    Ok(())
}

fn parse_number(field: &'static str, value: &str) -> ConfigResult<u64> {
    value.parse().map_err(|_| ConfigError::Invalid {
        field,
        reason: "not_a_number",
        value: Some(value.to_string()),
    })
}
