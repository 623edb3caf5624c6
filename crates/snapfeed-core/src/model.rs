//! Core acquisition domain types shared across the workspace.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Knobs applied to the acquisition loop when a session starts.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FetchOptions {
    /// Delay applied between loop iterations. Zero means back-to-back
    /// iterations, which is the baseline behaviour.
    #[serde(default, with = "duration_ms")]
    pub interval: Duration,
}

impl FetchOptions {
    /// Convenience constructor for a paced loop.
    #[must_use]
    pub const fn with_interval(interval: Duration) -> Self {
        Self { interval }
    }
}

/// Immutable view of the acquisition session handed to callers for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSnapshot {
    /// Whether the loop is accepting further iterations.
    pub running: bool,
    /// Successful writes since the session started.
    pub success_count: u64,
    /// When the current (or most recent) session started.
    pub started_at: Option<DateTime<Utc>>,
    /// Snapshot directory of the current (or most recent) session.
    pub directory: Option<PathBuf>,
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(
        duration: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
