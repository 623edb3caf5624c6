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

//! Core event bus for the snapfeed pipeline.
//!
//! The bus provides a typed event enum, sequential identifiers, and support
//! for replaying recent events when subscribers reconnect. Internally it uses
//! `tokio::broadcast` with a bounded buffer; when the channel overflows, the
//! oldest events are dropped, matching the desired backpressure behaviour.
//! Workers publish immutable snapshots (paths, dimensions, counts) — never
//! shared mutable state.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::sync::broadcast::{Receiver, Sender};

/// Identifier assigned to each event emitted by the pipeline.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// Typed domain events surfaced across the pipeline.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A new snapshot was validated and is now the current image.
    ImageAvailable {
        /// Path of the delivered snapshot file.
        path: String,
        /// Decoded pixel width.
        width: u32,
        /// Decoded pixel height.
        height: u32,
        /// Encoded payload size on disk.
        size_bytes: u64,
    },
    /// The acquisition loop landed another successful write.
    CountChanged {
        /// Successful writes since the session started.
        count: u64,
    },
    /// The acquisition loop transitioned between running and stopped.
    FetcherStateChanged {
        /// Whether the loop is accepting further iterations.
        running: bool,
    },
    /// A one-shot benchmark window elapsed.
    BenchmarkCompleted {
        /// Successful writes observed during the window.
        count: u64,
        /// Window length in milliseconds as measured at firing time.
        elapsed_ms: u64,
    },
    /// The set of degraded components changed.
    HealthChanged {
        /// Component names currently degraded; empty means recovered.
        degraded: Vec<String>,
    },
}

impl Event {
    /// Machine-friendly discriminator for downstream consumers.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ImageAvailable { .. } => "image_available",
            Self::CountChanged { .. } => "count_changed",
            Self::FetcherStateChanged { .. } => "fetcher_state_changed",
            Self::BenchmarkCompleted { .. } => "benchmark_completed",
            Self::HealthChanged { .. } => "health_changed",
        }
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and
/// emission timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Sequential identifier assigned at publish time.
    pub id: EventId,
    /// Emission timestamp.
    pub timestamp: DateTime<Utc>,
    /// The event payload.
    pub event: Event,
}

/// Shared event bus built on top of `tokio::broadcast`.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
    buffer: Arc<Mutex<VecDeque<EventEnvelope>>>,
    next_id: Arc<std::sync::atomic::AtomicU64>,
    replay_capacity: usize,
}

impl EventBus {
    /// Construct a new bus with the provided broadcast capacity.
    ///
    /// The broadcast channel uses the same capacity as the in-memory replay
    /// buffer, ensuring dropped events impact both structures consistently.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "event bus capacity must be positive");
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            buffer: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            next_id: Arc::new(std::sync::atomic::AtomicU64::new(1)),
            replay_capacity: capacity,
        }
    }

    /// Construct a bus with the default in-memory buffer size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Publish a new event to the bus, assigning it a sequential identifier.
    ///
    /// # Panics
    ///
    /// Panics if the replay buffer mutex has been poisoned.
    #[must_use]
    pub fn publish(&self, event: Event) -> EventId {
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let envelope = EventEnvelope {
            id,
            timestamp: Utc::now(),
            event,
        };

        {
            let mut buffer = self.buffer.lock().expect("event buffer mutex poisoned");
            if buffer.len() == self.replay_capacity {
                buffer.pop_front();
            }
            buffer.push_back(envelope.clone());
        }

        let _ = self.sender.send(envelope);
        id
    }

    /// Subscribe to the bus, replaying any buffered events newer than `since_id`.
    ///
    /// # Panics
    ///
    /// Panics if the replay buffer mutex has been poisoned.
    #[must_use]
    pub fn subscribe(&self, since_id: Option<EventId>) -> EventStream {
        let mut backlog = VecDeque::new();
        if let Some(since) = since_id {
            let buffer = self.buffer.lock().expect("event buffer mutex poisoned");
            for item in buffer.iter() {
                if item.id > since {
                    backlog.push_back(item.clone());
                }
            }
        }

        let receiver = self.sender.subscribe();
        EventStream { backlog, receiver }
    }

    /// Returns the last assigned identifier, if any events have been published.
    ///
    /// # Panics
    ///
    /// Panics if the replay buffer mutex has been poisoned.
    #[must_use]
    pub fn last_event_id(&self) -> Option<EventId> {
        let buffer = self.buffer.lock().expect("event buffer mutex poisoned");
        buffer.back().map(|event| event.id)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream wrapper that yields events either from the replay backlog or from
/// the live broadcast channel.
pub struct EventStream {
    backlog: VecDeque<EventEnvelope>,
    receiver: Receiver<EventEnvelope>,
}

impl EventStream {
    /// Receive the next event, respecting the replay backlog first.
    pub async fn next(&mut self) -> Option<EventEnvelope> {
        if let Some(event) = self.backlog.pop_front() {
            return Some(event);
        }

        match self.receiver.recv().await {
            Ok(event) => Some(event),
            Err(broadcast::error::RecvError::Lagged(_)) => self.receiver.recv().await.ok(),
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }
}
