//! Shared application state for the drop server.
//!
//! [`AppState`] holds the broadcast bus that fans drop events out to
//! viewer streams, the dropper directory used for identity resolution,
//! and the counters the status surface reports. It is built once at
//! startup and injected into handlers via Axum's `State` extractor;
//! tests construct a fresh state (and therefore a fresh bus) per case.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use emojifall_bus::EventBus;
use emojifall_directory::DropperDirectory;
use emojifall_types::{DropEvent, TOPIC_DROP};

/// Capacity of each viewer's forwarding channel.
///
/// A viewer that falls more than this many events behind starts losing
/// events (delivery is best-effort); the bus itself never blocks on a
/// slow viewer.
pub const FORWARD_CAPACITY: usize = 64;

/// Shared state for the Axum application.
#[derive(Debug)]
pub struct AppState {
    /// Broadcast bus carrying drop events from ingest to viewer streams.
    pub bus: EventBus<DropEvent>,
    /// Identity directory consulted once per delivered event.
    pub directory: Arc<DropperDirectory>,
    drops_published: AtomicU64,
    started_at: Instant,
}

impl AppState {
    /// Create application state around the given directory with a fresh,
    /// empty bus.
    pub fn new(directory: Arc<DropperDirectory>) -> Self {
        Self {
            bus: EventBus::new(),
            directory,
            drops_published: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// Number of viewer streams currently subscribed to drop events.
    pub fn viewer_count(&self) -> usize {
        self.bus.subscriber_count(TOPIC_DROP)
    }

    /// Record that `count` drops were handed to the bus.
    pub fn record_published(&self, count: u64) {
        self.drops_published.fetch_add(count, Ordering::Relaxed);
    }

    /// Total drops published since startup.
    pub fn drops_published(&self) -> u64 {
        self.drops_published.load(Ordering::Relaxed)
    }

    /// Time since this state was created.
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Arc::new(DropperDirectory::new()))
    }
}
