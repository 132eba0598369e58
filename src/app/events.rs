//! Cache notifications
//!
//! Sessions and sweeps publish [`CacheEvent`]s on a `tokio::sync::broadcast`
//! bus. Any number of subscribers may listen; publishing never blocks and
//! succeeds even with nobody listening.

use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tracing::trace;

use crate::constants::orchestrator;

pub use tokio::sync::broadcast::error::RecvError;
pub use tokio::sync::broadcast::Receiver;

/// Something observable happened to the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// More bytes of a resource are now cached
    Updated {
        resource_id: String,
        cached_bytes: u64,
        content_length: Option<u64>,
    },
    /// A download session ended; `error` is `None` on success
    Finished {
        resource_id: String,
        error: Option<String>,
    },
    /// A sweep removed these entries
    Cleaned { resource_ids: Vec<String> },
}

impl CacheEvent {
    /// Resource the event is about, if it concerns a single one
    pub fn resource_id(&self) -> Option<&str> {
        match self {
            CacheEvent::Updated { resource_id, .. } | CacheEvent::Finished { resource_id, .. } => {
                Some(resource_id)
            }
            CacheEvent::Cleaned { .. } => None,
        }
    }
}

/// Broadcast bus for [`CacheEvent`]s
#[derive(Debug, Clone)]
pub struct CacheEventBus {
    sender: broadcast::Sender<CacheEvent>,
}

impl CacheEventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event, returning the number of subscribers reached
    pub fn emit(&self, event: CacheEvent) -> usize {
        trace!("Cache event: {:?}", event);
        // Err only means nobody is subscribed
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> Receiver<CacheEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for CacheEventBus {
    fn default() -> Self {
        Self::new(orchestrator::EVENT_BUFFER_SIZE)
    }
}

/// Rate limiter for `Updated` notifications of one session
#[derive(Debug)]
pub struct UpdateThrottle {
    interval: Duration,
    last: Option<Instant>,
}

impl UpdateThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Whether a notification may be sent now; records it if so
    pub fn ready(&mut self) -> bool {
        self.ready_at(Instant::now())
    }

    fn ready_at(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}
