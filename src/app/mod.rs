//! Core application logic for the media range cache
//!
//! This module contains the byte-range model, the action planner, the disk
//! cache with its eviction engine, the HTTP transport, the download
//! orchestrator, and the [`MediaCache`] facade tying them together.
//!
//! # Examples
//!
//! ```rust,no_run
//! use media_range_cache::app::{CacheConfig, ClientConfig, MediaCache, OrchestratorConfig, RangeRequest};
//! use futures::StreamExt;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = MediaCache::new(
//!     CacheConfig::default(),
//!     &ClientConfig::default(),
//!     OrchestratorConfig::default(),
//! )
//! .await?;
//!
//! // Preview how a request would be served
//! let url = "https://example.com/podcast.mp3";
//! let (window, actions) = cache.plan(url, RangeRequest::new(0, 64 * 1024)).await?;
//! for action in &actions {
//!     println!("{} of {}", action, window);
//! }
//!
//! // Serve it, fetching only the missing ranges
//! let mut stream = cache.plan_and_execute(url, RangeRequest::new(0, 64 * 1024))?;
//! while let Some(chunk) = stream.next().await {
//!     let chunk = chunk?;
//!     println!("{} bytes at {} (cached: {})", chunk.data.len(), chunk.offset, chunk.from_local);
//! }
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod cache;
pub mod client;
pub mod events;
pub mod loader;
pub mod orchestrator;
pub mod range;

// Re-export main public API
pub use action::{ActionKind, ActionPlanner, CacheAction};
pub use cache::{
    CacheConfig, CacheManager, CacheMediaDescriptor, CacheStats, InFlightRegistry, SweepReport,
};
pub use client::{ClientConfig, HttpHandler, HttpTransport};
pub use events::{CacheEvent, CacheEventBus};
pub use loader::MediaCache;
pub use orchestrator::{DownloadOrchestrator, DownloadStream, FetchChunk, OrchestratorConfig};
pub use range::{ByteRange, RangeRequest, RangeSet};
