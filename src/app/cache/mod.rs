//! Byte-range disk cache: storage, index and eviction
//!
//! This module stores partially downloaded resources on disk, keyed by URL,
//! and tracks exactly which byte ranges of each resource are present.
//!
//! # Key Features
//!
//! - **OS-specific cache directories**: Uses standard system cache locations
//! - **Range Store**: Merged set of cached ranges per resource, persisted atomically
//! - **Write-once descriptors**: Content length, MIME type and range support from the first response
//! - **In-flight registry**: At most one download session per resource
//! - **Eviction**: Full wipe and age/size sweeps over the cache root
//!
//! # Module Organization
//!
//! - [`config`] - Configuration types and defaults
//! - [`path`] - Resource keys and on-disk layout
//! - [`atomic`] - Temp file + rename writes for sidecar files
//! - [`descriptor`] - Per-resource media descriptor
//! - [`store`] - Persistent set of cached ranges
//! - [`resource`] - Per-resource state used by a download session
//! - [`registry`] - In-flight registry preventing duplicate downloads
//! - [`index`] - Enumeration of cache entries
//! - [`eviction`] - Full wipe and sweeps
//! - [`stats`] - Cache statistics
//! - [`manager`] - Cache manager tying the pieces together
//!
//! # Examples
//!
//! ```rust,no_run
//! use media_range_cache::app::cache::{CacheConfig, CacheManager};
//! use media_range_cache::app::range::RangeRequest;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = CacheManager::new(CacheConfig::default()).await?;
//!
//! let resource = cache.open_resource("https://example.com/movie.mp4").await?;
//! let (window, actions) = resource.plan(RangeRequest::new(0, 1024));
//! for action in actions {
//!     println!("{} of {}", action, window);
//! }
//!
//! let report = cache.sweep().await?;
//! println!("Evicted {} entries", report.removed.len());
//! # Ok(())
//! # }
//! ```

pub mod atomic;
pub mod config;
pub mod descriptor;
pub mod eviction;
pub mod index;
pub mod manager;
pub mod path;
pub mod registry;
pub mod resource;
pub mod stats;
pub mod store;

#[cfg(test)]
pub mod tests;

// Re-export main public API
pub use config::CacheConfig;
pub use descriptor::CacheMediaDescriptor;
pub use eviction::{EvictionEngine, SweepPolicy, SweepReport};
pub use index::{CacheDirectoryIndex, CacheEntry};
pub use manager::CacheManager;
pub use path::{PathGenerator, ResourcePaths};
pub use registry::{InFlightGuard, InFlightInfo, InFlightRegistry};
pub use resource::CachedResource;
pub use stats::{format_bytes, CacheStats};
pub use store::RangeStore;
