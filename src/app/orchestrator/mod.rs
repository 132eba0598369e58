//! Download orchestration for byte-range requests
//!
//! This module turns a range request into a download session. A session is
//! admitted through the in-flight registry, plans its actions against the
//! range store, and executes them in order on a background task, delivering
//! the requested bytes through a [`DownloadStream`].
//!
//! # Key Features
//!
//! - **Single session per resource**: A second request for a busy resource fails with `ResourceBusy`
//! - **Ordered delivery**: Local and remote actions are served strictly in plan order
//! - **Commit after completion**: A remote range is marked cached only once fully written and synced
//! - **Write-once descriptors**: The first origin response fixes length, type and range support
//! - **Cancellation**: By the stream holder, by dropping the stream, or by resource id
//! - **Throttled notifications**: Cache-updated events at most once per interval
//!
//! # Module Organization
//!
//! - [`config`] - Session tunables with validation and a builder
//! - [`types`] - Delivered chunks and the session stream
//! - [`core`] - The orchestrator and session execution
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use futures::StreamExt;
//! use media_range_cache::app::cache::{CacheConfig, CacheManager};
//! use media_range_cache::app::client::{ClientConfig, HttpHandler};
//! use media_range_cache::app::orchestrator::{DownloadOrchestrator, OrchestratorConfig};
//! use media_range_cache::app::range::RangeRequest;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = Arc::new(CacheManager::new(CacheConfig::default()).await?);
//! let transport = Arc::new(HttpHandler::from_config(&ClientConfig::default())?);
//! let orchestrator = DownloadOrchestrator::new(OrchestratorConfig::default(), cache, transport)?;
//!
//! let url = url::Url::parse("https://example.com/movie.mp4")?;
//! let mut stream = orchestrator.execute(&url, RangeRequest::new(0, 4096))?;
//! while let Some(chunk) = stream.next().await {
//!     let chunk = chunk?;
//!     println!("{} bytes at {}", chunk.data.len(), chunk.offset);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod types;

#[cfg(test)]
mod tests;

pub use config::{OrchestratorConfig, OrchestratorConfigBuilder};
pub use core::DownloadOrchestrator;
pub use types::{DownloadStream, FetchChunk};
