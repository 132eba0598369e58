//! Prelude module for the Media Range Cache library
//!
//! This module re-exports the most commonly used items from the library,
//! providing a convenient way to import everything needed for typical usage
//! with a single `use media_range_cache::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use media_range_cache::prelude::*;
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let cache = MediaCache::new(
//!         CacheConfig::default(),
//!         &ClientConfig::default(),
//!         OrchestratorConfig::default(),
//!     )
//!     .await?;
//!
//!     let mut stream = cache.plan_and_execute("https://example.com/movie.mp4", RangeRequest::new(0, 1024))?;
//!     while let Some(chunk) = stream.next().await {
//!         let chunk = chunk?;
//!         println!("{} bytes at {}", chunk.data.len(), chunk.offset);
//!     }
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, CacheError, DownloadError, Result};

// Essential app components that are used in most integrations
pub use crate::app::{
    ActionKind, ActionPlanner, ByteRange, CacheAction, CacheConfig, CacheEvent, CacheManager,
    CacheMediaDescriptor, CacheStats, ClientConfig, DownloadOrchestrator, DownloadStream,
    FetchChunk, HttpHandler, HttpTransport, InFlightRegistry, MediaCache, OrchestratorConfig,
    RangeRequest, RangeSet, SweepReport,
};

// Configuration file support
pub use crate::config::AppConfig;

// Commonly used constants
pub use crate::constants::{NOTIFY_INTERVAL, USER_AGENT};

// Standard library re-exports that are commonly needed
pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;

// Common external crate re-exports for convenience
pub use tokio;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_imports() {
        let _config = CacheConfig::default();
        let _client_config = ClientConfig::default();
        let _orchestrator_config = OrchestratorConfig::default();
        let _app_config = AppConfig::default();

        assert_eq!(NOTIFY_INTERVAL, std::time::Duration::from_millis(100));
        assert!(USER_AGENT.contains("media-range-cache"));
    }

    #[tokio::test]
    async fn test_prelude_integration_pattern() {
        use tempfile::TempDir;

        let temp_dir = TempDir::new().unwrap();
        let cache_config = CacheConfig {
            cache_root: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };

        let cache = MediaCache::new(
            cache_config,
            &ClientConfig::default(),
            OrchestratorConfig::default(),
        )
        .await
        .unwrap();

        let (window, actions) = cache
            .plan("https://example.com/movie.mp4", RangeRequest::new(0, 10))
            .await
            .unwrap();
        assert_eq!(window, ByteRange::new(0, 10));
        assert_eq!(actions, vec![CacheAction::remote(window)]);
        assert_eq!(cache.calculate_total_cache_size().await.unwrap(), 0);
    }

    #[test]
    fn test_std_reexports() {
        let _path = PathBuf::from("/tmp/test");

        let data = Arc::new(42);
        assert_eq!(*data, 42);
    }
}
