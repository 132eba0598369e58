//! Core cache manager
//!
//! This module contains the [`CacheManager`], which owns the cache root and
//! everything shared by the sessions working on it: the I/O lock serializing
//! filesystem mutations, the in-flight registry and the event bus.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::app::events::{CacheEvent, CacheEventBus, Receiver};
use crate::constants::files;
use crate::errors::{CacheError, CacheResult};

use super::config::CacheConfig;
use super::descriptor::CacheMediaDescriptor;
use super::eviction::{EvictionEngine, SweepPolicy, SweepReport};
use super::index::CacheDirectoryIndex;
use super::path::ResourcePaths;
use super::registry::InFlightRegistry;
use super::resource::CachedResource;
use super::stats::CacheStats;

/// Main cache management system
#[derive(Debug)]
pub struct CacheManager {
    /// Configuration
    config: CacheConfig,
    /// Cache root directory
    cache_root: PathBuf,
    /// Serializes every filesystem mutation under the root
    io_lock: Arc<Mutex<()>>,
    /// Resources currently being downloaded
    registry: Arc<InFlightRegistry>,
    /// Notification bus
    events: CacheEventBus,
}

impl CacheManager {
    /// Create a new cache manager with its own in-flight registry
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if cache directory cannot be created or accessed
    pub async fn new(config: CacheConfig) -> CacheResult<Self> {
        Self::with_registry(config, Arc::new(InFlightRegistry::new())).await
    }

    /// Create a new cache manager sharing an existing in-flight registry
    pub async fn with_registry(
        config: CacheConfig,
        registry: Arc<InFlightRegistry>,
    ) -> CacheResult<Self> {
        let cache_root = match &config.cache_root {
            Some(path) => path.clone(),
            None => Self::get_default_cache_dir()?,
        };

        // Ensure cache directory exists
        Self::ensure_directory_exists(&cache_root).await?;

        info!(
            "Initialized cache manager with root: {}",
            cache_root.display()
        );

        Ok(Self {
            config,
            cache_root,
            io_lock: Arc::new(Mutex::new(())),
            registry,
            events: CacheEventBus::default(),
        })
    }

    /// Get the cache root directory
    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Get the cache configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<InFlightRegistry> {
        &self.registry
    }

    pub fn events(&self) -> &CacheEventBus {
        &self.events
    }

    /// Subscribe to cache notifications
    pub fn subscribe(&self) -> Receiver<CacheEvent> {
        self.events.subscribe()
    }

    /// Get the default cache directory for the current OS
    ///
    /// - macOS: ~/Library/Caches/media-range-cache
    /// - Linux: ~/.cache/media-range-cache
    /// - Windows: %LOCALAPPDATA%/media-range-cache
    fn get_default_cache_dir() -> CacheResult<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| CacheError::DirectoryNotAccessible {
                path: PathBuf::from("system cache directory"),
            })?
            .join(files::CACHE_DIR_NAME);

        Ok(cache_dir)
    }

    /// Ensure a directory exists, creating it if necessary
    async fn ensure_directory_exists(path: &Path) -> CacheResult<()> {
        if !path.exists() {
            fs::create_dir_all(path).await.map_err(|e| {
                error!("Failed to create cache directory: {}", e);
                CacheError::DirectoryNotAccessible {
                    path: path.to_path_buf(),
                }
            })?;
            debug!("Created cache directory: {}", path.display());
        }
        Ok(())
    }

    /// File locations of a resource
    pub fn resource_paths(&self, resource_id: &str) -> ResourcePaths {
        ResourcePaths::new(&self.cache_root, resource_id)
    }

    /// Load the cache state of a resource for a session or a plan
    pub async fn open_resource(&self, resource_id: &str) -> CacheResult<CachedResource> {
        CachedResource::open(&self.cache_root, resource_id, Arc::clone(&self.io_lock)).await
    }

    /// Persisted descriptor of a resource, if one was derived yet
    pub async fn descriptor(&self, resource_id: &str) -> CacheResult<Option<CacheMediaDescriptor>> {
        let paths = self.resource_paths(resource_id);
        CacheMediaDescriptor::load(&paths.descriptor).await
    }

    /// Total bytes used by all entries under the cache root
    pub async fn calculate_total_cache_size(&self) -> CacheResult<u64> {
        CacheDirectoryIndex::total_size(&self.cache_root).await
    }

    /// Delete everything under the cache root
    ///
    /// Sessions still running keep writing to the files they hold open; their
    /// bytes are gone once they finish.
    pub async fn clear_all(&self) -> CacheResult<()> {
        let _io = self.io_lock.lock().await;
        EvictionEngine::clear_all(&self.cache_root).await
    }

    /// Sweep policy derived from the configuration
    pub fn sweep_policy(&self) -> SweepPolicy {
        SweepPolicy {
            max_age: self.config.max_cache_age,
            max_size: self.config.max_cache_size,
        }
    }

    /// Run one eviction sweep now
    pub async fn sweep(&self) -> CacheResult<SweepReport> {
        self.sweep_at(Utc::now()).await
    }

    /// Run one eviction sweep as if the current time were `now`
    ///
    /// Publishes a single `Cleaned` event when anything was removed.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> CacheResult<SweepReport> {
        let report = {
            let _io = self.io_lock.lock().await;
            EvictionEngine::sweep(&self.cache_root, self.sweep_policy(), now).await?
        };

        if !report.is_empty() {
            self.events.emit(CacheEvent::Cleaned {
                resource_ids: report.removed.clone(),
            });
        }
        Ok(report)
    }

    /// Get cache statistics
    pub async fn get_cache_stats(&self) -> CacheResult<CacheStats> {
        let entries = CacheDirectoryIndex::enumerate(&self.cache_root).await?;
        let total_size = entries.iter().map(|entry| entry.size_on_disk).sum();

        let mut stats = CacheStats::new(self.cache_root.clone(), self.config.max_cache_size);
        stats.set_disk_stats(entries.len(), total_size);
        stats.set_in_flight(self.registry.len());
        Ok(stats)
    }

    /// Sweep in the background every `sweep_interval`
    ///
    /// Returns `None` when no interval is configured. The task stops on its
    /// own once the manager is dropped.
    pub fn spawn_periodic_sweep(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let interval = self.config.sweep_interval?;
        let manager: Weak<Self> = Arc::downgrade(self);

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(manager) = manager.upgrade() else {
                    debug!("Cache manager dropped, stopping periodic sweep");
                    break;
                };
                if let Err(e) = manager.sweep().await {
                    warn!("Periodic sweep failed: {}", e);
                }
            }
        }))
    }
}
