//! Per-resource cache state used by a download session
//!
//! A [`CachedResource`] bundles the data file, the descriptor and the Range
//! Store of one resource. Every mutation goes through the cache-wide I/O lock;
//! reads of already cached bytes do not.

use std::io::SeekFrom;
use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::app::action::{ActionPlanner, CacheAction};
use crate::app::range::{ByteRange, RangeRequest, RangeSet};
use crate::errors::{CacheError, CacheResult};

use super::descriptor::CacheMediaDescriptor;
use super::path::{PathGenerator, ResourcePaths};
use super::store::RangeStore;

/// Open cache state of one resource
#[derive(Debug)]
pub struct CachedResource {
    resource_id: String,
    key: String,
    paths: ResourcePaths,
    descriptor: Option<CacheMediaDescriptor>,
    store: RangeStore,
    io_lock: Arc<Mutex<()>>,
    writer: Option<File>,
    reader: Option<File>,
}

impl CachedResource {
    /// Load the persisted state of `resource_id` without creating anything
    pub async fn open(
        cache_root: &std::path::Path,
        resource_id: &str,
        io_lock: Arc<Mutex<()>>,
    ) -> CacheResult<Self> {
        let paths = ResourcePaths::new(cache_root, resource_id);

        let data_len = match fs::metadata(&paths.data).await {
            Ok(metadata) => metadata.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };
        let descriptor = CacheMediaDescriptor::load(&paths.descriptor).await?;
        let store = RangeStore::open(paths.range_index.clone(), data_len).await?;

        debug!(
            "Opened {} ({} bytes cached, descriptor: {})",
            resource_id,
            store.cached_bytes(),
            descriptor.is_some()
        );

        Ok(Self {
            resource_id: resource_id.to_string(),
            key: PathGenerator::resource_key(resource_id),
            paths,
            descriptor,
            store,
            io_lock,
            writer: None,
            reader: None,
        })
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    /// Directory name of the resource under the cache root
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn paths(&self) -> &ResourcePaths {
        &self.paths
    }

    pub fn descriptor(&self) -> Option<&CacheMediaDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn content_length(&self) -> Option<u64> {
        self.descriptor.as_ref().and_then(|d| d.content_length)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.descriptor
            .as_ref()
            .and_then(|d| d.content_type.as_deref())
    }

    pub fn cached_ranges(&self) -> &RangeSet {
        self.store.cached_ranges()
    }

    pub fn cached_bytes(&self) -> u64 {
        self.store.cached_bytes()
    }

    /// Resolve `request` and plan the actions serving it
    ///
    /// Returns the resolved window together with the plan.
    pub fn plan(&self, request: RangeRequest) -> (ByteRange, Vec<CacheAction>) {
        let window = request.resolve(self.content_length());
        let actions = ActionPlanner::plan(window, self.store.cached_ranges(), self.descriptor());
        (window, actions)
    }

    /// Persist `descriptor` unless one already exists
    ///
    /// Returns the descriptor in effect afterwards.
    pub async fn set_descriptor_once(
        &mut self,
        descriptor: CacheMediaDescriptor,
    ) -> CacheResult<&CacheMediaDescriptor> {
        if self.descriptor.is_none() {
            let _io = self.io_lock.lock().await;
            fs::create_dir_all(&self.paths.dir).await?;
            descriptor.persist(&self.paths.descriptor).await?;
            debug!(
                "Stored descriptor for {}: length {:?}, type {:?}, ranges {}",
                self.resource_id,
                descriptor.content_length,
                descriptor.content_type,
                descriptor.byte_range_supported
            );
            self.descriptor = Some(descriptor);
        }

        self.descriptor.as_ref().ok_or_else(|| CacheError::InvalidState {
            reason: "descriptor missing after store".to_string(),
        })
    }

    /// Write `data` at `offset` of the data file
    pub async fn write_at(&mut self, offset: u64, data: &[u8]) -> CacheResult<()> {
        let _io = self.io_lock.lock().await;

        if self.writer.is_none() {
            fs::create_dir_all(&self.paths.dir).await?;
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(false)
                .open(&self.paths.data)
                .await?;
            self.writer = Some(file);
        }

        if let Some(writer) = self.writer.as_mut() {
            writer.seek(SeekFrom::Start(offset)).await?;
            writer.write_all(data).await?;
        }
        Ok(())
    }

    /// Sync written bytes to disk, then record `range` as cached
    pub async fn mark_cached(&mut self, range: ByteRange) -> CacheResult<bool> {
        let _io = self.io_lock.lock().await;

        if let Some(writer) = self.writer.as_mut() {
            writer.flush().await?;
            writer.sync_data().await?;
        }
        self.store.mark_cached(range).await
    }

    /// Read `len` cached bytes starting at `offset`
    pub async fn read_at(&mut self, offset: u64, len: usize) -> CacheResult<Bytes> {
        if self.reader.is_none() {
            self.reader = Some(File::open(&self.paths.data).await?);
        }

        let mut buffer = vec![0u8; len];
        if let Some(reader) = self.reader.as_mut() {
            reader.seek(SeekFrom::Start(offset)).await?;
            reader.read_exact(&mut buffer).await?;
        }
        Ok(Bytes::from(buffer))
    }

    /// Refresh the access time of the data file
    ///
    /// A resource with no data file yet has nothing to touch.
    pub async fn touch(&self) -> CacheResult<()> {
        let _io = self.io_lock.lock().await;

        let data_path = self.paths.data.clone();
        let result = tokio::task::spawn_blocking(move || {
            let now = SystemTime::now();
            let file = std::fs::File::options().write(true).open(&data_path)?;
            file.set_times(
                std::fs::FileTimes::new()
                    .set_accessed(now)
                    .set_modified(now),
            )
        })
        .await
        .map_err(|e| CacheError::InvalidState {
            reason: format!("touch task failed: {}", e),
        })?;

        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!("Failed to refresh access time of {}: {}", self.resource_id, e);
                Err(e.into())
            }
        }
    }
}
