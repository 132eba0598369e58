//! Cache Directory Index: enumeration of cache entries
//!
//! An entry is one top-level item of the cache root, normally a resource
//! directory. Sizes are recursive and the last access time of a directory is
//! the most recent access or modification of any file inside it. Entries are
//! enumerated fresh on every call; nothing is cached between passes.

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::errors::{CacheError, CacheResult};

/// One top-level item under the cache root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub path: PathBuf,
    /// Recursive size in bytes
    pub size_on_disk: u64,
    pub last_access: DateTime<Utc>,
    pub is_directory: bool,
}

impl CacheEntry {
    /// Identifier reported when the entry is removed (its file name)
    pub fn identifier(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Directory scanner for the cache root
pub struct CacheDirectoryIndex;

impl CacheDirectoryIndex {
    /// Enumerate all entries of `cache_root`
    ///
    /// Runs on a blocking thread. A missing root is an empty cache.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::EnumerationFailure` if the root cannot be listed
    pub async fn enumerate(cache_root: &Path) -> CacheResult<Vec<CacheEntry>> {
        let root = cache_root.to_path_buf();
        tokio::task::spawn_blocking(move || Self::enumerate_blocking(&root))
            .await
            .map_err(|e| CacheError::EnumerationFailure {
                path: cache_root.to_path_buf(),
                reason: format!("scan task failed: {}", e),
            })?
    }

    /// Total size of every entry under `cache_root`
    pub async fn total_size(cache_root: &Path) -> CacheResult<u64> {
        let entries = Self::enumerate(cache_root).await?;
        Ok(entries.iter().map(|entry| entry.size_on_disk).sum())
    }

    /// Blocking implementation of [`Self::enumerate`]
    pub fn enumerate_blocking(cache_root: &Path) -> CacheResult<Vec<CacheEntry>> {
        let read_dir = match std::fs::read_dir(cache_root) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Cache root {} does not exist", cache_root.display());
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(CacheError::EnumerationFailure {
                    path: cache_root.to_path_buf(),
                    reason: e.to_string(),
                })
            }
        };

        let mut entries = Vec::new();
        for item in read_dir {
            let item = item.map_err(|e| CacheError::EnumerationFailure {
                path: cache_root.to_path_buf(),
                reason: e.to_string(),
            })?;

            if item.file_name().to_string_lossy().starts_with('.') {
                continue;
            }

            let path = item.path();
            let metadata = match std::fs::symlink_metadata(&path) {
                Ok(metadata) => metadata,
                Err(e) => {
                    // Removed between listing and stat
                    warn!("Skipping cache entry {}: {}", path.display(), e);
                    continue;
                }
            };

            let entry = if metadata.is_dir() {
                let (size_on_disk, newest) = Self::scan_directory(&path);
                CacheEntry {
                    path,
                    size_on_disk,
                    last_access: newest.unwrap_or_else(|| last_touched(&metadata)),
                    is_directory: true,
                }
            } else {
                CacheEntry {
                    path,
                    size_on_disk: metadata.len(),
                    last_access: last_touched(&metadata),
                    is_directory: false,
                }
            };
            entries.push(entry);
        }

        Ok(entries)
    }

    /// Recursive size and newest file access time of a directory
    fn scan_directory(dir: &Path) -> (u64, Option<DateTime<Utc>>) {
        let mut total_size = 0u64;
        let mut newest: Option<DateTime<Utc>> = None;

        if let Ok(items) = std::fs::read_dir(dir) {
            for item in items.flatten() {
                let Ok(metadata) = item.metadata() else {
                    continue;
                };

                if metadata.is_dir() {
                    let (size, sub_newest) = Self::scan_directory(&item.path());
                    total_size += size;
                    newest = newest.max(sub_newest);
                } else {
                    total_size += metadata.len();
                    newest = newest.max(Some(last_touched(&metadata)));
                }
            }
        }

        (total_size, newest)
    }
}

/// Latest of the access and modification times
fn last_touched(metadata: &Metadata) -> DateTime<Utc> {
    let accessed = metadata.accessed().ok();
    let modified = metadata.modified().ok();
    accessed
        .max(modified)
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|| DateTime::<Utc>::from(SystemTime::UNIX_EPOCH))
}
