//! Eviction Engine: full wipe and age/size sweeps
//!
//! A sweep first drops entries not accessed within the maximum age, then, if
//! the remaining usage still exceeds the size limit, removes the least
//! recently accessed entries until usage is at most half the limit.
//!
//! Failures to delete a single entry are logged and skipped. Only a failure to
//! list the cache root aborts a sweep, and it does so before deleting anything.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::constants::cache;
use crate::errors::{CacheError, CacheResult};

use super::index::{CacheDirectoryIndex, CacheEntry};

/// Limits applied by a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepPolicy {
    /// Entries not accessed within this duration are removed (None = no age limit)
    pub max_age: Option<Duration>,
    /// Usage limit in bytes (0 = unlimited)
    pub max_size: u64,
}

/// Outcome of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Identifiers of removed entries, in removal order
    pub removed: Vec<String>,
    pub bytes_freed: u64,
    pub size_before: u64,
    pub size_after: u64,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
    }
}

/// Disk space reclamation for a cache root
pub struct EvictionEngine;

impl EvictionEngine {
    /// Delete the whole cache root and recreate it empty
    pub async fn clear_all(cache_root: &Path) -> CacheResult<()> {
        match tokio::fs::remove_dir_all(cache_root).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!("Failed to clear cache root {}: {}", cache_root.display(), e);
                return Err(e.into());
            }
        }

        tokio::fs::create_dir_all(cache_root)
            .await
            .map_err(|_| CacheError::DirectoryNotAccessible {
                path: cache_root.to_path_buf(),
            })?;

        info!("Cleared cache root {}", cache_root.display());
        Ok(())
    }

    /// Run one sweep over `cache_root` as of `now`
    ///
    /// # Errors
    ///
    /// Returns `CacheError::EnumerationFailure` if the root cannot be listed
    pub async fn sweep(
        cache_root: &Path,
        policy: SweepPolicy,
        now: DateTime<Utc>,
    ) -> CacheResult<SweepReport> {
        let root = cache_root.to_path_buf();
        tokio::task::spawn_blocking(move || Self::sweep_blocking(&root, policy, now))
            .await
            .map_err(|e| CacheError::EnumerationFailure {
                path: cache_root.to_path_buf(),
                reason: format!("sweep task failed: {}", e),
            })?
    }

    /// Blocking implementation of [`Self::sweep`]
    pub fn sweep_blocking(
        cache_root: &Path,
        policy: SweepPolicy,
        now: DateTime<Utc>,
    ) -> CacheResult<SweepReport> {
        let entries = CacheDirectoryIndex::enumerate_blocking(cache_root)?;
        Ok(Self::sweep_entries(entries, policy, now))
    }

    /// Apply both passes to already enumerated entries
    fn sweep_entries(
        entries: Vec<CacheEntry>,
        policy: SweepPolicy,
        now: DateTime<Utc>,
    ) -> SweepReport {
        let size_before: u64 = entries.iter().map(|entry| entry.size_on_disk).sum();
        let mut report = SweepReport {
            size_before,
            ..Default::default()
        };

        // Age pass
        let cutoff = policy.max_age.and_then(|max_age| {
            chrono::Duration::from_std(max_age)
                .ok()
                .and_then(|age| now.checked_sub_signed(age))
        });

        let mut remaining = Vec::with_capacity(entries.len());
        for entry in entries {
            if cutoff.is_some_and(|cutoff| entry.last_access <= cutoff) && Self::remove(&entry) {
                report.removed.push(entry.identifier());
                report.bytes_freed += entry.size_on_disk;
            } else {
                remaining.push(entry);
            }
        }

        // Size pass
        let mut usage: u64 = remaining.iter().map(|entry| entry.size_on_disk).sum();
        if policy.max_size > 0 && usage > policy.max_size {
            let target = policy.max_size / cache::EVICTION_TARGET_DIVISOR;
            debug!(
                "Cache usage {} exceeds {} bytes, draining to {}",
                usage, policy.max_size, target
            );

            remaining.sort_by_key(|entry| entry.last_access);
            for entry in &remaining {
                if usage <= target {
                    break;
                }
                if Self::remove(entry) {
                    usage -= entry.size_on_disk;
                    report.removed.push(entry.identifier());
                    report.bytes_freed += entry.size_on_disk;
                }
            }
        }

        report.size_after = usage;
        if !report.is_empty() {
            info!(
                "Sweep removed {} entries, freed {} bytes ({} -> {})",
                report.removed.len(),
                report.bytes_freed,
                report.size_before,
                report.size_after
            );
        }
        report
    }

    /// Delete one entry, returning whether it is gone
    fn remove(entry: &CacheEntry) -> bool {
        let result = if entry.is_directory {
            std::fs::remove_dir_all(&entry.path)
        } else {
            std::fs::remove_file(&entry.path)
        };

        match result {
            Ok(()) => {
                debug!("Evicted {}", entry.path.display());
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => {
                warn!("Failed to evict {}: {}", entry.path.display(), e);
                false
            }
        }
    }
}
