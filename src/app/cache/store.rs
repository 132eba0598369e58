//! Range Store: which bytes of a resource are on disk
//!
//! The store keeps the merged [`RangeSet`] of one resource in memory and
//! mirrors it to a JSON index next to the data file. The index only ever
//! claims bytes that were synced to the data file first.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use crate::app::range::{ByteRange, RangeSet};
use crate::errors::CacheResult;

use super::atomic::write_json_atomic;

/// Persistent set of cached byte ranges for one resource
#[derive(Debug)]
pub struct RangeStore {
    index_path: PathBuf,
    ranges: RangeSet,
}

impl RangeStore {
    /// Open the store backed by `index_path`
    ///
    /// `data_len` is the current length of the data file. Stored ranges beyond
    /// it are dropped, since those bytes no longer exist. An unreadable index
    /// is logged and treated as empty.
    pub async fn open(index_path: PathBuf, data_len: u64) -> CacheResult<Self> {
        let mut ranges = match fs::read(&index_path).await {
            Ok(content) => serde_json::from_slice::<RangeSet>(&content).unwrap_or_else(|e| {
                warn!(
                    "Range index {} is corrupt, starting empty: {}",
                    index_path.display(),
                    e
                );
                RangeSet::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RangeSet::new(),
            Err(e) => return Err(e.into()),
        };

        let before = ranges.covered_bytes();
        ranges.truncate(data_len);
        if ranges.covered_bytes() != before {
            warn!(
                "Range index {} claimed {} bytes but data file holds {}, clamped",
                index_path.display(),
                before,
                data_len
            );
        }

        Ok(Self { index_path, ranges })
    }

    /// Currently cached ranges
    pub fn cached_ranges(&self) -> &RangeSet {
        &self.ranges
    }

    /// Record `range` as cached and persist the index
    ///
    /// Returns `false` without touching the index when the range was
    /// already covered. The in-memory set only changes once the new index is
    /// durable.
    pub async fn mark_cached(&mut self, range: ByteRange) -> CacheResult<bool> {
        if self.ranges.covers(&range) {
            return Ok(false);
        }

        let mut updated = self.ranges.clone();
        updated.insert(range);
        write_json_atomic(&self.index_path, &updated).await?;
        self.ranges = updated;

        debug!(
            "Marked {} cached in {} ({} ranges)",
            range,
            self.index_path.display(),
            self.ranges.len()
        );
        Ok(true)
    }

    pub fn is_fully_cached(&self, range: &ByteRange) -> bool {
        self.ranges.covers(range)
    }

    /// Total number of cached bytes
    pub fn cached_bytes(&self) -> u64 {
        self.ranges.covered_bytes()
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }
}
