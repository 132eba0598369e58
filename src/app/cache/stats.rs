//! Cache statistics and disk usage reporting
//!
//! This module provides a snapshot of cache usage (entries, bytes, active
//! downloads) and the human-readable byte formatting used by the CLI.

use std::path::PathBuf;

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Cache root directory
    pub cache_root: PathBuf,
    /// Number of top-level cache entries
    pub entry_count: usize,
    /// Total size of cached entries in bytes
    pub total_cache_size: u64,
    /// Number of downloads currently in flight
    pub in_flight_downloads: usize,
    /// Configured size limit in bytes (0 = unlimited)
    pub max_cache_size: u64,
}

impl CacheStats {
    /// Create new cache statistics
    pub fn new(cache_root: PathBuf, max_cache_size: u64) -> Self {
        Self {
            cache_root,
            entry_count: 0,
            total_cache_size: 0,
            in_flight_downloads: 0,
            max_cache_size,
        }
    }

    /// Update disk usage statistics
    pub fn set_disk_stats(&mut self, entry_count: usize, total_cache_size: u64) {
        self.entry_count = entry_count;
        self.total_cache_size = total_cache_size;
    }

    pub fn set_in_flight(&mut self, in_flight_downloads: usize) {
        self.in_flight_downloads = in_flight_downloads;
    }

    /// Cache usage as a percentage of the size limit, `None` when unlimited
    pub fn usage_percentage(&self) -> Option<f64> {
        if self.max_cache_size == 0 {
            return None;
        }
        Some(self.total_cache_size as f64 / self.max_cache_size as f64 * 100.0)
    }

    /// Check if the next sweep would evict by size
    pub fn is_over_limit(&self) -> bool {
        self.max_cache_size > 0 && self.total_cache_size > self.max_cache_size
    }

    /// Format cache size in human-readable format
    pub fn format_cache_size(&self) -> String {
        format_bytes(self.total_cache_size)
    }

    /// Format the size limit in human-readable format
    pub fn format_max_cache_size(&self) -> String {
        if self.max_cache_size == 0 {
            "unlimited".to_string()
        } else {
            format_bytes(self.max_cache_size)
        }
    }
}

/// Format bytes in human-readable format
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: u64 = 1024;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD as f64 && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD as f64;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}
