//! Cache configuration types and defaults
//!
//! This module contains the configuration structures for the cache root,
//! including the size and age limits enforced by sweeps.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::cache;

/// Configuration for the cache management system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Root directory for cache storage (OS-specific if None)
    pub cache_root: Option<PathBuf>,
    /// Maximum cache size in bytes (0 = unlimited)
    pub max_cache_size: u64,
    /// Entries not accessed within this duration are removed by a sweep (None = never)
    pub max_cache_age: Option<Duration>,
    /// Interval of the background sweep (None = only on demand)
    pub sweep_interval: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_root: None, // Will use OS-specific cache directory
            max_cache_size: cache::DEFAULT_MAX_CACHE_SIZE,
            max_cache_age: Some(Duration::from_secs(
                cache::DEFAULT_MAX_CACHE_AGE_SECS.unsigned_abs(),
            )),
            sweep_interval: None,
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration with custom cache root
    pub fn with_cache_root(cache_root: PathBuf) -> Self {
        Self {
            cache_root: Some(cache_root),
            ..Default::default()
        }
    }

    /// Set maximum cache size in bytes
    pub fn with_max_cache_size(mut self, max_size: u64) -> Self {
        self.max_cache_size = max_size;
        self
    }

    /// Set maximum entry age, `None` disables age-based eviction
    pub fn with_max_cache_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_cache_age = max_age;
        self
    }

    /// Convert a signed age in seconds, where a negative value disables the age limit
    pub fn with_max_cache_age_secs(self, secs: i64) -> Self {
        let max_age = (secs >= 0).then(|| Duration::from_secs(secs.unsigned_abs()));
        self.with_max_cache_age(max_age)
    }

    /// Run a sweep in the background at this interval
    pub fn with_sweep_interval(mut self, interval: Option<Duration>) -> Self {
        self.sweep_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.cache_root, None);
        assert_eq!(config.max_cache_size, 0);
        assert_eq!(
            config.max_cache_age,
            Some(Duration::from_secs(60 * 60 * 24 * 7))
        );
        assert_eq!(config.sweep_interval, None);
    }

    #[test]
    fn test_config_builder() {
        let cache_root = PathBuf::from("/tmp/test");
        let config = CacheConfig::with_cache_root(cache_root.clone())
            .with_max_cache_size(1024 * 1024)
            .with_max_cache_age(Some(Duration::from_secs(60)))
            .with_sweep_interval(Some(Duration::from_secs(300)));

        assert_eq!(config.cache_root, Some(cache_root));
        assert_eq!(config.max_cache_size, 1024 * 1024);
        assert_eq!(config.max_cache_age, Some(Duration::from_secs(60)));
        assert_eq!(config.sweep_interval, Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_negative_age_disables_limit() {
        let config = CacheConfig::default().with_max_cache_age_secs(-1);
        assert_eq!(config.max_cache_age, None);

        let config = CacheConfig::default().with_max_cache_age_secs(0);
        assert_eq!(config.max_cache_age, Some(Duration::ZERO));
    }
}
