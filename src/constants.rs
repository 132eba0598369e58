//! Application constants for the media range cache
//!
//! This module centralizes all constants used throughout the crate,
//! organized by functional domain.

use std::time::Duration;

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = concat!("media-range-cache/", env!("CARGO_PKG_VERSION"));

    /// Default HTTP request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum connections per host in pool
    pub const POOL_MAX_PER_HOST: usize = 8;

    /// Maximum number of redirects to follow
    pub const MAX_REDIRECTS: usize = 10;
}

/// Rate limiting configuration
pub mod limits {
    /// Default rate limit for origin requests (requests per second)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 20;
}

/// On-disk layout of the cache root
pub mod files {
    /// Directory name used under the OS cache directory
    pub const CACHE_DIR_NAME: &str = "media-range-cache";

    /// Raw cached bytes of one resource
    pub const DATA_FILE_NAME: &str = "data.bin";

    /// Sidecar with content length, type and range support
    pub const DESCRIPTOR_FILE_NAME: &str = "descriptor.json";

    /// Sidecar with the persisted range set
    pub const RANGE_INDEX_FILE_NAME: &str = "ranges.json";

    /// Temporary file suffix for atomic operations
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";
}

/// Cache sizing and eviction defaults
pub mod cache {
    /// Default maximum entry age before a sweep removes it (one week)
    pub const DEFAULT_MAX_CACHE_AGE_SECS: i64 = 60 * 60 * 24 * 7;

    /// Default maximum cache size in bytes (0 = unlimited)
    pub const DEFAULT_MAX_CACHE_SIZE: u64 = 0;

    /// Size-based eviction drains usage below `max_cache_size / EVICTION_TARGET_DIVISOR`
    pub const EVICTION_TARGET_DIVISOR: u64 = 2;
}

/// Download orchestration defaults
pub mod orchestrator {
    use super::Duration;

    /// Minimum interval between two cache-updated notifications of one session
    pub const NOTIFY_INTERVAL: Duration = Duration::from_millis(100);

    /// Buffered chunks between a session and its consumer
    pub const CHUNK_CHANNEL_CAPACITY: usize = 32;

    /// Size of one chunk read back from the data file (64KB)
    pub const READ_CHUNK_SIZE: usize = 64 * 1024;

    /// Leading bytes fetched to discover length and type before a full read
    pub const HEADER_PROBE_LENGTH: u64 = 2;

    /// Capacity of the cache event bus per subscriber
    pub const EVENT_BUFFER_SIZE: usize = 256;
}

/// Logging constants
pub mod logging {
    /// Default log level
    pub const DEFAULT_LOG_LEVEL: &str = "info";
}

pub use files::TEMP_FILE_SUFFIX;
pub use http::{DEFAULT_TIMEOUT as HTTP_TIMEOUT, USER_AGENT};
pub use orchestrator::NOTIFY_INTERVAL;
