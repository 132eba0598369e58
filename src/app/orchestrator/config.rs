//! Download orchestrator configuration
//!
//! This module provides the tunables of a download session together with
//! validation and a builder following the pattern used across the crate.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::orchestrator;
use crate::errors::{DownloadError, DownloadResult};

/// Configuration for download sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Minimum interval between two cache-updated notifications of a session
    pub notify_interval: Duration,
    /// Chunks buffered between a session and its consumer
    pub chunk_channel_capacity: usize,
    /// Size of one chunk read back from the data file
    pub read_chunk_size: usize,
    /// Leading bytes fetched by a prefetch before the tail
    pub header_probe_length: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            notify_interval: orchestrator::NOTIFY_INTERVAL,
            chunk_channel_capacity: orchestrator::CHUNK_CHANNEL_CAPACITY,
            read_chunk_size: orchestrator::READ_CHUNK_SIZE,
            header_probe_length: orchestrator::HEADER_PROBE_LENGTH,
        }
    }
}

impl OrchestratorConfig {
    /// Validate configuration values and return errors for invalid settings
    pub fn validate(&self) -> DownloadResult<()> {
        if self.chunk_channel_capacity == 0 {
            return Err(DownloadError::ConfigurationError(
                "Chunk channel capacity cannot be zero".to_string(),
            ));
        }

        if self.read_chunk_size == 0 {
            return Err(DownloadError::ConfigurationError(
                "Read chunk size cannot be zero".to_string(),
            ));
        }

        if self.header_probe_length == 0 {
            return Err(DownloadError::ConfigurationError(
                "Header probe length must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for OrchestratorConfig
#[derive(Debug, Default)]
pub struct OrchestratorConfigBuilder {
    config: OrchestratorConfig,
}

impl OrchestratorConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum interval between update notifications
    pub fn notify_interval(mut self, interval: Duration) -> Self {
        self.config.notify_interval = interval;
        self
    }

    /// Set the number of buffered chunks
    pub fn chunk_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.chunk_channel_capacity = capacity;
        self
    }

    /// Set the local read chunk size
    pub fn read_chunk_size(mut self, size: usize) -> Self {
        self.config.read_chunk_size = size;
        self
    }

    /// Set the prefetch probe length
    pub fn header_probe_length(mut self, length: u64) -> Self {
        self.config.header_probe_length = length;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> DownloadResult<OrchestratorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.notify_interval, Duration::from_millis(100));
        assert_eq!(config.header_probe_length, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = OrchestratorConfigBuilder::new()
            .notify_interval(Duration::from_millis(10))
            .chunk_channel_capacity(4)
            .read_chunk_size(16)
            .header_probe_length(8)
            .build()
            .unwrap();

        assert_eq!(config.notify_interval, Duration::from_millis(10));
        assert_eq!(config.chunk_channel_capacity, 4);
        assert_eq!(config.read_chunk_size, 16);
        assert_eq!(config.header_probe_length, 8);
    }

    #[test]
    fn test_validation_rejects_zero_values() {
        assert!(OrchestratorConfigBuilder::new()
            .chunk_channel_capacity(0)
            .build()
            .is_err());
        assert!(OrchestratorConfigBuilder::new()
            .read_chunk_size(0)
            .build()
            .is_err());
        assert!(OrchestratorConfigBuilder::new()
            .header_probe_length(0)
            .build()
            .is_err());
    }
}
