//! Error types for the media range cache
//!
//! This module defines the error types for every component of the cache.
//! Errors are grouped by concern (downloads, cache storage, configuration) and
//! unified under [`AppError`] for the CLI and library callers that do not care
//! which layer failed.

use std::path::PathBuf;
use thiserror::Error;

/// Download orchestration and HTTP transport errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// HTTP request error raised by the underlying client
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// I/O error while reading or writing cached bytes
    #[error("File I/O error")]
    Io(#[from] std::io::Error),

    /// Cache storage error raised while persisting fetched bytes
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Invalid URL provided
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Server returned an unusable status
    #[error("Server error: HTTP {status}")]
    ServerError { status: u16 },

    /// Transport failed for a reason other than a status code
    #[error("Transport error: {reason}")]
    Transport { reason: String },

    /// A download for the same resource is already in flight
    #[error("Resource already downloading: {resource_id}")]
    ResourceBusy { resource_id: String },

    /// Download aborted by a caller or a superseding request
    #[error("Download cancelled: {resource_id}")]
    Cancelled { resource_id: String },

    /// Resource metadata could not be written
    #[error("Failed to persist media descriptor at {path}: {reason}")]
    DescriptorPersistFailure { path: PathBuf, reason: String },

    /// Origin closed the body before the requested range was complete
    #[error("Incomplete download: received {received} bytes, expected {expected} bytes")]
    IncompleteDownload { received: u64, expected: u64 },

    /// Invalid runtime configuration
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl DownloadError {
    /// Whether this error came from the origin or the network
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            DownloadError::Http(_)
                | DownloadError::ServerError { .. }
                | DownloadError::Transport { .. }
                | DownloadError::IncompleteDownload { .. }
        )
    }

    /// Whether this error is a cancellation rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DownloadError::Cancelled { .. })
    }
}

/// Cache storage, index and eviction errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Cache directory not found or inaccessible
    #[error("Cache directory not accessible: {path}")]
    DirectoryNotAccessible { path: PathBuf },

    /// Listing the cache directory failed during a sweep or size scan
    #[error("Failed to enumerate cache directory {path}: {reason}")]
    EnumerationFailure { path: PathBuf, reason: String },

    /// A sidecar file could not be written
    #[error("Failed to persist {path}: {reason}")]
    PersistFailed { path: PathBuf, reason: String },

    /// Invalid cache state
    #[error("Invalid cache state: {reason}")]
    InvalidState { reason: String },

    /// Generic I/O error
    #[error("Cache I/O error")]
    Io(#[from] std::io::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Configuration validation failed
    #[error("Configuration validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<String> },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Download error
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Cache error
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if re-issuing the same request may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Download(DownloadError::ResourceBusy { .. })
            | AppError::Download(DownloadError::Http(_))
            | AppError::Download(DownloadError::Transport { .. })
            | AppError::Download(DownloadError::IncompleteDownload { .. }) => true,

            AppError::Download(DownloadError::ServerError { status }) => *status >= 500,

            AppError::Download(DownloadError::DescriptorPersistFailure { .. })
            | AppError::Download(DownloadError::InvalidUrl { .. })
            | AppError::Cache(CacheError::EnumerationFailure { .. })
            | AppError::Config(_) => false,

            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Download(_) => "download",
            AppError::Cache(_) => "cache",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Download result type alias
pub type DownloadResult<T> = std::result::Result<T, DownloadError>;

/// Cache result type alias
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let busy = AppError::Download(DownloadError::ResourceBusy {
            resource_id: "https://example.com/a.mp4".to_string(),
        });
        assert_eq!(busy.category(), "download");
        assert!(busy.is_recoverable());

        let enumeration = AppError::Cache(CacheError::EnumerationFailure {
            path: PathBuf::from("/cache"),
            reason: "permission denied".to_string(),
        });
        assert_eq!(enumeration.category(), "cache");
        assert!(!enumeration.is_recoverable());
    }

    #[test]
    fn test_server_error_recoverability() {
        let unavailable = AppError::Download(DownloadError::ServerError { status: 503 });
        let not_found = AppError::Download(DownloadError::ServerError { status: 404 });
        assert!(unavailable.is_recoverable());
        assert!(!not_found.is_recoverable());
    }

    #[test]
    fn test_download_error_classification() {
        assert!(DownloadError::Transport {
            reason: "reset".to_string()
        }
        .is_transport());
        assert!(DownloadError::Cancelled {
            resource_id: "x".to_string()
        }
        .is_cancelled());
        assert!(!DownloadError::ResourceBusy {
            resource_id: "x".to_string()
        }
        .is_transport());
    }

    #[test]
    fn test_cache_error_converts_into_download_error() {
        let cache_error = CacheError::InvalidState {
            reason: "missing directory".to_string(),
        };
        let download_error: DownloadError = cache_error.into();
        assert!(matches!(download_error, DownloadError::Cache(_)));
        assert_eq!(
            download_error.to_string(),
            "Invalid cache state: missing directory"
        );
    }
}
