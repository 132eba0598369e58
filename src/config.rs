//! Configuration management for the media range cache
//!
//! This module provides unified configuration management with automatic
//! first-run initialization, file discovery, and zero-config defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::cache::CacheConfig;
use crate::app::client::ClientConfig;
use crate::app::orchestrator::OrchestratorConfig;
use crate::constants::{cache, files, limits, logging, orchestrator};
use crate::errors::{AppError, ConfigError, Result};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Cache root and eviction settings
    pub cache: CacheConfigToml,
    /// HTTP client settings
    pub client: ClientConfigToml,
    /// Download session settings
    pub orchestrator: OrchestratorConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfigToml {
    /// Cache directory path
    pub cache_root: Option<PathBuf>,
    /// Maximum cache size in bytes (0 = unlimited)
    pub max_cache_size: u64,
    /// Maximum entry age in seconds (negative = never expire)
    pub max_cache_age_secs: i64,
    /// Background sweep interval in seconds (None = sweep on demand only)
    pub sweep_interval_secs: Option<u64>,
}

impl Default for CacheConfigToml {
    fn default() -> Self {
        Self {
            cache_root: None,
            max_cache_size: cache::DEFAULT_MAX_CACHE_SIZE,
            max_cache_age_secs: cache::DEFAULT_MAX_CACHE_AGE_SECS,
            sweep_interval_secs: None,
        }
    }
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigToml {
    /// Enable HTTP/2 support
    pub http2: bool,
    /// TCP keep-alive timeout in seconds (None = disabled)
    pub tcp_keepalive_secs: Option<u64>,
    /// TCP nodelay setting
    pub tcp_nodelay: bool,
    /// Connection pool idle timeout in seconds (None = no timeout)
    pub pool_idle_timeout_secs: Option<u64>,
    /// Maximum connections per host
    pub pool_max_per_host: usize,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Rate limit (requests per second)
    pub rate_limit_rps: u32,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            http2: false,
            tcp_keepalive_secs: Some(30),
            tcp_nodelay: true,
            pool_idle_timeout_secs: Some(90),
            pool_max_per_host: 8,
            request_timeout_secs: 60,
            connect_timeout_secs: 30,
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
        }
    }
}

/// TOML-friendly orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfigToml {
    /// Minimum interval between cache-updated notifications in milliseconds
    pub notify_interval_ms: u64,
    /// Chunks buffered between a download and its consumer
    pub chunk_channel_capacity: usize,
    /// Size of one chunk read back from the cache in bytes
    pub read_chunk_size: usize,
    /// Leading bytes fetched by a prefetch before the rest
    pub header_probe_length: u64,
}

impl Default for OrchestratorConfigToml {
    fn default() -> Self {
        Self {
            notify_interval_ms: orchestrator::NOTIFY_INTERVAL.as_millis() as u64,
            chunk_channel_capacity: orchestrator::CHUNK_CHANNEL_CAPACITY,
            read_chunk_size: orchestrator::READ_CHUNK_SIZE,
            header_probe_length: orchestrator::HEADER_PROBE_LENGTH,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level for the application
    pub level: String,
    /// Enable colored output
    pub colored_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: logging::DEFAULT_LOG_LEVEL.to_string(),
            colored_output: true,
        }
    }
}

impl AppConfig {
    /// Convert TOML-friendly configuration to runtime configuration
    pub fn to_runtime_config(&self) -> (CacheConfig, ClientConfig, OrchestratorConfig) {
        (
            self.cache.to_runtime_config(),
            self.client.to_runtime_config(),
            self.orchestrator.to_runtime_config(),
        )
    }

    /// Load configuration with precedence:
    /// 1. Default values
    /// 2. Config file (explicit, or the first found in the standard locations)
    pub async fn load(config_file_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path }.into());
                }
                Some(path)
            }
            None => Self::find_config_file(),
        };

        let config = match config_path {
            Some(path) => {
                debug!("Loading config from: {}", path.display());
                Self::load_from_file(&path).await?
            }
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check values that would only fail later at runtime
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.client.rate_limit_rps == 0 {
            errors.push("client.rate_limit_rps must be greater than zero".to_string());
        }
        if self.orchestrator.chunk_channel_capacity == 0 {
            errors.push("orchestrator.chunk_channel_capacity must be greater than zero".to_string());
        }
        if self.orchestrator.read_chunk_size == 0 {
            errors.push("orchestrator.read_chunk_size must be greater than zero".to_string());
        }
        if self.orchestrator.header_probe_length == 0 {
            errors.push("orchestrator.header_probe_length must be greater than zero".to_string());
        }
        if self.cache.sweep_interval_secs == Some(0) {
            errors.push("cache.sweep_interval_secs must be greater than zero".to_string());
        }
        if !matches!(
            self.logging.level.as_str(),
            "error" | "warn" | "info" | "debug" | "trace"
        ) {
            return Err(ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                value: self.logging.level.clone(),
                reason: "Expected one of error, warn, info, debug, trace".to_string(),
            }
            .into());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationFailed { errors }.into())
        }
    }

    /// Initialize configuration on first run
    ///
    /// Creates a default config file if none exists and notifies the user
    pub async fn initialize_first_run() -> Result<Option<PathBuf>> {
        let config_path = Self::get_default_config_path()?;

        if config_path.exists() {
            return Ok(Some(config_path));
        }

        info!("Creating default configuration file...");

        if let Some(parent) = config_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::generic(format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let config_content = Self::generate_default_config_content();

        tokio::fs::write(&config_path, config_content)
            .await
            .map_err(|e| {
                AppError::generic(format!(
                    "Failed to write config file {}: {}",
                    config_path.display(),
                    e
                ))
            })?;

        println!("📁 Created default configuration file:");
        println!("   {}", config_path.display());
        println!("   You can customize settings by editing this file.");
        println!();

        Ok(Some(config_path))
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![
            PathBuf::from("./media-range-cache.toml"),
            PathBuf::from("./config.toml"),
        ];
        if let Ok(user_config) = Self::get_default_config_path() {
            search_paths.push(user_config);
        }
        #[cfg(unix)]
        search_paths.push(PathBuf::from("/etc/media-range-cache/config.toml"));

        let found = search_paths.into_iter().find(|path| path.exists());
        match &found {
            Some(path) => debug!("Found config file: {}", path.display()),
            None => debug!("No config file found in standard locations"),
        }
        found
    }

    /// Get the default config file path for the current user
    fn get_default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| AppError::generic("Could not determine user config directory"))?;

        Ok(config_dir.join(files::CACHE_DIR_NAME).join("config.toml"))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::generic(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: AppConfig = toml::from_str(&content).map_err(ConfigError::InvalidFormat)?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Generate default configuration content with helpful comments
    fn generate_default_config_content() -> String {
        let default_cache_path = dirs::cache_dir()
            .map(|dir| dir.join(files::CACHE_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("./cache"));

        format!(
            r#"# Media Range Cache Configuration
# This file was automatically generated on first run.
# You can customize any of these settings to suit your needs.

[cache]
# Cache directory (leave unset to use the system default: {})
# cache_root = "/path/to/custom/cache"

# Maximum cache size in bytes (0 = unlimited)
# A sweep over the limit evicts least recently used resources down to half of it
max_cache_size = {}

# Resources not accessed for this many seconds are evicted (negative = never)
max_cache_age_secs = {}

# Sweep in the background every N seconds (leave unset to sweep on demand only)
# sweep_interval_secs = 3600

[client]
# HTTP client settings
http2 = false
tcp_keepalive_secs = 30
tcp_nodelay = true
pool_idle_timeout_secs = 90
pool_max_per_host = 8
request_timeout_secs = 60
connect_timeout_secs = 30
rate_limit_rps = {}

[orchestrator]
# Download session settings
notify_interval_ms = {}
chunk_channel_capacity = {}
read_chunk_size = {}
header_probe_length = {}

[logging]
# Logging configuration
level = "info"  # error, warn, info, debug, trace
colored_output = true
"#,
            default_cache_path.display(),
            cache::DEFAULT_MAX_CACHE_SIZE,
            cache::DEFAULT_MAX_CACHE_AGE_SECS,
            limits::DEFAULT_RATE_LIMIT_RPS,
            orchestrator::NOTIFY_INTERVAL.as_millis(),
            orchestrator::CHUNK_CHANNEL_CAPACITY,
            orchestrator::READ_CHUNK_SIZE,
            orchestrator::HEADER_PROBE_LENGTH,
        )
    }
}

impl CacheConfigToml {
    /// Convert to runtime CacheConfig
    pub fn to_runtime_config(&self) -> CacheConfig {
        CacheConfig {
            cache_root: self.cache_root.clone(),
            max_cache_size: self.max_cache_size,
            max_cache_age: None,
            sweep_interval: self.sweep_interval_secs.map(Duration::from_secs),
        }
        .with_max_cache_age_secs(self.max_cache_age_secs)
    }
}

impl ClientConfigToml {
    /// Convert to runtime ClientConfig
    pub fn to_runtime_config(&self) -> ClientConfig {
        ClientConfig {
            http2: self.http2,
            tcp_keepalive: self.tcp_keepalive_secs.map(Duration::from_secs),
            tcp_nodelay: self.tcp_nodelay,
            pool_idle_timeout: self.pool_idle_timeout_secs.map(Duration::from_secs),
            pool_max_per_host: self.pool_max_per_host,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            rate_limit_rps: self.rate_limit_rps,
        }
    }
}

impl OrchestratorConfigToml {
    /// Convert to runtime OrchestratorConfig
    pub fn to_runtime_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            notify_interval: Duration::from_millis(self.notify_interval_ms),
            chunk_channel_capacity: self.chunk_channel_capacity,
            read_chunk_size: self.read_chunk_size,
            header_probe_length: self.header_probe_length,
        }
    }
}
