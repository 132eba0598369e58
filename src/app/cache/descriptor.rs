//! Per-resource media descriptor
//!
//! The descriptor records what the first origin response revealed about a
//! resource. It is written once and never rewritten afterwards.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::warn;

use crate::app::client::ResponseMetadata;
use crate::errors::CacheResult;

use super::atomic::write_json_atomic;

/// Length, type and range capability of a cached resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMediaDescriptor {
    /// Total resource length in bytes, if the origin disclosed it
    pub content_length: Option<u64>,
    /// MIME type without parameters
    pub content_type: Option<String>,
    /// Whether the origin honours byte-range requests
    pub byte_range_supported: bool,
    /// When the descriptor was derived
    pub created_at: DateTime<Utc>,
}

impl CacheMediaDescriptor {
    /// Derive a descriptor from the headers of the first origin response
    pub fn from_response(metadata: &ResponseMetadata) -> Self {
        Self {
            content_length: metadata.total_length(),
            content_type: metadata.mime_type(),
            byte_range_supported: metadata.supports_byte_ranges(),
            created_at: Utc::now(),
        }
    }

    /// Load a persisted descriptor
    ///
    /// A missing file yields `None`. A file that cannot be parsed is logged
    /// and also yields `None`, so the next response derives a fresh one.
    pub async fn load(path: &Path) -> CacheResult<Option<Self>> {
        let content = match fs::read(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&content) {
            Ok(descriptor) => Ok(Some(descriptor)),
            Err(e) => {
                warn!("Ignoring unreadable descriptor {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    /// Persist the descriptor atomically
    pub async fn persist(&self, path: &Path) -> CacheResult<()> {
        write_json_atomic(path, self).await
    }
}
