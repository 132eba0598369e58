//! In-flight registry preventing duplicate downloads
//!
//! At most one download session may run per resource. Sessions register
//! themselves before touching the origin and hold an [`InFlightGuard`] that
//! releases the registration when the session ends, whichever way it ends.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::{DownloadError, DownloadResult};

/// Information about an active download session
#[derive(Debug, Clone)]
pub struct InFlightInfo {
    /// Resource identifier (the URL)
    pub resource_id: String,
    /// Unique id of the registering session
    pub download_id: u64,
    /// When the session registered
    pub started_at: DateTime<Utc>,
    /// Token aborting the session
    pub cancel_token: CancellationToken,
}

/// Shared set of resources currently being downloaded
#[derive(Debug, Default)]
pub struct InFlightRegistry {
    entries: Mutex<HashMap<String, InFlightInfo>>,
    next_download_id: AtomicU64,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, InFlightInfo>> {
        // A panic while holding the lock cannot leave the map half-updated
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a download for `resource_id`
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::ResourceBusy` if the resource is already
    /// registered. The existing registration is left untouched.
    pub fn try_register(
        self: &Arc<Self>,
        resource_id: &str,
        cancel_token: CancellationToken,
    ) -> DownloadResult<InFlightGuard> {
        let mut entries = self.entries();
        if entries.contains_key(resource_id) {
            return Err(DownloadError::ResourceBusy {
                resource_id: resource_id.to_string(),
            });
        }

        let download_id = self.next_download_id.fetch_add(1, Ordering::Relaxed) + 1;
        entries.insert(
            resource_id.to_string(),
            InFlightInfo {
                resource_id: resource_id.to_string(),
                download_id,
                started_at: Utc::now(),
                cancel_token,
            },
        );
        debug!("Registered download {} for {}", download_id, resource_id);

        Ok(InFlightGuard {
            registry: Arc::clone(self),
            resource_id: resource_id.to_string(),
            download_id,
        })
    }

    pub fn contains(&self, resource_id: &str) -> bool {
        self.entries().contains_key(resource_id)
    }

    /// Snapshot of the registration for `resource_id`
    pub fn get(&self, resource_id: &str) -> Option<InFlightInfo> {
        self.entries().get(resource_id).cloned()
    }

    /// Remove the registration for `resource_id`, whoever holds it
    pub fn remove(&self, resource_id: &str) -> Option<InFlightInfo> {
        self.entries().remove(resource_id)
    }

    /// Remove the registration only if it still belongs to `download_id`
    fn release(&self, resource_id: &str, download_id: u64) {
        let mut entries = self.entries();
        if entries
            .get(resource_id)
            .is_some_and(|info| info.download_id == download_id)
        {
            entries.remove(resource_id);
            debug!("Released download {} for {}", download_id, resource_id);
        }
    }

    /// All active registrations
    pub fn in_flight(&self) -> Vec<InFlightInfo> {
        self.entries().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

/// Registration held by a running session
#[derive(Debug)]
pub struct InFlightGuard {
    registry: Arc<InFlightRegistry>,
    resource_id: String,
    download_id: u64,
}

impl InFlightGuard {
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn download_id(&self) -> u64 {
        self.download_id
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry.release(&self.resource_id, self.download_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://example.com/track.mp3";

    #[test]
    fn test_register_and_release() {
        let registry = Arc::new(InFlightRegistry::new());
        let guard = registry
            .try_register(URL, CancellationToken::new())
            .unwrap();

        assert!(registry.contains(URL));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(URL).unwrap().download_id, guard.download_id());

        drop(guard);
        assert!(!registry.contains(URL));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_registration_is_busy() {
        let registry = Arc::new(InFlightRegistry::new());
        let first = registry
            .try_register(URL, CancellationToken::new())
            .unwrap();

        let second = registry.try_register(URL, CancellationToken::new());
        assert!(matches!(second, Err(DownloadError::ResourceBusy { .. })));

        // The first registration is undisturbed
        assert_eq!(registry.get(URL).unwrap().download_id, first.download_id());
    }

    #[test]
    fn test_stale_guard_does_not_remove_new_registration() {
        let registry = Arc::new(InFlightRegistry::new());
        let old = registry
            .try_register(URL, CancellationToken::new())
            .unwrap();

        registry.remove(URL);
        let new = registry
            .try_register(URL, CancellationToken::new())
            .unwrap();

        drop(old);
        assert!(registry.contains(URL));
        assert_eq!(registry.get(URL).unwrap().download_id, new.download_id());
    }

    #[test]
    fn test_remove_returns_cancel_token() {
        let registry = Arc::new(InFlightRegistry::new());
        let token = CancellationToken::new();
        let _guard = registry.try_register(URL, token.clone()).unwrap();

        let info = registry.remove(URL).unwrap();
        info.cancel_token.cancel();
        assert!(token.is_cancelled());
        assert!(registry.remove(URL).is_none());
    }
}
