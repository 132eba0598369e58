//! Consumer-facing media cache
//!
//! [`MediaCache`] ties a cache root, an HTTP transport and the download
//! orchestrator together behind URL-keyed operations: serving byte ranges,
//! prefetching, superseding loads, cancellation and cache maintenance.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info};
use url::Url;

use crate::app::action::CacheAction;
use crate::app::cache::{
    CacheConfig, CacheManager, CacheMediaDescriptor, CacheStats, InFlightRegistry, SweepReport,
};
use crate::app::client::{ClientConfig, HttpHandler, HttpTransport};
use crate::app::events::{CacheEvent, Receiver};
use crate::app::orchestrator::{DownloadOrchestrator, DownloadStream, OrchestratorConfig};
use crate::app::range::{ByteRange, RangeRequest};
use crate::errors::{CacheResult, DownloadError, DownloadResult, Result};

/// Byte-range cache for streaming media
pub struct MediaCache {
    cache: Arc<CacheManager>,
    orchestrator: DownloadOrchestrator,
    sweeper: Option<JoinHandle<()>>,
}

impl MediaCache {
    /// Create a media cache fetching through a `reqwest` client
    ///
    /// # Errors
    ///
    /// Returns an error if the cache root cannot be prepared, the HTTP client
    /// cannot be built, or the orchestrator configuration is invalid
    pub async fn new(
        cache_config: CacheConfig,
        client_config: &ClientConfig,
        orchestrator_config: OrchestratorConfig,
    ) -> Result<Self> {
        let transport = Arc::new(HttpHandler::from_config(client_config)?);
        Self::with_transport(cache_config, orchestrator_config, transport).await
    }

    /// Create a media cache fetching through `transport`
    pub async fn with_transport(
        cache_config: CacheConfig,
        orchestrator_config: OrchestratorConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self> {
        let registry = Arc::new(InFlightRegistry::new());
        let cache = Arc::new(CacheManager::with_registry(cache_config, registry).await?);
        let orchestrator =
            DownloadOrchestrator::new(orchestrator_config, Arc::clone(&cache), transport)?;

        Ok(Self {
            cache,
            orchestrator,
            sweeper: None,
        })
    }

    /// Start sweeping every configured `sweep_interval`
    ///
    /// Returns whether a sweeper is running afterwards.
    pub fn start_periodic_sweep(&mut self) -> bool {
        if self.sweeper.is_none() {
            self.sweeper = self.cache.spawn_periodic_sweep();
            if let Some(interval) = self.cache.config().sweep_interval {
                info!("Sweeping cache every {:?}", interval);
            }
        }
        self.sweeper.is_some()
    }

    pub fn cache(&self) -> &Arc<CacheManager> {
        &self.cache
    }

    pub fn orchestrator(&self) -> &DownloadOrchestrator {
        &self.orchestrator
    }

    /// Serve `request` of `url`, from the cache where possible
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::InvalidUrl` for an unparsable URL and
    /// `DownloadError::ResourceBusy` if `url` is already being downloaded
    pub fn plan_and_execute(&self, url: &str, request: RangeRequest) -> DownloadResult<DownloadStream> {
        let url = parse_url(url)?;
        self.orchestrator.execute(&url, request)
    }

    /// Serve `request` of `url`, cancelling any download of `url` in progress
    pub fn load_superseding(&self, url: &str, request: RangeRequest) -> DownloadResult<DownloadStream> {
        let url = parse_url(url)?;
        if self.orchestrator.cancel(url.as_str()) {
            debug!("Superseded running download of {}", url);
        }
        self.orchestrator.execute(&url, request)
    }

    /// Cache the whole of `url`, probing its head first
    pub fn prefetch(&self, url: &str) -> DownloadResult<DownloadStream> {
        let url = parse_url(url)?;
        self.orchestrator.prefetch_header_then_tail(&url)
    }

    /// Plan `request` of `url` without touching the disk or the network
    ///
    /// Returns the resolved window and the actions that would serve it.
    pub async fn plan(
        &self,
        url: &str,
        request: RangeRequest,
    ) -> DownloadResult<(ByteRange, Vec<CacheAction>)> {
        let url = parse_url(url)?;
        let resource = self.cache.open_resource(url.as_str()).await?;
        Ok(resource.plan(request))
    }

    /// Cancel the download of `resource_id`
    ///
    /// Returns whether a download was running.
    pub fn cancel(&self, resource_id: &str) -> bool {
        self.orchestrator.cancel(&resource_key(resource_id))
    }

    /// Whether `url` is being downloaded
    pub fn is_loading(&self, url: &str) -> bool {
        self.cache.registry().contains(&resource_key(url))
    }

    pub async fn calculate_total_cache_size(&self) -> CacheResult<u64> {
        self.cache.calculate_total_cache_size().await
    }

    /// Delete every cached resource
    pub async fn clear_all(&self) -> CacheResult<()> {
        self.cache.clear_all().await
    }

    /// Evict entries by age and size
    pub async fn sweep(&self) -> CacheResult<SweepReport> {
        self.cache.sweep().await
    }

    /// Stored descriptor of `url`, if any response has been seen
    pub async fn descriptor(&self, url: &str) -> DownloadResult<Option<CacheMediaDescriptor>> {
        let url = parse_url(url)?;
        Ok(self.cache.descriptor(url.as_str()).await?)
    }

    pub async fn stats(&self) -> CacheResult<CacheStats> {
        self.cache.get_cache_stats().await
    }

    /// Receive cache notifications
    pub fn subscribe(&self) -> Receiver<CacheEvent> {
        self.cache.subscribe()
    }
}

impl Drop for MediaCache {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }
    }
}

fn parse_url(url: &str) -> DownloadResult<Url> {
    Url::parse(url).map_err(|error| DownloadError::InvalidUrl {
        url: url.to_string(),
        error: error.to_string(),
    })
}

/// Resource id of `url`, which is its normalized form when it parses
fn resource_key(url: &str) -> String {
    Url::parse(url)
        .map(String::from)
        .unwrap_or_else(|_| url.to_string())
}
