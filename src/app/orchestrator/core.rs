//! Download orchestrator and session execution
//!
//! A session is admitted through the in-flight registry, then runs its
//! actions strictly in order on a spawned task. Local actions are read back
//! from the data file; remote actions are fetched through the transport,
//! written to the data file, delivered, and marked cached once complete.

use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::app::action::{ActionKind, CacheAction};
use crate::app::cache::{CacheManager, CacheMediaDescriptor, CachedResource, InFlightGuard};
use crate::app::client::{HttpTransport, RangeResponse, ResponseMetadata};
use crate::app::events::{CacheEvent, UpdateThrottle};
use crate::app::range::{ByteRange, RangeRequest};
use crate::errors::{CacheError, DownloadError, DownloadResult};

use super::config::OrchestratorConfig;
use super::types::{DownloadStream, FetchChunk};

/// What a session does once admitted
#[derive(Debug)]
enum Phase {
    /// Run a precomputed plan
    Planned {
        actions: Vec<CacheAction>,
        window: ByteRange,
    },
    /// Plan against the stored state, then run
    Request(RangeRequest),
    /// Probe the head of the resource, then read the rest
    HeaderThenTail,
}

/// Executes cache action plans against one cache root
pub struct DownloadOrchestrator {
    config: OrchestratorConfig,
    cache: Arc<CacheManager>,
    transport: Arc<dyn HttpTransport>,
}

impl DownloadOrchestrator {
    /// Create an orchestrator
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::ConfigurationError` if the configuration is invalid
    pub fn new(
        config: OrchestratorConfig,
        cache: Arc<CacheManager>,
        transport: Arc<dyn HttpTransport>,
    ) -> DownloadResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cache,
            transport,
        })
    }

    pub fn cache(&self) -> &Arc<CacheManager> {
        &self.cache
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Serve `request` for `url`, planning against the cached state
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::ResourceBusy` immediately if a session for the
    /// same URL is running. Every later failure arrives through the stream.
    pub fn execute(&self, url: &Url, request: RangeRequest) -> DownloadResult<DownloadStream> {
        self.start(url, Phase::Request(request))
    }

    /// Run an explicit plan for `url`, delivering only bytes inside `window`
    pub fn execute_actions(
        &self,
        url: &Url,
        actions: Vec<CacheAction>,
        window: ByteRange,
    ) -> DownloadResult<DownloadStream> {
        self.start(url, Phase::Planned { actions, window })
    }

    /// Read the whole resource, probing its head first when its length is unknown
    ///
    /// The probe fetches the first few bytes so the origin reveals length,
    /// type and range support; the tail is then planned with the known length
    /// in the same session.
    pub fn prefetch_header_then_tail(&self, url: &Url) -> DownloadResult<DownloadStream> {
        self.start(url, Phase::HeaderThenTail)
    }

    /// Cancel the running session of `resource_id`, if any
    pub fn cancel(&self, resource_id: &str) -> bool {
        match self.cache.registry().remove(resource_id) {
            Some(info) => {
                info!(
                    "Cancelling download {} of {}",
                    info.download_id, resource_id
                );
                info.cancel_token.cancel();
                true
            }
            None => false,
        }
    }

    fn start(&self, url: &Url, phase: Phase) -> DownloadResult<DownloadStream> {
        let resource_id = url.as_str().to_string();
        let token = CancellationToken::new();
        let guard = self
            .cache
            .registry()
            .try_register(&resource_id, token.clone())?;

        let (tx, rx) = mpsc::channel(self.config.chunk_channel_capacity);
        let session = Session {
            resource_id: resource_id.clone(),
            url: url.clone(),
            config: self.config.clone(),
            cache: Arc::clone(&self.cache),
            transport: Arc::clone(&self.transport),
            token: token.clone(),
            tx,
            throttle: UpdateThrottle::new(self.config.notify_interval),
        };

        debug!(
            "Starting download {} of {}: {:?}",
            guard.download_id(),
            resource_id,
            phase
        );
        tokio::spawn(session.run(phase, guard));

        Ok(DownloadStream::new(resource_id, rx, token))
    }
}

/// State of one running download
struct Session {
    resource_id: String,
    url: Url,
    config: OrchestratorConfig,
    cache: Arc<CacheManager>,
    transport: Arc<dyn HttpTransport>,
    token: CancellationToken,
    tx: mpsc::Sender<DownloadResult<FetchChunk>>,
    throttle: UpdateThrottle,
}

impl Session {
    async fn run(mut self, phase: Phase, guard: InFlightGuard) {
        let started = Instant::now();
        let result = self.run_phase(phase).await;

        // Unregister before anyone can observe the outcome
        drop(guard);

        let error = match &result {
            Ok(()) => {
                info!(
                    "Download of {} finished in {:.2}s",
                    self.resource_id,
                    started.elapsed().as_secs_f64()
                );
                None
            }
            Err(e) if e.is_cancelled() => {
                info!("Download of {} cancelled", self.resource_id);
                Some("cancelled".to_string())
            }
            Err(e) => {
                warn!("Download of {} failed: {}", self.resource_id, e);
                Some(e.to_string())
            }
        };

        self.cache.events().emit(CacheEvent::Finished {
            resource_id: self.resource_id.clone(),
            error,
        });

        if let Err(e) = result {
            // The consumer may already be gone
            let _ = self.tx.send(Err(e)).await;
        }
    }

    async fn run_phase(&mut self, phase: Phase) -> DownloadResult<()> {
        let mut resource = self.cache.open_resource(&self.resource_id).await?;

        match phase {
            Phase::Planned { actions, window } => {
                self.run_actions(&mut resource, &actions, window).await
            }
            Phase::Request(request) => {
                let (window, actions) = resource.plan(request);
                self.run_actions(&mut resource, &actions, window).await
            }
            Phase::HeaderThenTail => {
                let probe = self.config.header_probe_length;
                if resource.descriptor().is_none() {
                    let (window, actions) = resource.plan(RangeRequest::new(0, probe));
                    self.run_actions(&mut resource, &actions, window).await?;

                    if resource.content_length().is_some_and(|length| length <= probe) {
                        return Ok(());
                    }
                    let (window, actions) = resource.plan(RangeRequest::to_end(probe));
                    self.run_actions(&mut resource, &actions, window).await
                } else {
                    let (window, actions) = resource.plan(RangeRequest::to_end(0));
                    self.run_actions(&mut resource, &actions, window).await
                }
            }
        }
    }

    async fn run_actions(
        &mut self,
        resource: &mut CachedResource,
        actions: &[CacheAction],
        window: ByteRange,
    ) -> DownloadResult<()> {
        debug!(
            "Executing {} actions for {} of {}",
            actions.len(),
            window,
            self.resource_id
        );

        for action in actions {
            if self.token.is_cancelled() {
                return Err(self.cancelled());
            }
            match action.kind {
                ActionKind::Local => self.serve_local(resource, action.range, window).await?,
                ActionKind::Remote => self.serve_remote(resource, action.range, window).await?,
            }
        }
        Ok(())
    }

    async fn serve_local(
        &mut self,
        resource: &mut CachedResource,
        range: ByteRange,
        window: ByteRange,
    ) -> DownloadResult<()> {
        let Some(range) = range.intersect(&window) else {
            return Ok(());
        };
        if range.is_open_ended() {
            return Err(CacheError::InvalidState {
                reason: format!("local action {} has no end", range),
            }
            .into());
        }

        let mut offset = range.start;
        while offset < range.end {
            let len = (range.end - offset).min(self.config.read_chunk_size as u64) as usize;
            let data = tokio::select! {
                biased;
                _ = self.token.cancelled() => return Err(self.cancelled()),
                data = resource.read_at(offset, len) => data?,
            };
            self.deliver(FetchChunk {
                offset,
                data,
                from_local: true,
            })
            .await?;
            offset += len as u64;
        }

        // Access time only feeds eviction order
        let _ = resource.touch().await;
        Ok(())
    }

    async fn serve_remote(
        &mut self,
        resource: &mut CachedResource,
        action: ByteRange,
        window: ByteRange,
    ) -> DownloadResult<()> {
        let response = tokio::select! {
            biased;
            _ = self.token.cancelled() => return Err(self.cancelled()),
            response = self.transport.fetch(&self.url, action) => response?,
        };
        let RangeResponse { metadata, mut body } = response;

        let start = match metadata.body_offset() {
            Some(start) if start <= action.start => start,
            Some(start) => {
                return Err(DownloadError::Transport {
                    reason: format!(
                        "origin answered from offset {} for requested {}",
                        start, action
                    ),
                })
            }
            None => {
                return Err(DownloadError::Transport {
                    reason: format!(
                        "partial response for {} without a usable Content-Range",
                        action
                    ),
                })
            }
        };
        self.ensure_descriptor(resource, &metadata).await?;

        let limit = match resource.content_length() {
            Some(length) => action.end.min(length),
            None => action.end,
        };
        let deliverable = action.intersect(&window);
        let mut position = start;

        while position < limit {
            let next = tokio::select! {
                biased;
                _ = self.token.cancelled() => return Err(self.cancelled()),
                next = body.next() => next,
            };
            let Some(chunk) = next else {
                break;
            };
            let mut chunk = chunk?;
            chunk.truncate((limit - position).min(chunk.len() as u64) as usize);
            if chunk.is_empty() {
                continue;
            }

            resource.write_at(position, &chunk).await?;
            let received = ByteRange::new(position, chunk.len() as u64);
            if let Some(part) = deliverable.and_then(|d| d.intersect(&received)) {
                let from = (part.start - position) as usize;
                let to = (part.end - position) as usize;
                self.deliver(FetchChunk {
                    offset: part.start,
                    data: chunk.slice(from..to),
                    from_local: false,
                })
                .await?;
            }
            position = received.end;
            self.notify_progress(resource, position - start, false);
        }
        drop(body);

        if limit != u64::MAX && position < limit {
            return Err(DownloadError::IncompleteDownload {
                received: position - start,
                expected: limit - start,
            });
        }

        if position > start {
            resource
                .mark_cached(ByteRange::from_bounds(start, position))
                .await?;
            self.notify_progress(resource, 0, true);
        }
        Ok(())
    }

    /// Derive and store the descriptor from the first origin response
    async fn ensure_descriptor(
        &self,
        resource: &mut CachedResource,
        metadata: &ResponseMetadata,
    ) -> DownloadResult<()> {
        if resource.descriptor().is_some() {
            return Ok(());
        }

        let path = resource.paths().descriptor.clone();
        resource
            .set_descriptor_once(CacheMediaDescriptor::from_response(metadata))
            .await
            .map_err(|e| DownloadError::DescriptorPersistFailure {
                path,
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn deliver(&self, chunk: FetchChunk) -> DownloadResult<()> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(self.cancelled()),
            sent = self.tx.send(Ok(chunk)) => sent.map_err(|_| self.cancelled()),
        }
    }

    fn notify_progress(&mut self, resource: &CachedResource, pending: u64, force: bool) {
        if !self.throttle.ready() && !force {
            return;
        }
        self.cache.events().emit(CacheEvent::Updated {
            resource_id: self.resource_id.clone(),
            cached_bytes: resource.cached_bytes() + pending,
            content_length: resource.content_length(),
        });
    }

    fn cancelled(&self) -> DownloadError {
        DownloadError::Cancelled {
            resource_id: self.resource_id.clone(),
        }
    }
}
