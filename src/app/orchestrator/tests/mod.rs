//! Session tests against an in-memory origin
//!
//! The mock origin serves a fixed byte buffer, optionally honoring ranges,
//! pausing between chunks, or cutting the body short, and records every
//! range it was asked for.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tempfile::TempDir;
use url::Url;

use crate::app::action::CacheAction;
use crate::app::cache::{CacheConfig, CacheManager, CacheMediaDescriptor, PathGenerator};
use crate::app::client::{HttpTransport, RangeResponse, ResponseMetadata};
use crate::app::events::{CacheEvent, Receiver};
use crate::app::range::{ByteRange, RangeRequest};
use crate::errors::{DownloadError, DownloadResult};

use super::{DownloadOrchestrator, DownloadStream, FetchChunk, OrchestratorConfig};

const RESOURCE_URL: &str = "https://media.example.com/video/episode-1.mp4";

struct MockOrigin {
    data: Vec<u8>,
    supports_ranges: bool,
    chunk_size: usize,
    chunk_delay: Option<Duration>,
    /// Body ends early after this many bytes
    short_after: Option<usize>,
    /// Body fails with a transport error after this many bytes
    error_after: Option<usize>,
    /// Partial responses carry no `Content-Range`
    omit_content_range: bool,
    requests: Mutex<Vec<ByteRange>>,
}

impl MockOrigin {
    fn new(len: usize) -> Self {
        Self {
            data: (0..len).map(|i| (i % 251) as u8).collect(),
            supports_ranges: true,
            chunk_size: 64,
            chunk_delay: None,
            short_after: None,
            error_after: None,
            omit_content_range: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn without_ranges(mut self) -> Self {
        self.supports_ranges = false;
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    fn requests(&self) -> Vec<ByteRange> {
        self.requests.lock().unwrap().clone()
    }

    fn slice(&self, range: ByteRange) -> &[u8] {
        &self.data[range.start as usize..range.end as usize]
    }
}

#[async_trait]
impl HttpTransport for MockOrigin {
    async fn fetch(&self, _url: &Url, range: ByteRange) -> DownloadResult<RangeResponse> {
        self.requests.lock().unwrap().push(range);
        let total = self.data.len() as u64;

        let (status, start, end, content_range) = if self.supports_ranges {
            if range.start >= total {
                return Err(DownloadError::ServerError { status: 416 });
            }
            let end = range.end.min(total);
            (
                206,
                range.start,
                end,
                Some(format!("bytes {}-{}/{}", range.start, end - 1, total)),
            )
        } else {
            (200, 0, total, None)
        };

        let mut body = self.data[start as usize..end as usize].to_vec();
        if let Some(limit) = self.short_after {
            body.truncate(limit);
        }
        let mut items: Vec<DownloadResult<Bytes>> = body
            .chunks(self.chunk_size)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        if let Some(limit) = self.error_after {
            let keep = limit.div_ceil(self.chunk_size);
            items.truncate(keep);
            items.push(Err(DownloadError::Transport {
                reason: "connection reset".to_string(),
            }));
        }

        let delay = self.chunk_delay;
        let body = futures::stream::iter(items).then(move |item| async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            item
        });

        Ok(RangeResponse {
            metadata: ResponseMetadata {
                status,
                content_length: Some(end - start),
                content_range: content_range.filter(|_| !self.omit_content_range),
                content_type: Some("video/mp4".to_string()),
                accept_ranges: self.supports_ranges.then(|| "bytes".to_string()),
            },
            body: Box::pin(body),
        })
    }
}

async fn create_test_orchestrator(
    origin: MockOrigin,
) -> (DownloadOrchestrator, Arc<MockOrigin>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let cache = Arc::new(
        CacheManager::new(CacheConfig::with_cache_root(temp_dir.path().to_path_buf()))
            .await
            .unwrap(),
    );
    let origin = Arc::new(origin);
    let config = OrchestratorConfig {
        read_chunk_size: 32,
        chunk_channel_capacity: 4,
        ..Default::default()
    };
    let orchestrator = DownloadOrchestrator::new(config, cache, origin.clone()).unwrap();
    (orchestrator, origin, temp_dir)
}

fn url() -> Url {
    Url::parse(RESOURCE_URL).unwrap()
}

/// Drain a stream into its chunks and the error it ended with, if any
async fn collect(mut stream: DownloadStream) -> (Vec<FetchChunk>, Option<DownloadError>) {
    let mut chunks = Vec::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(chunk) => chunks.push(chunk),
            Err(e) => return (chunks, Some(e)),
        }
    }
    (chunks, None)
}

fn concat(chunks: &[FetchChunk]) -> Vec<u8> {
    chunks.iter().flat_map(|c| c.data.iter().copied()).collect()
}

async fn wait_finished(events: &mut Receiver<CacheEvent>) -> Option<String> {
    loop {
        match tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("no finished event")
            .unwrap()
        {
            CacheEvent::Finished { error, .. } => return error,
            _ => continue,
        }
    }
}

/// Store `range` of `origin` in the cache as if downloaded earlier
async fn seed_cache(orchestrator: &DownloadOrchestrator, origin: &MockOrigin, range: ByteRange) {
    let mut resource = orchestrator.cache().open_resource(RESOURCE_URL).await.unwrap();
    resource
        .set_descriptor_once(CacheMediaDescriptor {
            content_length: Some(origin.data.len() as u64),
            content_type: Some("video/mp4".to_string()),
            byte_range_supported: true,
            created_at: chrono::Utc::now(),
        })
        .await
        .unwrap();
    resource.write_at(range.start, origin.slice(range)).await.unwrap();
    resource.mark_cached(range).await.unwrap();
}

#[tokio::test]
async fn test_first_request_fetches_and_caches() {
    let (orchestrator, origin, _temp_dir) = create_test_orchestrator(MockOrigin::new(1000)).await;
    let mut events = orchestrator.cache().subscribe();

    let stream = orchestrator.execute(&url(), RangeRequest::new(0, 100)).unwrap();
    let (chunks, error) = collect(stream).await;

    assert!(error.is_none());
    assert_eq!(concat(&chunks), origin.slice(ByteRange::new(0, 100)));
    assert!(chunks.iter().all(|c| !c.from_local));
    assert_eq!(origin.requests(), vec![ByteRange::new(0, 100)]);
    assert_eq!(wait_finished(&mut events).await, None);

    let resource = orchestrator.cache().open_resource(RESOURCE_URL).await.unwrap();
    let ranges: Vec<_> = resource.cached_ranges().iter().copied().collect();
    assert_eq!(ranges, vec![ByteRange::new(0, 100)]);
    assert_eq!(resource.content_length(), Some(1000));
    assert_eq!(resource.content_type(), Some("video/mp4"));
    assert!(orchestrator.cache().registry().is_empty());
}

#[tokio::test]
async fn test_mixed_local_and_remote_delivery() {
    let (orchestrator, origin, _temp_dir) = create_test_orchestrator(MockOrigin::new(1000)).await;
    seed_cache(&orchestrator, &origin, ByteRange::from_bounds(0, 100)).await;
    seed_cache(&orchestrator, &origin, ByteRange::from_bounds(300, 400)).await;

    let stream = orchestrator
        .execute(&url(), RangeRequest::new(50, 300))
        .unwrap();
    let (chunks, error) = collect(stream).await;

    assert!(error.is_none());
    assert_eq!(concat(&chunks), origin.slice(ByteRange::from_bounds(50, 350)));
    assert_eq!(origin.requests(), vec![ByteRange::from_bounds(100, 300)]);

    // Offsets are contiguous and sources alternate local, remote, local
    let mut expected = 50;
    for chunk in &chunks {
        assert_eq!(chunk.offset, expected);
        expected = chunk.range().end;
        let local = chunk.offset < 100 || chunk.offset >= 300;
        assert_eq!(chunk.from_local, local, "chunk at {}", chunk.offset);
    }

    let resource = orchestrator.cache().open_resource(RESOURCE_URL).await.unwrap();
    assert!(resource
        .cached_ranges()
        .covers(&ByteRange::from_bounds(0, 400)));
}

#[tokio::test]
async fn test_fully_cached_request_makes_no_origin_request() {
    let (orchestrator, origin, _temp_dir) = create_test_orchestrator(MockOrigin::new(500)).await;
    seed_cache(&orchestrator, &origin, ByteRange::from_bounds(0, 500)).await;

    let stream = orchestrator
        .execute(&url(), RangeRequest::to_end(100))
        .unwrap();
    let (chunks, error) = collect(stream).await;

    assert!(error.is_none());
    assert_eq!(concat(&chunks), origin.slice(ByteRange::from_bounds(100, 500)));
    assert!(chunks.iter().all(|c| c.from_local));
    assert!(origin.requests().is_empty());
}

#[tokio::test]
async fn test_duplicate_request_is_busy() {
    let (orchestrator, origin, _temp_dir) =
        create_test_orchestrator(MockOrigin::new(512).with_delay(Duration::from_millis(10))).await;

    let first = orchestrator.execute(&url(), RangeRequest::new(0, 512)).unwrap();
    let second = orchestrator.execute(&url(), RangeRequest::new(0, 10));
    assert!(matches!(second, Err(DownloadError::ResourceBusy { .. })));

    let (chunks, error) = collect(first).await;
    assert!(error.is_none());
    assert_eq!(concat(&chunks), origin.data);
}

#[tokio::test]
async fn test_holder_cancel_ends_quietly() {
    let (orchestrator, _origin, _temp_dir) =
        create_test_orchestrator(MockOrigin::new(4096).with_delay(Duration::from_millis(20))).await;
    let mut events = orchestrator.cache().subscribe();

    let mut stream = orchestrator.execute(&url(), RangeRequest::new(0, 4096)).unwrap();
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.offset, 0);

    stream.cancel();
    while let Some(item) = stream.next().await {
        assert!(item.is_ok(), "holder cancel reported {:?}", item);
    }

    assert_eq!(wait_finished(&mut events).await.as_deref(), Some("cancelled"));
    assert!(orchestrator.cache().registry().is_empty());

    // Nothing committed for the aborted range
    let resource = orchestrator.cache().open_resource(RESOURCE_URL).await.unwrap();
    assert!(resource.cached_ranges().is_empty());
}

#[tokio::test]
async fn test_cancel_by_resource_id_is_reported() {
    let (orchestrator, _origin, _temp_dir) =
        create_test_orchestrator(MockOrigin::new(4096).with_delay(Duration::from_millis(20))).await;

    let mut stream = orchestrator.execute(&url(), RangeRequest::new(0, 4096)).unwrap();
    stream.next().await.unwrap().unwrap();

    assert!(orchestrator.cancel(RESOURCE_URL));
    assert!(!orchestrator.cache().registry().contains(RESOURCE_URL));
    assert!(!orchestrator.cancel(RESOURCE_URL));

    let (_, error) = collect(stream).await;
    assert!(matches!(error, Some(DownloadError::Cancelled { .. })));
}

#[tokio::test]
async fn test_dropping_stream_cancels_session() {
    let (orchestrator, _origin, _temp_dir) =
        create_test_orchestrator(MockOrigin::new(4096).with_delay(Duration::from_millis(20))).await;
    let mut events = orchestrator.cache().subscribe();

    let stream = orchestrator.execute(&url(), RangeRequest::new(0, 4096)).unwrap();
    drop(stream);

    assert_eq!(wait_finished(&mut events).await.as_deref(), Some("cancelled"));
    assert!(orchestrator.cache().registry().is_empty());
}

#[tokio::test]
async fn test_short_body_marks_nothing() {
    let mut origin = MockOrigin::new(1000);
    origin.short_after = Some(60);
    let (orchestrator, _origin, _temp_dir) = create_test_orchestrator(origin).await;
    let mut events = orchestrator.cache().subscribe();

    let stream = orchestrator.execute(&url(), RangeRequest::new(0, 100)).unwrap();
    let (chunks, error) = collect(stream).await;

    assert_eq!(concat(&chunks).len(), 60);
    assert!(matches!(
        error,
        Some(DownloadError::IncompleteDownload {
            received: 60,
            expected: 100
        })
    ));
    assert!(wait_finished(&mut events).await.is_some());

    let resource = orchestrator.cache().open_resource(RESOURCE_URL).await.unwrap();
    assert!(resource.cached_ranges().is_empty());
    assert!(orchestrator.cache().registry().is_empty());
}

#[tokio::test]
async fn test_transport_failure_keeps_completed_ranges() {
    let mut origin = MockOrigin::new(1000);
    origin.error_after = Some(128);
    let (orchestrator, origin, _temp_dir) = create_test_orchestrator(origin).await;

    let stream = orchestrator.execute(&url(), RangeRequest::new(0, 100)).unwrap();
    let (_, error) = collect(stream).await;
    assert!(error.is_none());

    let stream = orchestrator.execute(&url(), RangeRequest::new(0, 400)).unwrap();
    let (chunks, error) = collect(stream).await;
    assert!(matches!(error, Some(DownloadError::Transport { .. })));
    assert!(concat(&chunks).starts_with(origin.slice(ByteRange::new(0, 100))));

    let resource = orchestrator.cache().open_resource(RESOURCE_URL).await.unwrap();
    let ranges: Vec<_> = resource.cached_ranges().iter().copied().collect();
    assert_eq!(ranges, vec![ByteRange::new(0, 100)]);
}

#[tokio::test]
async fn test_partial_response_without_offset_leaves_cache_intact() {
    let mut origin = MockOrigin::new(1000);
    origin.omit_content_range = true;
    let (orchestrator, origin, _temp_dir) = create_test_orchestrator(origin).await;
    seed_cache(&orchestrator, &origin, ByteRange::new(0, 100)).await;

    let stream = orchestrator.execute(&url(), RangeRequest::new(500, 100)).unwrap();
    let (chunks, error) = collect(stream).await;
    assert!(chunks.is_empty());
    assert!(matches!(error, Some(DownloadError::Transport { .. })));

    let mut resource = orchestrator.cache().open_resource(RESOURCE_URL).await.unwrap();
    let ranges: Vec<_> = resource.cached_ranges().iter().copied().collect();
    assert_eq!(ranges, vec![ByteRange::new(0, 100)]);
    let cached = resource.read_at(0, 100).await.unwrap();
    assert_eq!(cached.as_ref(), origin.slice(ByteRange::new(0, 100)));
    assert!(orchestrator.cache().registry().is_empty());
}

#[tokio::test]
async fn test_non_range_origin_reads_whole_resource() {
    let (orchestrator, origin, _temp_dir) =
        create_test_orchestrator(MockOrigin::new(300).without_ranges()).await;

    let stream = orchestrator.execute(&url(), RangeRequest::new(10, 10)).unwrap();
    let (chunks, error) = collect(stream).await;
    assert!(error.is_none());
    assert_eq!(concat(&chunks), origin.slice(ByteRange::from_bounds(10, 20)));

    let descriptor = orchestrator
        .cache()
        .descriptor(RESOURCE_URL)
        .await
        .unwrap()
        .unwrap();
    assert!(!descriptor.byte_range_supported);

    // Once known, a non-range origin is always read from the start
    let stream = orchestrator.execute(&url(), RangeRequest::new(200, 10)).unwrap();
    let (chunks, error) = collect(stream).await;
    assert!(error.is_none());
    assert_eq!(concat(&chunks), origin.slice(ByteRange::from_bounds(200, 210)));
    assert_eq!(origin.requests()[1], ByteRange::from_bounds(0, 300));
}

#[tokio::test]
async fn test_prefetch_probes_header_then_tail() {
    let (orchestrator, origin, _temp_dir) = create_test_orchestrator(MockOrigin::new(700)).await;

    let stream = orchestrator.prefetch_header_then_tail(&url()).unwrap();
    let (chunks, error) = collect(stream).await;

    assert!(error.is_none());
    assert_eq!(concat(&chunks), origin.data);
    assert_eq!(
        origin.requests(),
        vec![ByteRange::new(0, 2), ByteRange::from_bounds(2, 700)]
    );

    let resource = orchestrator.cache().open_resource(RESOURCE_URL).await.unwrap();
    assert!(resource
        .cached_ranges()
        .covers(&ByteRange::from_bounds(0, 700)));
}

#[tokio::test]
async fn test_prefetch_of_cached_resource_stays_local() {
    let (orchestrator, origin, _temp_dir) = create_test_orchestrator(MockOrigin::new(300)).await;
    seed_cache(&orchestrator, &origin, ByteRange::from_bounds(0, 300)).await;

    let stream = orchestrator.prefetch_header_then_tail(&url()).unwrap();
    let (chunks, error) = collect(stream).await;

    assert!(error.is_none());
    assert_eq!(concat(&chunks), origin.data);
    assert!(origin.requests().is_empty());
}

#[tokio::test]
async fn test_descriptor_is_written_once() {
    let (orchestrator, _origin, _temp_dir) = create_test_orchestrator(MockOrigin::new(300)).await;

    let stream = orchestrator.execute(&url(), RangeRequest::new(0, 10)).unwrap();
    collect(stream).await;
    let first = orchestrator
        .cache()
        .descriptor(RESOURCE_URL)
        .await
        .unwrap()
        .unwrap();

    let stream = orchestrator.execute(&url(), RangeRequest::new(100, 10)).unwrap();
    collect(stream).await;
    let second = orchestrator
        .cache()
        .descriptor(RESOURCE_URL)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_descriptor_persist_failure_fails_session() {
    let (orchestrator, _origin, _temp_dir) = create_test_orchestrator(MockOrigin::new(300)).await;

    // A directory where the descriptor's temp file belongs
    let paths = orchestrator.cache().resource_paths(RESOURCE_URL);
    std::fs::create_dir_all(PathGenerator::temp_path(&paths.descriptor)).unwrap();

    let stream = orchestrator.execute(&url(), RangeRequest::new(0, 10)).unwrap();
    let (chunks, error) = collect(stream).await;

    assert!(chunks.is_empty());
    assert!(matches!(
        error,
        Some(DownloadError::DescriptorPersistFailure { .. })
    ));
}

#[tokio::test]
async fn test_explicit_plan_limits_delivery_to_window() {
    let (orchestrator, origin, _temp_dir) = create_test_orchestrator(MockOrigin::new(400)).await;

    let actions = vec![CacheAction::remote(ByteRange::from_bounds(0, 200))];
    let window = ByteRange::from_bounds(50, 150);
    let stream = orchestrator.execute_actions(&url(), actions, window).unwrap();
    let (chunks, error) = collect(stream).await;

    assert!(error.is_none());
    assert_eq!(concat(&chunks), origin.slice(window));

    // The whole action is cached even though only the window was delivered
    let resource = orchestrator.cache().open_resource(RESOURCE_URL).await.unwrap();
    assert!(resource
        .cached_ranges()
        .covers(&ByteRange::from_bounds(0, 200)));
}

#[tokio::test]
async fn test_progress_events_report_cached_bytes() {
    let (orchestrator, _origin, _temp_dir) = create_test_orchestrator(MockOrigin::new(256)).await;
    let mut events = orchestrator.cache().subscribe();

    let stream = orchestrator.execute(&url(), RangeRequest::new(0, 256)).unwrap();
    collect(stream).await;

    let mut last_update = None;
    loop {
        match events.recv().await.unwrap() {
            CacheEvent::Updated { cached_bytes, content_length, .. } => {
                last_update = Some((cached_bytes, content_length));
            }
            CacheEvent::Finished { error, .. } => {
                assert!(error.is_none());
                break;
            }
            CacheEvent::Cleaned { .. } => {}
        }
    }
    assert_eq!(last_update, Some((256, Some(256))));
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let cache = Arc::new(
        CacheManager::new(CacheConfig::with_cache_root(temp_dir.path().to_path_buf()))
            .await
            .unwrap(),
    );
    let config = OrchestratorConfig {
        read_chunk_size: 0,
        ..Default::default()
    };
    let result = DownloadOrchestrator::new(config, cache, Arc::new(MockOrigin::new(1)));
    assert!(matches!(result, Err(DownloadError::ConfigurationError(_))));
}
