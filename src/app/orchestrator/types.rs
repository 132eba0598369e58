//! Data delivered by download sessions
//!
//! A session hands its bytes to the consumer through a [`DownloadStream`]:
//! an ordered stream of [`FetchChunk`]s that ends with `None` on success, or
//! with a final error item when the session failed.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::app::range::ByteRange;
use crate::errors::DownloadResult;

/// Consecutive bytes of the requested window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchChunk {
    /// Resource offset of the first byte
    pub offset: u64,
    pub data: Bytes,
    /// Whether the bytes were read from the cache rather than the origin
    pub from_local: bool,
}

impl FetchChunk {
    pub fn range(&self) -> ByteRange {
        ByteRange::new(self.offset, self.data.len() as u64)
    }
}

/// Ordered byte stream of one download session
///
/// Dropping the stream cancels the session.
#[derive(Debug)]
pub struct DownloadStream {
    resource_id: String,
    rx: mpsc::Receiver<DownloadResult<FetchChunk>>,
    token: CancellationToken,
    cancelled_by_holder: bool,
    _drop_guard: DropGuard,
}

impl DownloadStream {
    pub(crate) fn new(
        resource_id: String,
        rx: mpsc::Receiver<DownloadResult<FetchChunk>>,
        token: CancellationToken,
    ) -> Self {
        let drop_guard = token.clone().drop_guard();
        Self {
            resource_id,
            rx,
            token,
            cancelled_by_holder: false,
            _drop_guard: drop_guard,
        }
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    /// Abort the session
    ///
    /// The stream then ends without reporting the cancellation as an error.
    pub fn cancel(&mut self) {
        self.cancelled_by_holder = true;
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Stream for DownloadStream {
    type Item = DownloadResult<FetchChunk>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(Err(e))) if e.is_cancelled() && self.cancelled_by_holder => {
                Poll::Ready(None)
            }
            other => other,
        }
    }
}
