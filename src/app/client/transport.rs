//! HTTP transport abstraction for ranged origin fetches
//!
//! The orchestrator only ever talks to the origin through [`HttpTransport`],
//! which keeps it independent of `reqwest` and lets tests plug in an in-memory
//! origin.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use url::Url;

use crate::app::range::ByteRange;
use crate::errors::DownloadResult;

/// Body of a ranged response, yielded chunk by chunk
pub type BodyStream = BoxStream<'static, DownloadResult<Bytes>>;

/// Response headers relevant to range caching
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseMetadata {
    /// HTTP status code
    pub status: u16,
    /// `Content-Length` header
    pub content_length: Option<u64>,
    /// Raw `Content-Range` header, e.g. `bytes 0-1/1000`
    pub content_range: Option<String>,
    /// Raw `Content-Type` header
    pub content_type: Option<String>,
    /// Raw `Accept-Ranges` header
    pub accept_ranges: Option<String>,
}

impl ResponseMetadata {
    /// Whether the origin answered with a partial response
    pub fn is_partial(&self) -> bool {
        self.status == 206
    }

    /// Offset of the first body byte within the resource
    ///
    /// A full `200` response always starts at offset 0, whatever was asked.
    /// A partial response without a parseable `Content-Range` has no known
    /// offset.
    pub fn body_offset(&self) -> Option<u64> {
        if !self.is_partial() {
            return Some(0);
        }
        self.content_range
            .as_deref()
            .and_then(parse_content_range)
            .and_then(|(start, _)| start)
    }

    /// Total resource length, if the response reveals it
    pub fn total_length(&self) -> Option<u64> {
        if let Some(total) = self
            .content_range
            .as_deref()
            .and_then(parse_content_range)
            .and_then(|(_, total)| total)
        {
            return Some(total);
        }
        if self.status == 200 {
            return self.content_length;
        }
        None
    }

    /// MIME type without parameters, lowercased
    pub fn mime_type(&self) -> Option<String> {
        self.content_type
            .as_deref()
            .and_then(|value| value.split(';').next())
            .map(|mime| mime.trim().to_ascii_lowercase())
            .filter(|mime| !mime.is_empty())
    }

    /// Whether the origin serves byte ranges
    pub fn supports_byte_ranges(&self) -> bool {
        self.is_partial()
            || self
                .accept_ranges
                .as_deref()
                .is_some_and(|value| value.trim().eq_ignore_ascii_case("bytes"))
    }
}

/// Parse `bytes <start>-<end>/<total>` into the start offset and the total
///
/// A total of `*` means the origin does not know the length.
pub fn parse_content_range(value: &str) -> Option<(Option<u64>, Option<u64>)> {
    let rest = value.trim().strip_prefix("bytes")?.trim_start();
    let (span, total) = rest.split_once('/')?;
    let total = match total.trim() {
        "*" => None,
        total => Some(total.parse().ok()?),
    };
    let start = match span.trim().split_once('-') {
        Some((start, _)) => Some(start.trim().parse().ok()?),
        // `bytes */1000` carries no span
        None if span.trim() == "*" => None,
        None => return None,
    };
    Some((start, total))
}

/// A ranged response: headers plus a streaming body
pub struct RangeResponse {
    pub metadata: ResponseMetadata,
    pub body: BodyStream,
}

impl std::fmt::Debug for RangeResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangeResponse")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Ranged GET against a remote origin
///
/// Implementations must send a `Range` header for `range`, accept `200` and
/// `206` answers, and map any other status to an error. Dropping the returned
/// body stream must abort the transfer.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn fetch(&self, url: &Url, range: ByteRange) -> DownloadResult<RangeResponse>;
}
