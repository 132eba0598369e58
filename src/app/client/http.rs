//! Rate-limited `reqwest` implementation of the range transport
//!
//! This module provides the production [`HttpTransport`]: every fetch waits on
//! a `governor` rate limiter, sends a `Range` header and streams the body
//! without buffering it.

use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use governor::{clock::DefaultClock, state::InMemoryState, Jitter, Quota, RateLimiter};
use reqwest::header::{ACCEPT_RANGES, CONTENT_RANGE, CONTENT_TYPE, RANGE};
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, warn};
use url::Url;

use crate::app::range::ByteRange;
use crate::errors::{DownloadError, DownloadResult};

use super::config::ClientConfig;
use super::transport::{HttpTransport, RangeResponse, ResponseMetadata};

/// HTTP operations handler with rate limiting
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    rate_limiter: RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>,
}

impl HttpHandler {
    /// Creates a new HttpHandler with the given client and rate limiting
    ///
    /// # Arguments
    ///
    /// * `client` - The HTTP client to use for requests
    /// * `rate_limit_rps` - Requests per second rate limit
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::ConfigurationError` if the rate limit is zero
    pub fn new(client: Client, rate_limit_rps: u32) -> DownloadResult<Self> {
        let rate_limiter = Self::build_rate_limiter(rate_limit_rps)?;
        Ok(Self {
            client,
            rate_limiter,
        })
    }

    /// Creates a handler from a client configuration
    pub fn from_config(config: &ClientConfig) -> DownloadResult<Self> {
        let client = config.build_http_client()?;
        Self::new(client, config.rate_limit_rps)
    }

    /// Builds the rate limiter with the specified rate limit
    fn build_rate_limiter(
        rate_limit_rps: u32,
    ) -> DownloadResult<RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>> {
        let quota = Quota::per_second(NonZeroU32::new(rate_limit_rps).ok_or_else(|| {
            DownloadError::ConfigurationError("Rate limit must be non-zero".to_string())
        })?);
        Ok(RateLimiter::direct(quota))
    }

    /// Sends a ranged GET request and checks the status
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::ServerError` for any status other than 200 or 206
    pub async fn get_range(&self, url: &Url, range: ByteRange) -> DownloadResult<Response> {
        // Apply rate limiting with jitter to avoid thundering herd
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
            .await;

        let response = self
            .client
            .get(url.as_str())
            .header(RANGE, range.http_header())
            .send()
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::PARTIAL_CONTENT => {
                debug!(
                    "Fetched {} of {} (HTTP {})",
                    range,
                    url,
                    response.status().as_u16()
                );
                Ok(response)
            }
            status => {
                warn!("Origin answered HTTP {} for {} of {}", status, range, url);
                Err(DownloadError::ServerError {
                    status: status.as_u16(),
                })
            }
        }
    }

    /// Get a reference to the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Extracts the range-relevant headers of a response
    pub fn response_metadata(response: &Response) -> ResponseMetadata {
        let header = |name| {
            response
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };

        ResponseMetadata {
            status: response.status().as_u16(),
            content_length: response.content_length(),
            content_range: header(CONTENT_RANGE),
            content_type: header(CONTENT_TYPE),
            accept_ranges: header(ACCEPT_RANGES),
        }
    }
}

#[async_trait]
impl HttpTransport for HttpHandler {
    async fn fetch(&self, url: &Url, range: ByteRange) -> DownloadResult<RangeResponse> {
        let response = self.get_range(url, range).await?;
        let metadata = Self::response_metadata(&response);
        let body = response.bytes_stream().map_err(DownloadError::Http);

        Ok(RangeResponse {
            metadata,
            body: Box::pin(body),
        })
    }
}
