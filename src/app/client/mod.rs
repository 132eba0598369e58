//! HTTP access to the media origin
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and building
//! - `transport`: the [`HttpTransport`] seam and response metadata parsing
//! - `http`: rate-limited `reqwest` implementation of the transport

pub mod config;
pub mod http;
pub mod transport;

pub use config::ClientConfig;
pub use http::HttpHandler;
pub use transport::{BodyStream, HttpTransport, RangeResponse, ResponseMetadata};
