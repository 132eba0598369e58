//! Media Range Cache Library
//!
//! A byte-range addressable disk cache for streaming media. Remote resources
//! are cached range by range; requests are planned into ordered local and
//! remote actions so only missing bytes are fetched from the origin, and the
//! cache is kept in bounds by age and size eviction.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use app::loader::MediaCache;
pub use errors::{AppError, Result};
