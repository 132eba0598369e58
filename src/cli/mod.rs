//! Command-line interface components
//!
//! This module contains CLI-specific code for the media range cache,
//! including argument parsing, progress display, and command handlers.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{
    CacheArgs, CacheCommand, Cli, Commands, FetchArgs, GlobalArgs, PlanArgs, PrefetchArgs,
};
pub use commands::{handle_cache, handle_fetch, handle_plan, handle_prefetch};
pub use progress::{ProgressConfig, ProgressDisplay, ProgressEvent, ProgressSummary};
