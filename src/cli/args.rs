//! Command-line argument parsing for the media range cache
//!
//! This module defines the CLI structure using clap derive macros, covering
//! byte-range fetches through the cache, prefetching, plan inspection and
//! cache maintenance.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::app::range::RangeRequest;

/// Media Range Cache - byte-range disk cache for streaming media
#[derive(Parser, Debug)]
#[command(
    name = "media_range_cache",
    version,
    about = "Serve byte ranges of remote media through a persistent disk cache",
    long_about = "Fetches byte ranges of remote media files over HTTP, keeping every downloaded range on disk.
Ranges already cached are served locally; only the missing gaps are requested from the origin."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Cache directory path
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch a byte range of a media URL through the cache
    Fetch(FetchArgs),

    /// Cache a whole media URL
    Prefetch(PrefetchArgs),

    /// Show how a byte range would be served, without fetching anything
    Plan(PlanArgs),

    /// Cache management and eviction
    Cache(CacheArgs),
}

/// Arguments for the fetch command
#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Media URL
    pub url: String,

    /// First byte to fetch
    #[arg(short, long, default_value = "0")]
    pub offset: u64,

    /// Number of bytes to fetch (default: to the end of the resource)
    #[arg(short, long)]
    pub length: Option<u64>,

    /// Write the fetched bytes to this file
    #[arg(short = 'O', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Cancel a download of the same URL already in progress
    #[arg(long)]
    pub supersede: bool,
}

/// Arguments for the prefetch command
#[derive(Args, Debug, Clone)]
pub struct PrefetchArgs {
    /// Media URL
    pub url: String,
}

/// Arguments for the plan command
#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    /// Media URL
    pub url: String,

    /// First byte of the range
    #[arg(short, long, default_value = "0")]
    pub offset: u64,

    /// Length of the range (default: to the end of the resource)
    #[arg(short, long)]
    pub length: Option<u64>,
}

/// Arguments for cache management
#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheCommand,
}

/// Cache management actions
#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Show cache statistics and information
    Info,

    /// Show total cache size
    Size,

    /// Remove every cached resource
    Clear {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Evict resources by age and size
    Sweep {
        /// Override the configured maximum age in seconds (negative = never expire)
        #[arg(long, allow_hyphen_values = true)]
        max_age_secs: Option<i64>,

        /// Override the configured maximum size in bytes (0 = unlimited)
        #[arg(long)]
        max_size: Option<u64>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level based on global arguments
    pub fn log_level(&self) -> tracing::Level {
        if self.global.quiet {
            tracing::Level::ERROR
        } else if self.global.very_verbose {
            tracing::Level::DEBUG
        } else if self.global.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        }
    }
}

fn range_request(offset: u64, length: Option<u64>) -> RangeRequest {
    match length {
        Some(length) => RangeRequest::new(offset, length),
        None => RangeRequest::to_end(offset),
    }
}

impl FetchArgs {
    /// Reject arguments that cannot describe a byte range
    pub fn validate(&self) -> Result<(), String> {
        if self.length == Some(0) {
            return Err("Length must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn range_request(&self) -> RangeRequest {
        range_request(self.offset, self.length)
    }
}

impl PlanArgs {
    pub fn range_request(&self) -> RangeRequest {
        range_request(self.offset, self.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetch_args() -> FetchArgs {
        FetchArgs {
            url: "https://example.com/movie.mp4".to_string(),
            offset: 0,
            length: None,
            output: None,
            supersede: false,
        }
    }

    #[test]
    fn test_fetch_args_validation() {
        let mut args = fetch_args();
        assert!(args.validate().is_ok());

        args.length = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_range_request_from_args() {
        let args = FetchArgs {
            offset: 100,
            length: Some(50),
            ..fetch_args()
        };
        assert_eq!(args.range_request(), RangeRequest::new(100, 50));

        let open = FetchArgs {
            offset: 100,
            ..fetch_args()
        };
        assert_eq!(open.range_request(), RangeRequest::to_end(100));
    }

    #[test]
    fn test_parse_cache_sweep() {
        let cli = Cli::try_parse_from([
            "media_range_cache",
            "cache",
            "sweep",
            "--max-age-secs",
            "-1",
            "--max-size",
            "1024",
        ])
        .unwrap();

        match cli.command {
            Commands::Cache(CacheArgs {
                action:
                    CacheCommand::Sweep {
                        max_age_secs,
                        max_size,
                    },
            }) => {
                assert_eq!(max_age_secs, Some(-1));
                assert_eq!(max_size, Some(1024));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_log_level() {
        let cli_quiet = Cli {
            global: GlobalArgs {
                verbose: false,
                very_verbose: false,
                quiet: true,
                config: None,
                cache_dir: None,
            },
            command: Commands::Cache(CacheArgs {
                action: CacheCommand::Info,
            }),
        };

        let cli_verbose = Cli {
            global: GlobalArgs {
                verbose: true,
                very_verbose: false,
                quiet: false,
                config: None,
                cache_dir: None,
            },
            command: Commands::Cache(CacheArgs {
                action: CacheCommand::Info,
            }),
        };

        assert_eq!(cli_quiet.log_level(), tracing::Level::ERROR);
        assert_eq!(cli_verbose.log_level(), tracing::Level::INFO);
    }
}
