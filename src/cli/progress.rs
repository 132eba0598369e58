//! Progress display for byte-range fetches
//!
//! This module renders fetch progress with indicatif: a byte bar when the
//! size of the requested window is known, a spinner otherwise. Bytes are
//! counted separately for the cache and the origin so the final summary
//! shows how much of a request the cache absorbed.
//!
//! # Examples
//!
//! ```rust,no_run
//! use media_range_cache::cli::{ProgressConfig, ProgressDisplay, ProgressEvent};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut display = ProgressDisplay::new(ProgressConfig::default());
//! display.start(Some(4096), "movie.mp4")?;
//!
//! display.update(ProgressEvent::Chunk { bytes: 1024, from_local: true });
//! display.update(ProgressEvent::Chunk { bytes: 3072, from_local: false });
//!
//! let summary = display.finish();
//! eprintln!("{}", summary);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::io::IsTerminal;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use crate::app::cache::format_bytes;
use crate::errors::{DownloadError, DownloadResult};

/// Configuration for progress display
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Enable visual progress bars
    pub enable_progress_bars: bool,
    /// Show transfer rate in the progress bar
    pub show_download_rate: bool,
    /// Show ETA in the progress bar
    pub show_eta: bool,
    /// Spinner tick interval
    pub tick_interval: Duration,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enable_progress_bars: true,
            show_download_rate: true,
            show_eta: true,
            tick_interval: Duration::from_millis(120),
        }
    }
}

/// Events that can update the progress display
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Bytes delivered to the consumer
    Chunk { bytes: u64, from_local: bool },
    /// The size of the fetched window became known
    TotalKnown { bytes: u64 },
}

/// Byte counts of a finished fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressSummary {
    pub local_bytes: u64,
    pub remote_bytes: u64,
    pub duration: Duration,
}

impl ProgressSummary {
    pub fn total_bytes(&self) -> u64 {
        self.local_bytes + self.remote_bytes
    }

    /// Share of delivered bytes served from the cache, in percent
    pub fn hit_ratio(&self) -> f64 {
        match self.total_bytes() {
            0 => 0.0,
            total => self.local_bytes as f64 / total as f64 * 100.0,
        }
    }
}

impl fmt::Display for ProgressSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in {:.2}s ({} from cache, {} from origin, {:.1}% cached)",
            format_bytes(self.total_bytes()),
            self.duration.as_secs_f64(),
            format_bytes(self.local_bytes),
            format_bytes(self.remote_bytes),
            self.hit_ratio()
        )
    }
}

/// Progress display for one fetch
pub struct ProgressDisplay {
    config: ProgressConfig,
    bar: Option<ProgressBar>,
    summary: ProgressSummary,
    started: Instant,
    is_terminal: bool,
}

impl ProgressDisplay {
    /// Create a new progress display with the given configuration
    pub fn new(config: ProgressConfig) -> Self {
        Self {
            config,
            bar: None,
            summary: ProgressSummary::default(),
            started: Instant::now(),
            is_terminal: std::io::stderr().is_terminal(),
        }
    }

    fn bar_template(&self) -> &'static str {
        if self.config.show_eta && self.config.show_download_rate {
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {bytes_per_sec} {msg}"
        } else if self.config.show_eta {
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {msg}"
        } else if self.config.show_download_rate {
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {bytes_per_sec} {msg}"
        } else {
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}"
        }
    }

    /// Start displaying a fetch of `total` bytes, or of unknown size
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::ConfigurationError` if a bar template is invalid
    pub fn start(&mut self, total: Option<u64>, label: &str) -> DownloadResult<()> {
        self.started = Instant::now();
        self.summary = ProgressSummary::default();

        if !self.config.enable_progress_bars || !self.is_terminal {
            eprintln!("Fetching {}...", label);
            return Ok(());
        }

        let bar = match total {
            Some(total) => {
                let bar = ProgressBar::new(total);
                bar.set_style(
                    ProgressStyle::default_bar()
                        .template(self.bar_template())
                        .map_err(template_error)?
                        .progress_chars("##-"),
                );
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::default_spinner()
                        .template("{spinner:.green} [{elapsed_precise}] {bytes} {bytes_per_sec} {msg}")
                        .map_err(template_error)?
                        .tick_strings(&["◐", "◓", "◑", "◒"]),
                );
                bar
            }
        };
        bar.set_message(label.to_string());
        bar.enable_steady_tick(self.config.tick_interval);
        self.bar = Some(bar);

        debug!("Progress display started for {} ({:?} bytes)", label, total);
        Ok(())
    }

    /// Update the progress display with an event
    pub fn update(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::Chunk { bytes, from_local } => {
                if from_local {
                    self.summary.local_bytes += bytes;
                } else {
                    self.summary.remote_bytes += bytes;
                }
                if let Some(bar) = &self.bar {
                    bar.inc(bytes);
                }
            }
            ProgressEvent::TotalKnown { bytes } => {
                if let Some(bar) = &self.bar {
                    bar.set_length(bytes);
                }
            }
        }
    }

    /// Current byte counts
    pub fn summary(&self) -> ProgressSummary {
        ProgressSummary {
            duration: self.started.elapsed(),
            ..self.summary.clone()
        }
    }

    /// Finish the progress display and return the final counts
    pub fn finish(&mut self) -> ProgressSummary {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
        self.summary()
    }

    /// Abandon the progress display after a failure
    pub fn abandon(&mut self, message: &str) -> ProgressSummary {
        if let Some(bar) = self.bar.take() {
            bar.abandon_with_message(message.to_string());
        }
        self.summary()
    }
}

impl Drop for ProgressDisplay {
    fn drop(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

fn template_error(e: indicatif::style::TemplateError) -> DownloadError {
    DownloadError::ConfigurationError(format!("Progress bar template error: {}", e))
}
