//! Command handlers for the media range cache CLI
//!
//! This module implements the command handlers that connect CLI arguments
//! to the media cache: fetching and prefetching through the cache,
//! printing action plans, and cache maintenance.

use std::io::{self, Write};
use std::path::PathBuf;

use futures::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::app::action::ActionKind;
use crate::app::cache::{format_bytes, CacheConfig};
use crate::app::client::ClientConfig;
use crate::app::loader::MediaCache;
use crate::app::orchestrator::{DownloadStream, OrchestratorConfig};
use crate::app::range::ByteRange;
use crate::cli::{
    CacheArgs, CacheCommand, FetchArgs, GlobalArgs, PlanArgs, PrefetchArgs, ProgressConfig,
    ProgressDisplay, ProgressEvent, ProgressSummary,
};
use crate::config::AppConfig;
use crate::errors::{AppError, Result};

/// Runtime configuration resolved from the config file and global flags
async fn load_runtime_config(
    global: &GlobalArgs,
) -> Result<(CacheConfig, ClientConfig, OrchestratorConfig)> {
    if global.config.is_none() {
        if let Err(e) = AppConfig::initialize_first_run().await {
            warn!("Could not create default configuration: {}", e);
        }
    }

    let app_config = AppConfig::load(global.config.clone()).await?;
    let (mut cache_config, client_config, orchestrator_config) = app_config.to_runtime_config();
    if let Some(cache_dir) = &global.cache_dir {
        cache_config.cache_root = Some(cache_dir.clone());
    }
    Ok((cache_config, client_config, orchestrator_config))
}

async fn open_media_cache(global: &GlobalArgs) -> Result<MediaCache> {
    let (cache_config, client_config, orchestrator_config) = load_runtime_config(global).await?;
    MediaCache::new(cache_config, &client_config, orchestrator_config).await
}

/// Where fetched bytes go
async fn open_sink(output: Option<&PathBuf>) -> Result<Option<Box<dyn AsyncWrite + Unpin + Send>>> {
    match output {
        None => Ok(None),
        Some(path) if path.as_os_str() == "-" => Ok(Some(Box::new(tokio::io::stdout()))),
        Some(path) => {
            let file = tokio::fs::File::create(path).await.map_err(|e| {
                AppError::generic(format!("Failed to create {}: {}", path.display(), e))
            })?;
            Ok(Some(Box::new(file)))
        }
    }
}

/// Bar length to apply once the resource length becomes known
///
/// Bounded windows keep the length the bar started with.
fn learned_total(window: ByteRange, content_length: u64) -> Option<u64> {
    window
        .is_open_ended()
        .then(|| content_length.saturating_sub(window.start))
}

/// Drive `stream` to completion, feeding the progress display and the sink
///
/// Ctrl-C cancels the download; the stream then ends quietly.
async fn drain_stream(
    mut stream: DownloadStream,
    media_cache: &MediaCache,
    url: &str,
    window: ByteRange,
    progress: &mut ProgressDisplay,
    mut sink: Option<Box<dyn AsyncWrite + Unpin + Send>>,
) -> Result<ProgressSummary> {
    let mut total_known = !window.is_open_ended();

    loop {
        let item = tokio::select! {
            item = stream.next() => item,
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, cancelling download of {}", url);
                stream.cancel();
                continue;
            }
        };
        let Some(item) = item else {
            break;
        };

        let chunk = match item {
            Ok(chunk) => chunk,
            Err(e) => {
                progress.abandon("failed");
                return Err(e.into());
            }
        };

        if !total_known {
            if let Some(bytes) = media_cache
                .descriptor(url)
                .await?
                .and_then(|d| d.content_length)
                .and_then(|length| learned_total(window, length))
            {
                progress.update(ProgressEvent::TotalKnown { bytes });
                total_known = true;
            }
        }

        if let Some(sink) = sink.as_mut() {
            sink.write_all(&chunk.data).await?;
        }
        progress.update(ProgressEvent::Chunk {
            bytes: chunk.data.len() as u64,
            from_local: chunk.from_local,
        });
    }

    if let Some(sink) = sink.as_mut() {
        sink.flush().await?;
    }
    Ok(progress.finish())
}

/// Handle the fetch command
pub async fn handle_fetch(global: &GlobalArgs, args: FetchArgs) -> Result<()> {
    args.validate().map_err(AppError::generic)?;
    let media_cache = open_media_cache(global).await?;
    let request = args.range_request();

    let (window, actions) = media_cache.plan(&args.url, request).await?;
    debug!("Planned {} actions for {}", actions.len(), window);

    let stream = if args.supersede {
        media_cache.load_superseding(&args.url, request)?
    } else {
        media_cache.plan_and_execute(&args.url, request)?
    };

    let mut progress = ProgressDisplay::new(ProgressConfig {
        enable_progress_bars: !global.quiet,
        ..Default::default()
    });
    let total = (!window.is_open_ended()).then(|| window.len());
    progress.start(total, &args.url)?;

    let sink = open_sink(args.output.as_ref()).await?;
    let summary = drain_stream(stream, &media_cache, &args.url, window, &mut progress, sink).await?;

    info!("Fetched {} of {}", summary, args.url);
    if !global.quiet {
        eprintln!("✅ Fetched {}", summary);
    }
    Ok(())
}

/// Handle the prefetch command
pub async fn handle_prefetch(global: &GlobalArgs, args: PrefetchArgs) -> Result<()> {
    let media_cache = open_media_cache(global).await?;
    let stream = media_cache.prefetch(&args.url)?;

    let mut progress = ProgressDisplay::new(ProgressConfig {
        enable_progress_bars: !global.quiet,
        ..Default::default()
    });
    let total = media_cache
        .descriptor(&args.url)
        .await?
        .and_then(|d| d.content_length);
    progress.start(total, &args.url)?;

    let summary = drain_stream(
        stream,
        &media_cache,
        &args.url,
        ByteRange::to_end(0),
        &mut progress,
        None,
    )
    .await?;

    if !global.quiet {
        eprintln!("✅ Cached {}", summary);
    }
    Ok(())
}

/// Handle the plan command
pub async fn handle_plan(global: &GlobalArgs, args: PlanArgs) -> Result<()> {
    let media_cache = open_media_cache(global).await?;
    let (window, actions) = media_cache.plan(&args.url, args.range_request()).await?;

    println!("📋 Plan for {}", args.url);
    println!("==============");
    match media_cache.descriptor(&args.url).await? {
        Some(descriptor) => {
            println!(
                "Content length: {}",
                descriptor
                    .content_length
                    .map(format_bytes)
                    .unwrap_or_else(|| "unknown".to_string())
            );
            println!(
                "Content type: {}",
                descriptor.content_type.as_deref().unwrap_or("unknown")
            );
            println!("Byte ranges: {}", descriptor.byte_range_supported);
        }
        None => println!("Not seen before"),
    }
    println!("Window: {}", window);
    println!();

    if actions.is_empty() {
        println!("Nothing to fetch");
    }
    for action in &actions {
        let source = match action.kind {
            ActionKind::Local => "💾 cache ",
            ActionKind::Remote => "🌐 origin",
        };
        let size = if action.range.is_open_ended() {
            "to end".to_string()
        } else {
            format_bytes(action.range.len())
        };
        println!("{} {} ({})", source, action.range, size);
    }

    Ok(())
}

/// Handle cache management commands
pub async fn handle_cache(global: &GlobalArgs, args: CacheArgs) -> Result<()> {
    match args.action {
        CacheCommand::Info => handle_cache_info(global).await,
        CacheCommand::Size => handle_cache_size(global).await,
        CacheCommand::Clear { yes } => handle_cache_clear(global, yes).await,
        CacheCommand::Sweep {
            max_age_secs,
            max_size,
        } => handle_cache_sweep(global, max_age_secs, max_size).await,
    }
}

/// Handle cache info display
async fn handle_cache_info(global: &GlobalArgs) -> Result<()> {
    let media_cache = open_media_cache(global).await?;
    let stats = media_cache.stats().await?;

    println!("💾 Cache Information");
    println!("===================");
    println!("Location: {}", stats.cache_root.display());
    println!("Cached resources: {}", stats.entry_count);
    println!("Cache size: {}", stats.format_cache_size());
    println!("Size limit: {}", stats.format_max_cache_size());
    if let Some(usage) = stats.usage_percentage() {
        println!("Usage: {:.1}%", usage);
    }
    match media_cache.cache().config().max_cache_age {
        Some(age) => println!("Maximum age: {}s", age.as_secs()),
        None => println!("Maximum age: never expires"),
    }
    if stats.is_over_limit() {
        println!("⚠️  Cache is over its size limit. Run 'media_range_cache cache sweep'.");
    }

    Ok(())
}

async fn handle_cache_size(global: &GlobalArgs) -> Result<()> {
    let media_cache = open_media_cache(global).await?;
    let size = media_cache.calculate_total_cache_size().await?;
    println!("{} ({} bytes)", format_bytes(size), size);
    Ok(())
}

/// Handle full cache wipe
async fn handle_cache_clear(global: &GlobalArgs, yes: bool) -> Result<()> {
    let media_cache = open_media_cache(global).await?;
    let size = media_cache.calculate_total_cache_size().await?;

    println!("🧹 Cache Cleanup");
    println!("===============");

    if !yes {
        print!(
            "⚠️  This will remove ALL cached media ({}). Continue? [y/N] ",
            format_bytes(size)
        );
        io::stdout().flush()?;

        let mut answer = String::new();
        io::stdin().read_line(&mut answer)?;
        if !matches!(answer.trim(), "y" | "Y" | "yes") {
            println!("Aborted.");
            return Ok(());
        }
    }

    media_cache.clear_all().await?;
    println!("🗑️  Removed {}", format_bytes(size));
    Ok(())
}

/// Handle age and size eviction
async fn handle_cache_sweep(
    global: &GlobalArgs,
    max_age_secs: Option<i64>,
    max_size: Option<u64>,
) -> Result<()> {
    let (mut cache_config, client_config, orchestrator_config) =
        load_runtime_config(global).await?;
    if let Some(secs) = max_age_secs {
        cache_config = cache_config.with_max_cache_age_secs(secs);
    }
    if let Some(size) = max_size {
        cache_config = cache_config.with_max_cache_size(size);
    }
    let media_cache = MediaCache::new(cache_config, &client_config, orchestrator_config).await?;

    let report = media_cache.sweep().await?;

    println!("🧹 Cache Sweep");
    println!("=============");
    println!("Removed entries: {}", report.removed.len());
    println!("Freed: {}", format_bytes(report.bytes_freed));
    println!(
        "Size: {} → {}",
        format_bytes(report.size_before),
        format_bytes(report.size_after)
    );
    if global.verbose || global.very_verbose {
        for key in &report.removed {
            println!("  - {}", key);
        }
    }

    Ok(())
}
