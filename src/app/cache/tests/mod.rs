//! Scenario tests for the cache module
//!
//! These tests drive the manager, the eviction engine and the range store
//! together against a real temporary directory.

use std::time::{Duration, SystemTime};

use chrono::Utc;
use tempfile::TempDir;

use crate::app::cache::{CacheConfig, CacheManager, EvictionEngine, SweepPolicy};
use crate::app::events::CacheEvent;
use crate::app::range::ByteRange;

async fn create_test_manager(config: CacheConfig) -> (CacheManager, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let config = CacheConfig {
        cache_root: Some(temp_dir.path().to_path_buf()),
        ..config
    };
    (CacheManager::new(config).await.unwrap(), temp_dir)
}

/// Write `size` cached bytes for `url` and backdate them by `age`
async fn create_cached_resource(manager: &CacheManager, url: &str, size: usize, age: Duration) {
    let mut resource = manager.open_resource(url).await.unwrap();
    resource.write_at(0, &vec![1u8; size]).await.unwrap();
    resource
        .mark_cached(ByteRange::new(0, size as u64))
        .await
        .unwrap();

    let when = SystemTime::now() - age;
    for path in [&resource.paths().data, &resource.paths().range_index] {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_times(
            std::fs::FileTimes::new()
                .set_accessed(when)
                .set_modified(when),
        )
        .unwrap();
    }
}

#[tokio::test]
async fn test_zero_max_age_expires_everything() {
    let (manager, _temp_dir) =
        create_test_manager(CacheConfig::default().with_max_cache_age_secs(0)).await;
    let mut events = manager.subscribe();
    create_cached_resource(&manager, "https://example.com/a.mp4", 10, Duration::ZERO).await;

    let key = manager.resource_paths("https://example.com/a.mp4").dir;
    let report = manager.sweep().await.unwrap();

    assert_eq!(report.removed.len(), 1);
    assert_eq!(
        Some(report.removed[0].as_str()),
        key.file_name().and_then(|n| n.to_str())
    );
    assert!(!key.exists());

    match events.recv().await.unwrap() {
        CacheEvent::Cleaned { resource_ids } => assert_eq!(resource_ids, report.removed),
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_sweep_respects_size_bound() {
    let (manager, temp_dir) = create_test_manager(
        CacheConfig::default()
            .with_max_cache_age(None)
            .with_max_cache_size(4096),
    )
    .await;

    for i in 0..8u64 {
        let url = format!("https://example.com/segment-{}.ts", i);
        create_cached_resource(&manager, &url, 1000, Duration::from_secs(100 - i)).await;
    }

    let before = manager.calculate_total_cache_size().await.unwrap();
    assert!(before > 4096);

    let report = manager.sweep().await.unwrap();
    let after = manager.calculate_total_cache_size().await.unwrap();
    assert!(after <= 4096 / 2, "usage {} above half the limit", after);
    assert_eq!(report.size_after, after);

    // Oldest segments go first
    let oldest = manager.resource_paths("https://example.com/segment-0.ts");
    let newest = manager.resource_paths("https://example.com/segment-7.ts");
    assert!(!oldest.dir.exists());
    assert!(newest.dir.exists());
    drop(temp_dir);
}

#[tokio::test]
async fn test_sweep_enumeration_failure_deletes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let not_a_dir = temp_dir.path().join("file");
    std::fs::write(&not_a_dir, b"x").unwrap();

    let policy = SweepPolicy {
        max_age: Some(Duration::ZERO),
        max_size: 1,
    };
    let result = EvictionEngine::sweep(&not_a_dir, policy, Utc::now()).await;
    assert!(result.is_err());
    assert!(not_a_dir.exists());
}

#[tokio::test]
async fn test_lost_data_tail_is_not_reported_cached() {
    let (manager, _temp_dir) = create_test_manager(CacheConfig::default()).await;
    let url = "https://example.com/podcast.mp3";
    create_cached_resource(&manager, url, 500, Duration::ZERO).await;

    // Simulate a crash that lost the end of the data file
    let paths = manager.resource_paths(url);
    let file = std::fs::File::options()
        .write(true)
        .open(&paths.data)
        .unwrap();
    file.set_len(200).unwrap();

    let resource = manager.open_resource(url).await.unwrap();
    assert!(resource.cached_ranges().covers(&ByteRange::new(0, 200)));
    assert!(!resource.cached_ranges().covers(&ByteRange::new(0, 201)));
}
