//! Integration Tests for the Cache API
//!
//! Drives the public API end to end, background tasks included.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use bytecache::{Cache, CacheConfig, CacheError};
use bytes::Bytes;
use tokio::sync::watch;
use tokio_test::{assert_err, assert_ok};

// == Helper Functions ==

fn create_test_cache(config: CacheConfig) -> (watch::Sender<bool>, Cache) {
    let (tx, rx) = watch::channel(false);
    (tx, Cache::new(rx, config))
}

/// Polls `condition` until it holds or two seconds pass.
async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

// == Lookup Tests ==

#[tokio::test]
async fn test_get_missing_on_empty_cache() {
    let (_tx, cache) = create_test_cache(CacheConfig::default());

    let err = assert_err!(cache.get("missing"));
    assert_eq!(err, CacheError::NotFound("missing".to_string()));
    assert!(!cache.has("missing"));
}

#[tokio::test]
async fn test_put_get_roundtrip_and_overwrite() {
    let (_tx, cache) = create_test_cache(CacheConfig::default());

    cache.put("greeting", "hello");
    assert_eq!(assert_ok!(cache.get("greeting")), Bytes::from("hello"));

    cache.put("greeting", "hi");
    assert_eq!(assert_ok!(cache.get("greeting")), Bytes::from("hi"));
    assert_eq!(cache.size(), 2);
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_ttl_expires_lazily_before_background_passes() {
    let config = CacheConfig::default()
        .with_scan_interval(Duration::from_secs(3600))
        .with_clear_interval(Duration::from_secs(3600));
    let (_tx, cache) = create_test_cache(config);

    cache.put_with_ttl("session", "token", Duration::from_millis(50));
    assert_eq!(assert_ok!(cache.get("session")), Bytes::from("token"));
    assert!(cache.has("session"));

    tokio::time::sleep(Duration::from_millis(80)).await;

    assert_err!(cache.get("session"));
    assert!(!cache.has("session"));
    // Hidden from readers, but still waiting for the reaper
    assert!(cache.is_stored("session"));
}

#[tokio::test]
async fn test_lazily_expired_entry_is_reaped() {
    let config = CacheConfig::default()
        .with_clear_interval(Duration::from_millis(100))
        .with_scan_interval(Duration::from_secs(3600));
    let (_tx, cache) = create_test_cache(config);

    cache.put_with_ttl("foo", vec![0x10], Duration::from_millis(50));
    tokio::time::sleep(Duration::from_millis(60)).await;

    assert_err!(cache.get("foo"));

    assert!(eventually(|| !cache.is_stored("foo")).await);
    assert_eq!(cache.size(), 0);
    assert!(eventually(|| cache.stats().expired == 1).await);
}

#[tokio::test]
async fn test_unread_expired_entry_is_scanned_then_reaped() {
    let config = CacheConfig::default()
        .with_clear_interval(Duration::from_millis(100))
        .with_scan_interval(Duration::from_millis(100));
    let (_tx, cache) = create_test_cache(config);

    cache.put_with_ttl("foo", vec![0x10], Duration::from_millis(50));
    cache.put("keep", vec![0x20]);

    // At most one scan interval plus one clear interval after expiry
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(eventually(|| !cache.is_stored("foo")).await);
    assert!(cache.is_stored("keep"));
    assert!(cache.verify_size());
}

#[tokio::test]
async fn test_rewrite_before_reap_survives() {
    let config = CacheConfig::default()
        .with_clear_interval(Duration::from_millis(50))
        .with_scan_interval(Duration::from_secs(3600));
    let (_tx, cache) = create_test_cache(config);

    cache.put_with_ttl("foo", "old", Duration::ZERO);
    assert_err!(cache.get("foo"));
    cache.put("foo", "new");

    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(assert_ok!(cache.get("foo")), Bytes::from("new"));
}

// == Get Or Compute Tests ==

#[tokio::test]
async fn test_get_or_compute_calls_source_once() {
    let (_tx, cache) = create_test_cache(CacheConfig::default());
    let calls = AtomicUsize::new(0);

    for _ in 0..3 {
        let data = cache.get_or_compute("user:1", |key| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, anyhow::Error>(format!("loaded {key}"))
        });
        assert_eq!(assert_ok!(data), Bytes::from("loaded user:1"));
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_get_or_compute_propagates_source_error() {
    let (_tx, cache) = create_test_cache(CacheConfig::default());

    let err = assert_err!(cache.get_or_compute("user:2", |_| {
        Err::<Vec<u8>, _>(anyhow::anyhow!("database unavailable"))
    }));

    assert_eq!(err.to_string(), "database unavailable");
    assert!(!cache.is_stored("user:2"));
}

#[tokio::test]
async fn test_get_or_compute_with_ttl_refills_after_expiry() {
    let (_tx, cache) = create_test_cache(CacheConfig::default());
    let calls = AtomicUsize::new(0);
    let load = |_: &str| {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        Ok::<_, std::io::Error>(format!("v{n}"))
    };

    let first = assert_ok!(cache.get_or_compute_with_ttl("k", Duration::from_millis(50), load));
    assert_eq!(first, Bytes::from("v0"));

    tokio::time::sleep(Duration::from_millis(80)).await;

    let second = assert_ok!(cache.get_or_compute_with_ttl("k", Duration::from_millis(50), load));
    assert_eq!(second, Bytes::from("v1"));
}

#[tokio::test]
async fn test_get_or_compute_oversized_result_is_returned_not_cached() {
    let (_tx, cache) = create_test_cache(CacheConfig::default().with_size_limit(4));

    let data = assert_ok!(cache.get_or_compute("big", |_| Ok::<_, String>(vec![1u8; 4])));

    assert_eq!(data.len(), 4);
    assert!(!cache.is_stored("big"));
}

// == Size Budget Tests ==

#[tokio::test]
async fn test_compaction_converges_under_budget() {
    let (_tx, cache) = create_test_cache(CacheConfig::default().with_size_limit(64));

    for i in 0..32 {
        cache.put(format!("key{i}"), vec![i as u8; 8]);
        // Distinct last-used times so eviction order is well defined
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    assert!(eventually(|| cache.size() <= 64).await);
    assert!(cache.verify_size());
    assert!(cache.is_stored("key31"));
    assert!(!cache.is_stored("key0"));
}

#[tokio::test]
async fn test_compaction_keeps_recently_read_entries() {
    let (_tx, cache) = create_test_cache(CacheConfig::default().with_size_limit(30));

    for key in ["a", "b", "c"] {
        cache.put(key, vec![0u8; 9]);
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    assert_ok!(cache.get("a"));
    tokio::time::sleep(Duration::from_millis(2)).await;

    cache.put("d", vec![0u8; 9]);

    assert!(eventually(|| cache.size() < 30).await);
    assert!(cache.is_stored("a"));
    assert!(!cache.is_stored("b"));
    assert!(cache.is_stored("c"));
    assert!(cache.is_stored("d"));
}

#[tokio::test]
async fn test_concurrent_writers_keep_accounting_consistent() {
    let (_tx, cache) = create_test_cache(CacheConfig::default().with_size_limit(512));

    let writers: Vec<_> = (0..8)
        .map(|w| {
            let cache = cache.clone();
            std::thread::spawn(move || {
                for i in 0..200 {
                    let key = format!("w{w}:{}", i % 20);
                    match i % 4 {
                        0 => cache.delete(&key),
                        1 => cache.put_with_ttl(key, vec![w as u8; i % 16], Duration::from_millis(5)),
                        _ => cache.put(key, vec![w as u8; i % 32]),
                    }
                    let _ = cache.get(&format!("w{w}:{}", (i + 7) % 20));
                }
            })
        })
        .collect();

    for writer in writers {
        writer.join().unwrap();
    }

    assert!(eventually(|| cache.size() <= 512).await);
    assert!(cache.verify_size());
}

// == Lifecycle Tests ==

#[tokio::test]
async fn test_shutdown_stops_background_reaping() {
    let config = CacheConfig::default()
        .with_clear_interval(Duration::from_millis(20))
        .with_scan_interval(Duration::from_millis(20));
    let (tx, cache) = create_test_cache(config);

    tx.send(true).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    cache.put_with_ttl("foo", "bar", Duration::from_millis(10));
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Lazy expiry still applies, physical removal no longer happens
    assert_err!(cache.get("foo"));
    assert!(cache.is_stored("foo"));

    // The API keeps working after shutdown
    cache.put("after", "shutdown");
    assert_eq!(assert_ok!(cache.get("after")), Bytes::from("shutdown"));
}

#[tokio::test]
async fn test_stats_reflect_activity() {
    let (_tx, cache) = create_test_cache(CacheConfig::default().with_size_limit(8));

    cache.put("a", "1");
    cache.put("toolarge", vec![0u8; 8]);
    assert_ok!(cache.get("a"));
    assert_err!(cache.get("b"));

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.rejected, 1);
    assert_eq!(stats.total_entries, 1);
    assert_eq!(stats.total_size, 1);
    assert_eq!(stats.size_limit, 8);
    assert_eq!(stats.hit_rate(), 0.5);
}
