//! Cache-aside coordination over a shared key-value store.
//!
//! [`get_or_fetch`] wraps any fallible compute with a get-or-compute-and-
//! store policy: read the cache, return on an unexpired hit, otherwise
//! compute, write back on success, and return. A failed compute is
//! propagated without touching the cache so a transient outage can never
//! poison it with a negative result, and an unreachable cache store is
//! treated as a permanent miss rather than a failure.
//!
//! The store itself is behind the [`CacheStore`] trait so the storage
//! medium stays pluggable: the shipped backends are SQLite (the shared
//! store reachable by every instance) and an in-memory map for tests.
//! An entry is readable iff `now < stored_at + ttl`; expiry is passive
//! and read-triggered, there is no background eviction.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, warn};

/// Abstract shared key-value store with per-entry time-to-live.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read an entry; `None` for a missing or expired key.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write an entry, replacing any previous value under `key`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
}

/// Read-through, write-on-miss wrapper around a [`CacheStore`].
///
/// Two calls with the same key inside `ttl` run `compute` once; calls
/// straddling expiry run it again. Concurrent callers may both miss and
/// both fetch-and-store — a benign race, since both computed values are
/// equivalent for a given source state and the last writer wins.
pub async fn get_or_fetch<T, E, F, Fut>(
    store: &dyn CacheStore,
    key: &str,
    ttl: Duration,
    compute: F,
) -> Result<T, E>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    match store.get(key).await {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!(key, "cache hit");
                return Ok(value);
            }
            Err(err) => {
                warn!(key, error = %err, "cache entry failed to deserialize; refetching");
            }
        },
        Ok(None) => debug!(key, "cache miss"),
        Err(err) => {
            warn!(key, error = %err, "cache store unavailable; treating as miss");
        }
    }

    // A failed compute propagates without writing anything back.
    let value = compute().await?;

    match serde_json::to_string(&value) {
        Ok(raw) => {
            if let Err(err) = store.set(key, &raw, ttl).await {
                warn!(key, error = %err, "failed to write cache entry");
            }
        }
        Err(err) => warn!(key, error = %err, "failed to serialize cache value"),
    }

    Ok(value)
}

fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}

fn is_fresh(stored_at: i64, ttl_secs: i64, now: i64) -> bool {
    now < stored_at + ttl_secs
}

/// SQLite-backed cache store.
pub struct SqliteCacheStore {
    pool: SqlitePool,
}

impl SqliteCacheStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String, i64, i64)> =
            sqlx::query_as("SELECT value, stored_at, ttl_secs FROM cache_entries WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.and_then(|(value, stored_at, ttl_secs)| {
            is_fresh(stored_at, ttl_secs, now_ts()).then_some(value)
        }))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cache_entries (key, value, stored_at, ttl_secs) VALUES (?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                stored_at = excluded.stored_at,
                ttl_secs = excluded.ttl_secs
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(now_ts())
        .bind(ttl.as_secs() as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

struct MemoryEntry {
    value: String,
    stored_at: i64,
    ttl_secs: i64,
}

/// In-memory cache store for tests.
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries.get(key).and_then(|entry| {
            is_fresh(entry.stored_at, entry.ttl_secs, now_ts()).then(|| entry.value.clone())
        }))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                stored_at: now_ts(),
                ttl_secs: ttl.as_secs() as i64,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store whose every operation fails, for the unavailable-cache path.
    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            anyhow::bail!("store down")
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<()> {
            anyhow::bail!("store down")
        }
    }

    async fn counted_fetch(
        store: &dyn CacheStore,
        key: &str,
        ttl: Duration,
        calls: &AtomicUsize,
    ) -> Result<Vec<String>, String> {
        get_or_fetch(store, key, ttl, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec!["doc".to_string()])
        })
        .await
    }

    #[tokio::test]
    async fn test_second_call_within_ttl_hits_cache() {
        let store = MemoryCacheStore::new();
        let calls = AtomicUsize::new(0);

        let first = counted_fetch(&store, "k", Duration::from_secs(60), &calls).await;
        let second = counted_fetch(&store, "k", Duration::from_secs(60), &calls).await;

        assert_eq!(first.unwrap(), vec!["doc"]);
        assert_eq!(second.unwrap(), vec!["doc"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_recomputes() {
        let store = MemoryCacheStore::new();
        let calls = AtomicUsize::new(0);

        // ttl of zero means `now < stored_at + 0` is already false.
        counted_fetch(&store, "k", Duration::from_secs(0), &calls)
            .await
            .unwrap();
        counted_fetch(&store, "k", Duration::from_secs(0), &calls)
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_compute_is_not_cached() {
        let store = MemoryCacheStore::new();

        let failed: Result<Vec<String>, String> =
            get_or_fetch(&store, "k", Duration::from_secs(60), || async {
                Err("boom".to_string())
            })
            .await;
        assert_eq!(failed.unwrap_err(), "boom");

        // The failure wrote nothing, so the next call computes again.
        let calls = AtomicUsize::new(0);
        counted_fetch(&store, "k", Duration::from_secs(60), &calls)
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unavailable_store_falls_through_to_compute() {
        let store = BrokenStore;
        let calls = AtomicUsize::new(0);

        let result = counted_fetch(&store, "k", Duration::from_secs(60), &calls).await;
        assert_eq!(result.unwrap(), vec!["doc"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Still computes every time: the store never recovers here.
        counted_fetch(&store, "k", Duration::from_secs(60), &calls)
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_undecodable_entry_recomputes() {
        let store = MemoryCacheStore::new();
        store
            .set("k", "not json at all {", Duration::from_secs(60))
            .await
            .unwrap();

        let calls = AtomicUsize::new(0);
        let result = counted_fetch(&store, "k", Duration::from_secs(60), &calls).await;
        assert_eq!(result.unwrap(), vec!["doc"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
