//! Expiring cache with singleflight production (§4.2), grounded on the
//! teacher's `TtlCache` (`DashMap<K, (V, Instant)>`) but extended with:
//!
//! - a singleflight slot per key so concurrent misses share one production
//!   (§8 property 2),
//! - an optional file fingerprint (mtime + size) that invalidates an entry
//!   regardless of TTL when the backing file changes (§8 property 3).
//!
//! The map lock (a `DashMap` shard lock) is only ever held for the lookup/
//! insert itself; the `produce` future always runs outside it, guarded
//! instead by a per-key `tokio::sync::Mutex` that doubles as the
//! singleflight waiter list.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use dashmap::DashMap;
use tokio::sync::Mutex as AsyncMutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFingerprint {
    pub modified: SystemTime,
    pub size: u64,
}

impl FileFingerprint {
    pub fn of(path: &std::path::Path) -> std::io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        Ok(Self {
            modified: meta.modified()?,
            size: meta.len(),
        })
    }
}

struct CacheEntry<V> {
    value: V,
    produced_at: Instant,
    ttl: Duration,
    access_count: u64,
    file_fingerprint: Option<FileFingerprint>,
    source_file: Option<std::path::PathBuf>,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.produced_at) <= self.ttl
    }
}

/// What a producer computed, plus the optional file path it was sourced
/// from (re-checked on every subsequent read for mtime/size drift).
pub struct Produced<V> {
    pub value: V,
    pub ttl: Duration,
    pub source_file: Option<std::path::PathBuf>,
}

impl<V> Produced<V> {
    pub fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            ttl,
            source_file: None,
        }
    }

    pub fn file_backed(value: V, ttl: Duration, path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            value,
            ttl,
            source_file: Some(path.into()),
        }
    }
}

/// Thread-safe, singleflight, TTL-expiring cache.
pub struct SingleflightCache<K, V> {
    entries: DashMap<K, CacheEntry<V>>,
    locks: DashMap<K, Arc<AsyncMutex<()>>>,
}

impl<K, V> Default for SingleflightCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> SingleflightCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            locks: DashMap::new(),
        }
    }

    /// Validity check per §3 Cache Entry invariant: fresh by TTL, and (for
    /// file-backed entries) the source file's mtime/size unchanged.
    fn valid_entry(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let mut entry = self.entries.get_mut(key)?;
        if !entry.is_fresh(now) {
            return None;
        }
        if let Some(fp) = &entry.file_fingerprint {
            let path = entry.source_file.as_ref()?;
            match FileFingerprint::of(path) {
                Ok(current) if &current == fp => {}
                _ => return None,
            }
        }
        entry.access_count += 1;
        Some(entry.value.clone())
    }

    /// `get(key, produce)`: returns a cached value if valid; otherwise runs
    /// `produce` with at most one concurrent execution per key, caches the
    /// result on success, and returns it. A failed production is never
    /// cached so the next caller retries.
    pub async fn get<F, Fut, E>(&self, key: K, produce: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Produced<V>, E>>,
    {
        if let Some(v) = self.valid_entry(&key) {
            return Ok(v);
        }

        let key_lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();

        let _guard = key_lock.lock().await;

        // Re-check: another caller may have produced while we waited.
        if let Some(v) = self.valid_entry(&key) {
            return Ok(v);
        }

        let produced = produce().await?;
        let file_fingerprint = match &produced.source_file {
            Some(path) => FileFingerprint::of(path).ok(),
            None => None,
        };

        self.entries.insert(
            key,
            CacheEntry {
                value: produced.value.clone(),
                produced_at: Instant::now(),
                ttl: produced.ttl,
                access_count: 0,
                file_fingerprint,
                source_file: produced.source_file.clone(),
            },
        );

        Ok(produced.value)
    }

    pub fn invalidate(&self, key: &K) {
        self.entries.remove(key);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Periodic sweeper: evict entries whose TTL has lapsed. Called from a
    /// background task on an interval; does not touch singleflight locks
    /// (a lock with no entry is harmless and is reclaimed lazily).
    pub fn evict_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.is_fresh(now));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> fmt::Debug for SingleflightCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleflightCache")
            .field("len", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn cache_hit_returns_without_reproducing() {
        let cache: SingleflightCache<&str, u32> = SingleflightCache::new();
        let calls = AtomicUsize::new(0);

        let v1 = cache
            .get("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ()>(Produced::new(1, Duration::from_secs(60)))
            })
            .await
            .unwrap();
        let v2 = cache
            .get("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ()>(Produced::new(2, Duration::from_secs(60)))
            })
            .await
            .unwrap();

        assert_eq!(v1, 1);
        assert_eq!(v2, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_is_reproduced() {
        let cache: SingleflightCache<&str, u32> = SingleflightCache::new();
        cache
            .get("k", || async { Ok::<_, ()>(Produced::new(1, Duration::from_millis(10))) })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        let v = cache
            .get("k", || async { Ok::<_, ()>(Produced::new(2, Duration::from_secs(60))) })
            .await
            .unwrap();
        assert_eq!(v, 2);
    }

    #[tokio::test]
    async fn failed_production_is_not_cached_and_retries() {
        let cache: SingleflightCache<&str, u32> = SingleflightCache::new();
        let first = cache
            .get("k", || async { Err::<Produced<u32>, &str>("boom") })
            .await;
        assert!(first.is_err());
        let second = cache
            .get("k", || async { Ok::<_, &str>(Produced::new(7, Duration::from_secs(60))) })
            .await
            .unwrap();
        assert_eq!(second, 7);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_production() {
        let cache: Arc<SingleflightCache<&str, u32>> = Arc::new(SingleflightCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get("k", || {
                        let calls = calls.clone();
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok::<_, ()>(Produced::new(42, Duration::from_secs(60)))
                        }
                    })
                    .await
                    .unwrap()
            }));
        }

        for h in handles {
            assert_eq!(h.await.unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn file_backed_entry_invalidates_on_mtime_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.txt");
        {
            let mut f = std::fs::File::create(&path).unwrap();
            writeln!(f, "v1").unwrap();
        }

        let cache: SingleflightCache<&str, String> = SingleflightCache::new();
        let path_clone = path.clone();
        let v1 = cache
            .get("k", || {
                let path = path_clone.clone();
                async move {
                    let content = std::fs::read_to_string(&path).unwrap();
                    Ok::<_, ()>(Produced::file_backed(content, Duration::from_secs(60), path))
                }
            })
            .await
            .unwrap();
        assert_eq!(v1.trim(), "v1");

        tokio::time::sleep(Duration::from_millis(10)).await;
        {
            let mut f = std::fs::File::create(&path).unwrap();
            writeln!(f, "v2").unwrap();
        }

        let path_clone = path.clone();
        let v2 = cache
            .get("k", || {
                let path = path_clone.clone();
                async move {
                    let content = std::fs::read_to_string(&path).unwrap();
                    Ok::<_, ()>(Produced::file_backed(content, Duration::from_secs(60), path))
                }
            })
            .await
            .unwrap();
        assert_eq!(v2.trim(), "v2");
    }
}
