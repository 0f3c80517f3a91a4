//! Concurrent memoization.
//!
//! [`InMemoryLoadingCache`] computes the value for each distinct key exactly
//! once, even when several threads miss on the same key at the same time.
//! The map shard lock is only held while the per-key cell is looked up, never
//! while the value is computed, so a loader may consult other caches (or this
//! one, for a different key) without deadlocking.

use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;

/// A thread-safe compute-if-absent cache.
pub struct InMemoryLoadingCache<K, V>
where
    K: Eq + Hash,
{
    name: &'static str,
    entries: DashMap<K, Arc<OnceCell<V>>>,
    misses: AtomicU64,
}

impl<K, V> InMemoryLoadingCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Create an empty cache. The name only shows up in logs.
    pub fn new(name: &'static str) -> Self {
        InMemoryLoadingCache {
            name,
            entries: DashMap::new(),
            misses: AtomicU64::new(0),
        }
    }

    /// Get the cached value for `key`, computing it with `load` on a miss.
    pub fn get(&self, key: K, load: impl FnOnce() -> V) -> V {
        let existing = self.entries.get(&key).map(|cell| Arc::clone(cell.value()));
        let cell = match existing {
            Some(cell) => cell,
            None => Arc::clone(self.entries.entry(key).or_default().value()),
        };

        cell.get_or_init(|| {
            self.misses.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(cache = self.name, "computing cache entry");
            load()
        })
        .clone()
    }

    /// Number of keys with an entry (computed or being computed).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of times a loader actually ran.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_hit_does_not_recompute() {
        let cache = InMemoryLoadingCache::new("test");
        assert_eq!(cache.get("a", || 1), 1);
        assert_eq!(cache.get("a", || 2), 1);
        assert_eq!(cache.get("b", || 3), 3);
        assert_eq!(cache.misses(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_concurrent_miss_computes_once() {
        let cache: Arc<InMemoryLoadingCache<u32, u32>> =
            Arc::new(InMemoryLoadingCache::new("concurrent"));
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                std::thread::spawn(move || {
                    cache.get(7, || {
                        calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                        std::thread::sleep(std::time::Duration::from_millis(20));
                        42
                    })
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 42);
        }
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_loader_may_use_same_cache() {
        let cache: InMemoryLoadingCache<u32, u32> = InMemoryLoadingCache::new("nested");
        let value = cache.get(1, || cache.get(2, || 10) + 1);
        assert_eq!(value, 11);
    }
}
