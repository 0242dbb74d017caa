//! Bounded query cache for `RagTool`.
//!
//! Thread-safe in-memory LRU keyed by query string. Every `get` hit and
//! `put` stamps the entry with a monotonically increasing access counter;
//! when the cache is full the entry with the smallest stamp is evicted.

use std::collections::HashMap;

use parking_lot::Mutex;

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug)]
struct Entry {
    value: String,
    last_access: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    clock: u64,
    stats: CacheStats,
}

impl Inner {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

/// LRU cache of query answers.
#[derive(Debug)]
pub struct QueryCache {
    max_size: usize,
    inner: Mutex<Inner>,
}

impl QueryCache {
    /// Create a cache holding at most `max_size` entries (at least one).
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size: max_size.max(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Look up a cached answer, refreshing its recency.
    pub fn get(&self, key: &str) -> Option<String> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let stamp = inner.tick();
        match inner.entries.get_mut(key) {
            Some(entry) => {
                entry.last_access = stamp;
                let value = entry.value.clone();
                inner.stats.hits += 1;
                Some(value)
            }
            None => {
                inner.stats.misses += 1;
                None
            }
        }
    }

    /// Store an answer, evicting the least recently used entry when full.
    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let mut inner = self.inner.lock();
        let stamp = inner.tick();

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.max_size {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_access)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                inner.entries.remove(&oldest);
            }
        }
        inner.entries.insert(
            key,
            Entry {
                value: value.into(),
                last_access: stamp,
            },
        );
    }

    /// Drop every entry. Statistics are kept.
    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(128)
    }
}
