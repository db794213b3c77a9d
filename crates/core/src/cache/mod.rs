use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Process-wide cache whose entries expire a fixed time after they were stored.
///
/// Values are cloned out, and an insert replaces the whole entry, so readers never observe a
/// partially refreshed value. The lock is never held across an await.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
}

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    cached_at: Instant,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.get_at(key, Instant::now())
    }

    pub fn insert(&self, key: K, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    /// Number of stored entries, expired ones included until they are next read.
    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().map(|g| g.len()).unwrap_or(0)
    }

    fn get_at<Q>(&self, key: &Q, now: Instant) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let mut guard = self.entries.lock().ok()?;
        let entry = guard.get(key)?;
        if now.saturating_duration_since(entry.cached_at) < self.ttl {
            return Some(entry.value.clone());
        }
        guard.remove(key);
        None
    }

    fn insert_at(&self, key: K, value: V, now: Instant) {
        if let Ok(mut guard) = self.entries.lock() {
            guard.insert(
                key,
                CacheEntry {
                    value,
                    cached_at: now,
                },
            );
        }
    }
}
