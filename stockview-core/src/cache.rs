//! In-memory TTL cache for query results.
//!
//! Entries expire lazily: an expired entry stays in the map until the next
//! `get` for its key removes it. There is no size bound and no background
//! sweep.
//!
//! `get` returns `Option<V>`, so an empty list or a zero is a cached value,
//! not a miss.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    /// `None` when the TTL is too large to represent: the entry never expires.
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now <= at)
    }
}

/// Thread-safe expiring key→value store.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    default_ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Value for `key` if present and not expired.
    ///
    /// An entry is visible while `now <= expires_at`; an expired entry is
    /// removed by this call.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            None => return None,
            Some(entry) if entry.is_live(Instant::now()) => {
                return Some(entry.value.clone());
            }
            Some(_) => {}
        }
        entries.remove(key);
        None
    }

    /// Store `value` under `key`, overwriting any previous entry. Expiry is
    /// measured from this call.
    pub fn set(&self, key: K, value: V, ttl: Duration) {
        let entry = Entry {
            value,
            expires_at: Instant::now().checked_add(ttl),
        };
        self.entries.lock().insert(key, entry);
    }

    /// [`set`](Self::set) with the cache's default TTL.
    pub fn insert(&self, key: K, value: V) {
        self.set(key, value, self.default_ttl);
    }

    /// Drop one entry.
    pub fn invalidate(&self, key: &K) {
        self.entries.lock().remove(key);
    }

    /// Drop every entry.
    pub fn invalidate_all(&self) {
        self.entries.lock().clear();
    }

    /// Entries currently held, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
