//! A key/value cache bounded by entry count and entry age.
//!
//! Insertion order is tracked in a separate deque of `(key, timestamp)`
//! records, kept sorted by timestamp. Inserting and pruning are O(1);
//! removing a specific key is O(n) over the order records.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// Generic cache with two independent eviction policies, usable together:
/// a maximum entry count (least-recently-inserted out first) and a
/// time-to-live enforced by [`RateLimitedCache::prune_at`].
#[derive(Debug)]
pub struct RateLimitedCache<K, V> {
    store: HashMap<K, V>,
    order: VecDeque<(K, i64)>,
    limit: Option<usize>,
    ttl_secs: i64,
}

impl<K: Eq + Hash + Clone, V> RateLimitedCache<K, V> {
    /// `limit` of `None` means unbounded; `ttl_secs` of 0 makes `prune`
    /// remove every entry whose timestamp has passed at all.
    pub fn new(limit: Option<usize>, ttl_secs: i64) -> Self {
        Self {
            store: HashMap::new(),
            order: VecDeque::new(),
            limit,
            ttl_secs,
        }
    }

    /// Insert at an explicit timestamp (Unix seconds). Re-inserting an
    /// existing key refreshes its timestamp: the stale order record is
    /// dropped so eviction order stays consistent.
    pub fn insert_at(&mut self, key: K, value: V, now: i64) {
        if self.store.contains_key(&key) {
            self.remove(&key);
        }
        self.order.push_back((key.clone(), now));
        self.store.insert(key, value);
        if let Some(limit) = self.limit {
            if self.store.len() > limit {
                if let Some((oldest, _)) = self.order.pop_front() {
                    self.store.remove(&oldest);
                }
            }
        }
    }

    /// Insert stamped with the wall clock.
    pub fn insert(&mut self, key: K, value: V) {
        self.insert_at(key, value, chrono::Utc::now().timestamp());
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.store.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.store.contains_key(key)
    }

    /// Remove a specific key, keeping the order records consistent.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let removed = self.store.remove(key)?;
        if let Some(idx) = self.order.iter().position(|(k, _)| k == key) {
            self.order.remove(idx);
        }
        Some(removed)
    }

    /// Remove every entry older than the configured time-to-live relative to
    /// `now`, returning the evicted entries in insertion order. The caller
    /// decides what to do with them.
    pub fn prune_at(&mut self, now: i64) -> Vec<(K, V)> {
        let mut evicted = Vec::new();
        loop {
            match self.order.front() {
                Some((_, stamp)) if stamp + self.ttl_secs <= now => {
                    if let Some((key, _)) = self.order.pop_front() {
                        if let Some(value) = self.store.remove(&key) {
                            evicted.push((key, value));
                        }
                    }
                }
                _ => break,
            }
        }
        evicted
    }

    /// Prune against the wall clock.
    pub fn prune(&mut self) -> Vec<(K, V)> {
        self.prune_at(chrono::Utc::now().timestamp())
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}
