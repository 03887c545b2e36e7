//! Bounded key/value cache with least-recently-used eviction.
//!
//! Every lookup and insert stamps the entry with a monotonic counter; when a new
//! key arrives at capacity the entry with the oldest stamp is dropped.

use std::hash::Hash;

use rustc_hash::{FxBuildHasher, FxHashMap};

/// Capacity used when the caller does not configure one.
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

#[derive(Clone, Debug)]
struct Slot<V> {
    value: V,
    last_used: u64,
}

#[derive(Debug)]
pub struct LruCache<K, V> {
    slots: FxHashMap<K, Slot<V>>,
    capacity: usize,
    clock: u64,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// A zero capacity is bumped to one so the cache always holds the latest entry.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: FxHashMap::with_capacity_and_hasher(capacity, FxBuildHasher),
            capacity,
            clock: 0,
        }
    }

    /// Look up `key`, marking it as the most recently used entry on a hit.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.clock += 1;
        let now = self.clock;
        self.slots.get_mut(key).map(|slot| {
            slot.last_used = now;
            &slot.value
        })
    }

    /// Insert or replace `key`. Returns the previous value for the same key.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.clock += 1;

        if self.slots.len() >= self.capacity && !self.slots.contains_key(&key) {
            self.evict_oldest();
        }

        let slot = Slot {
            value,
            last_used: self.clock,
        };
        self.slots.insert(key, slot).map(|old| old.value)
    }

    /// Presence check that leaves recency untouched.
    pub fn contains_key(&self, key: &K) -> bool {
        self.slots.contains_key(key)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.slots.remove(key).map(|slot| slot.value)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.clock = 0;
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .slots
            .iter()
            .min_by_key(|(_, slot)| slot.last_used)
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest {
            self.slots.remove(&key);
        }
    }
}

impl<K, V> Default for LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
