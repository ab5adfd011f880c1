//! Bounded memoisation for loaded tables and region options.

use std::collections::VecDeque;

/// Small first-in first-out cache keyed by the exact request arguments.
///
/// A capacity of zero disables caching entirely.
#[derive(Debug, Clone)]
pub struct BoundedCache<K, V> {
    capacity: usize,
    entries: VecDeque<(K, V)>,
}

impl<K: PartialEq, V: Clone> BoundedCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    /// Insert or replace a value, evicting the oldest entry when full.
    pub fn insert(&mut self, key: K, value: V) {
        if self.capacity == 0 {
            return;
        }
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
            log::debug!("Cache full ({}), evicted oldest entry", self.capacity);
        }
        self.entries.push_back((key, value));
    }

    /// Return the cached value or compute, store and return it.
    pub fn get_or_try_insert_with<E>(
        &mut self,
        key: K,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(value) = self.get(&key) {
            log::debug!("Cache hit");
            return Ok(value);
        }
        let value = compute()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_when_full() {
        let mut cache = BoundedCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("c", 3);
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"b"), Some(2));
        assert_eq!(cache.get(&"c"), Some(3));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn reinserting_replaces_in_place() {
        let mut cache = BoundedCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("a", 10);
        cache.insert("c", 3);
        // "a" kept its original slot, so it is still the oldest
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"b"), Some(2));
    }

    #[test]
    fn zero_capacity_never_stores() {
        let mut cache = BoundedCache::new(0);
        cache.insert("a", 1);
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.get(&"a"), None);
    }

    #[test]
    fn computes_once_per_key() {
        let mut cache = BoundedCache::new(1);
        let mut calls = 0;
        for _ in 0..3 {
            let value: Result<i32, ()> = cache.get_or_try_insert_with("k", || {
                calls += 1;
                Ok(7)
            });
            assert_eq!(value, Ok(7));
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn failed_computation_is_not_cached() {
        let mut cache: BoundedCache<&str, i32> = BoundedCache::new(1);
        let err: Result<i32, &str> = cache.get_or_try_insert_with("k", || Err("boom"));
        assert_eq!(err, Err("boom"));
        assert_eq!(cache.len(), 0);
    }
}
