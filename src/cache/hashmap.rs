//! HashMap-based memo table.
//!
//! No collisions and no eviction: a cached fold result is valid forever,
//! because the log nodes it was computed from are immutable.

use std::collections::HashMap;
use std::hash::Hash;

/// A cache backed by [HashMap], counting hits and misses.
pub struct HashMapCache<K, V> {
    map: HashMap<K, V>,
    hits: usize,
    misses: usize,
}

impl<K, V> Default for HashMapCache<K, V> {
    fn default() -> Self {
        Self::new(10)
    }
}

impl<K, V> HashMapCache<K, V> {
    /// Creates a new cache with room for `2^bits` entries.
    pub fn new(bits: usize) -> Self {
        Self {
            map: HashMap::with_capacity(1 << bits),
            hits: 0,
            misses: 0,
        }
    }

    /// Returns the number of entries in the cache.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the number of cache hits.
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Returns the number of cache misses.
    pub fn misses(&self) -> usize {
        self.misses
    }

    /// Clears all entries, keeping the statistics.
    pub fn clear(&mut self) {
        self.map.clear();
    }
}

impl<K, V> HashMapCache<K, V>
where
    K: Hash + Eq,
    V: Clone,
{
    /// Looks up a key in the cache.
    #[inline]
    pub fn get(&mut self, key: &K) -> Option<V> {
        match self.map.get(key) {
            Some(v) => {
                self.hits += 1;
                Some(v.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Looks up a key without touching the statistics.
    #[inline]
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.map.get(key)
    }

    /// Inserts a key-value pair into the cache.
    #[inline]
    pub fn insert(&mut self, key: K, value: V) {
        self.map.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashmap_cache_basic() {
        let mut cache = HashMapCache::<(u64, u64), Vec<i32>>::new(4);

        cache.insert((1, 2), vec![42]);
        cache.insert((3, 4), vec![9, 9]);

        assert_eq!(cache.get(&(1, 2)), Some(vec![42]));
        assert_eq!(cache.get(&(3, 4)), Some(vec![9, 9]));
        assert_eq!(cache.get(&(5, 6)), None);

        assert_eq!(cache.hits(), 2);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn test_peek_does_not_count() {
        let mut cache = HashMapCache::<u32, u32>::new(2);
        cache.insert(1, 10);
        assert_eq!(cache.peek(&1), Some(&10));
        assert_eq!(cache.peek(&2), None);
        assert_eq!(cache.hits(), 0);
        assert_eq!(cache.misses(), 0);
    }

    #[test]
    fn test_hashmap_cache_clear() {
        let mut cache = HashMapCache::<u32, u32>::new(2);
        cache.insert(1, 10);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&1), None);
    }
}
