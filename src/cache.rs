use std::collections::HashMap;
use std::hash::Hash;

/// Session-scoped lookup store with no eviction; the first value stored under a key wins
#[derive(Debug)]
pub struct LookupCache<K, V> {
    entries: HashMap<K, V>,
}

impl<K: Eq + Hash, V: Clone> LookupCache<K, V> {
    /// Creates an empty store
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Returns a copy of the stored value
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).cloned()
    }

    /// Stores `value` unless the key is already present, and returns what is stored
    pub fn insert(&mut self, key: K, value: V) -> V {
        self.entries.entry(key).or_insert(value).clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<K: Eq + Hash, V: Clone> Default for LookupCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_writer_wins() {
        let mut cache: LookupCache<String, u32> = LookupCache::new();
        assert_eq!(cache.insert("paris".to_string(), 1), 1);
        assert_eq!(cache.insert("paris".to_string(), 2), 1);
        assert_eq!(cache.get(&"paris".to_string()), Some(1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear_empties_cache() {
        let mut cache: LookupCache<&str, u32> = LookupCache::default();
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&"a"), None);
    }
}
