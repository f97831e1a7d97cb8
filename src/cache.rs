//! Explicit cache for derived reference data
//!
//! Replaces module-level "fetch once at import time" state: the owner
//! constructs a cache, passes it to whatever needs the data, and can
//! refresh or invalidate entries explicitly.

use crate::error::Result;
use std::collections::HashMap;
use std::hash::Hash;

/// Keyed cache populated through fallible loaders
#[derive(Debug, Clone, Default)]
pub struct DataCache<K, V> {
    entries: HashMap<K, V>,
}

impl<K: Eq + Hash, V> DataCache<K, V> {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Look up a cached value
    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    /// Return the cached value, loading and storing it on first access
    ///
    /// A failing loader leaves the cache unchanged, so the load is retried
    /// on the next access.
    pub fn get_or_insert_with<F>(&mut self, key: K, load: F) -> Result<&V>
    where
        F: FnOnce() -> Result<V>,
    {
        use std::collections::hash_map::Entry;
        match self.entries.entry(key) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(load()?)),
        }
    }

    /// Reload a value unconditionally, replacing any cached entry
    pub fn refresh<F>(&mut self, key: K, load: F) -> Result<&V>
    where
        F: FnOnce() -> Result<V>,
    {
        use std::collections::hash_map::Entry;
        let value = load()?;
        match self.entries.entry(key) {
            Entry::Occupied(mut entry) => {
                entry.insert(value);
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => Ok(entry.insert(value)),
        }
    }

    /// Drop one entry; returns whether it was present
    pub fn invalidate(&mut self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
