//! Bounded concurrent cache shared by the extraction and digest layers.
//!
//! Entries are idempotent recomputations (a robots.txt policy, an image
//! URL, a comment tree), so the cache only needs last-writer-wins inserts
//! and a cheap eviction rule: once the entry count exceeds the bound the
//! whole map is cleared. A mis-eviction only costs a re-fetch.

use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use tracing::debug;

/// A cloneable handle to a size-bounded concurrent map.
///
/// Clones share the same underlying storage.
#[derive(Debug)]
pub struct BoundedCache<K, V>
where
    K: Eq + Hash,
{
    name: &'static str,
    entries: Arc<DashMap<K, V>>,
    max_entries: usize,
}

impl<K, V> Clone for BoundedCache<K, V>
where
    K: Eq + Hash,
{
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            entries: Arc::clone(&self.entries),
            max_entries: self.max_entries,
        }
    }
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache holding at most `max_entries` entries before it is cleared.
    ///
    /// `name` only shows up in logs.
    pub fn new(name: &'static str, max_entries: usize) -> Self {
        Self {
            name,
            entries: Arc::new(DashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    /// Look up a value, cloning it out of the map.
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Check whether a key is present.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or replace a value.
    ///
    /// If the insert pushes the map over its bound, every other entry is
    /// dropped and only the new one is kept.
    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(key.clone(), value.clone());

        if self.entries.len() > self.max_entries {
            debug!(
                cache = self.name,
                max_entries = self.max_entries,
                "Cache over capacity, clearing"
            );
            self.entries.clear();
            self.entries.insert(key, value);
        }
    }

    /// Remove a single entry.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|(_, value)| value)
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured upper bound.
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }
}
