//! Bounded LRU cache for translation results.
//!
//! Keys are exact (text, source, target) triples — no normalization or fuzzy
//! matching. The capacity bound keeps long-lived processes from growing the
//! cache without limit.

use crate::translate::client::TranslationResult;
use std::collections::{HashMap, VecDeque};

/// Cache key: (source_text, source_language, target_language).
pub type CacheKey = (String, String, String);

/// Least-recently-used cache of translation results.
pub struct TranslationCache {
    capacity: usize,
    entries: HashMap<CacheKey, TranslationResult>,
    /// Access order, least recently used at the front.
    order: VecDeque<CacheKey>,
}

impl TranslationCache {
    /// Creates a cache holding at most `capacity` entries. A capacity of
    /// zero disables caching entirely.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Looks up a translation, marking it most recently used on a hit.
    pub fn get(&mut self, key: &CacheKey) -> Option<TranslationResult> {
        let result = self.entries.get(key).cloned()?;
        self.touch(key);
        Some(result)
    }

    /// Inserts a translation, evicting the least recently used entry when
    /// the cache is full. Overwriting an existing key is allowed — racing
    /// misses recompute the same value.
    pub fn insert(&mut self, key: CacheKey, result: TranslationResult) {
        if self.capacity == 0 {
            return;
        }

        if self.entries.insert(key.clone(), result).is_some() {
            self.touch(&key);
            return;
        }

        self.order.push_back(key);
        while self.entries.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            } else {
                break;
            }
        }
    }

    fn touch(&mut self, key: &CacheKey) {
        if let Some(position) = self.order.iter().position(|k| k == key) {
            if let Some(entry) = self.order.remove(position) {
                self.order.push_back(entry);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}
