use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::records::Category;

pub const DEFAULT_CAPACITY: usize = 50;

/// Bounded query-result cache keyed by `query + "|" + category`.
///
/// Eviction is strict insertion order: a hit does not refresh an
/// entry's position, so the oldest key is dropped first regardless of
/// how often it was read. Entries are never invalidated individually —
/// sound only while the underlying record list stays immutable; a host
/// that mutates records must clear (and a multi-threaded host must
/// serialize get/insert, since eviction is not atomic with lookup).
#[derive(Debug)]
pub struct FilterCache {
    capacity: usize,
    entries: HashMap<String, Vec<String>>,
    order: VecDeque<String>,
}

impl FilterCache {
    pub fn new(capacity: usize) -> FilterCache {
        FilterCache {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn key(query: &str, category: Option<Category>) -> String {
        format!(
            "{}|{}",
            query,
            category.map(Category::label).unwrap_or_default()
        )
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn insert(&mut self, key: String, ids: Vec<String>) {
        if self.entries.contains_key(&key) {
            self.entries.insert(key, ids);
            return;
        }

        if self.entries.len() >= self.capacity
            && let Some(oldest) = self.order.pop_front()
        {
            self.entries.remove(&oldest);
            debug!(key = %oldest, "evicted filter cache entry");
        }

        self.order.push_back(key.clone());
        self.entries.insert(key, ids);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for FilterCache {
    fn default() -> FilterCache {
        FilterCache::new(DEFAULT_CAPACITY)
    }
}
