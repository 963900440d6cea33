//! Bounded in-memory shared cache
//!
//! [`MemoryCache`] evicts with Adaptive Replacement (ARC): it keeps a
//! recency list for keys seen once and a frequency list for keys seen
//! again, plus ghost lists of recently evicted keys that steer how much
//! room each side gets. Locator entries for hot options therefore survive
//! bursts of one-off lookups.

use crate::traits::SharedCache;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

/// Cache statistics
#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub evictions: AtomicU64,
}

impl CacheStats {
    /// Calculate hit ratio (0.0 to 1.0)
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed) as f64;
        let misses = self.misses.load(Ordering::Relaxed) as f64;
        let total = hits + misses;
        if total == 0.0 { 0.0 } else { hits / total }
    }
}

#[derive(Default)]
struct ArcLists {
    /// Seen once recently
    recent: VecDeque<String>,
    /// Seen at least twice
    frequent: VecDeque<String>,
    /// Evicted from `recent`
    ghost_recent: VecDeque<String>,
    /// Evicted from `frequent`
    ghost_frequent: VecDeque<String>,
    values: HashMap<String, String>,
    /// Target length of `recent`
    target: usize,
}

fn remove_key(list: &mut VecDeque<String>, key: &str) -> bool {
    match list.iter().position(|k| k == key) {
        Some(pos) => {
            list.remove(pos);
            true
        }
        None => false,
    }
}

impl ArcLists {
    fn resident(&self) -> usize {
        self.recent.len() + self.frequent.len()
    }

    fn ghosts(&self) -> usize {
        self.ghost_recent.len() + self.ghost_frequent.len()
    }

    /// Evict one resident key into its ghost list.
    fn evict(&mut self, hit_frequent_ghost: bool) -> bool {
        let from_recent = !self.recent.is_empty()
            && (self.recent.len() > self.target
                || (hit_frequent_ghost && self.recent.len() == self.target)
                || self.frequent.is_empty());

        let evicted = if from_recent {
            self.recent.pop_front().inspect(|k| {
                self.ghost_recent.push_back(k.clone());
            })
        } else {
            self.frequent.pop_front().inspect(|k| {
                self.ghost_frequent.push_back(k.clone());
            })
        };

        match evicted {
            Some(key) => {
                self.values.remove(&key);
                true
            }
            None => false,
        }
    }
}

/// Bounded shared cache with adaptive replacement
pub struct MemoryCache {
    lists: Mutex<ArcLists>,
    capacity: usize,
    stats: CacheStats,
}

impl MemoryCache {
    /// Create a cache holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            lists: Mutex::new(ArcLists::default()),
            capacity,
            stats: CacheStats::default(),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let mut lists = self.lists.lock();

        if remove_key(&mut lists.recent, key) || remove_key(&mut lists.frequent, key) {
            lists.frequent.push_back(key.to_string());
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return lists.values.get(key).cloned();
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn put(&self, key: &str, value: String) {
        if self.capacity == 0 {
            return;
        }
        let capacity = self.capacity;
        let mut lists = self.lists.lock();

        // Resident: refresh value and promote
        if remove_key(&mut lists.recent, key) || remove_key(&mut lists.frequent, key) {
            lists.frequent.push_back(key.to_string());
            lists.values.insert(key.to_string(), value);
            return;
        }

        // Ghost hits adapt the recency target, then come back as frequent
        let ghost_hit = if remove_key(&mut lists.ghost_recent, key) {
            let step = (lists.ghost_frequent.len() / (lists.ghost_recent.len() + 1)).max(1);
            lists.target = (lists.target + step).min(capacity);
            Some(false)
        } else if remove_key(&mut lists.ghost_frequent, key) {
            let step = (lists.ghost_recent.len() / (lists.ghost_frequent.len() + 1)).max(1);
            lists.target = lists.target.saturating_sub(step);
            Some(true)
        } else {
            None
        };

        if let Some(hit_frequent_ghost) = ghost_hit {
            if lists.resident() >= capacity && lists.evict(hit_frequent_ghost) {
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            }
            lists.frequent.push_back(key.to_string());
            lists.values.insert(key.to_string(), value);
            return;
        }

        // New key
        if lists.recent.len() + lists.ghost_recent.len() >= capacity {
            if lists.recent.len() < capacity {
                lists.ghost_recent.pop_front();
                if lists.resident() >= capacity && lists.evict(false) {
                    self.stats.evictions.fetch_add(1, Ordering::Relaxed);
                }
            } else if let Some(evicted) = lists.recent.pop_front() {
                lists.values.remove(&evicted);
                lists.ghost_recent.push_back(evicted);
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            }
        } else if lists.resident() + lists.ghosts() >= capacity {
            if lists.resident() + lists.ghosts() >= 2 * capacity {
                lists.ghost_frequent.pop_front();
            }
            if lists.resident() >= capacity && lists.evict(false) {
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }

        lists.recent.push_back(key.to_string());
        lists.values.insert(key.to_string(), value);
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        let mut lists = self.lists.lock();
        if !remove_key(&mut lists.recent, key) {
            remove_key(&mut lists.frequent, key);
        }
        lists.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lists.lock().values.contains_key(key)
    }

    pub fn clear(&self) {
        *self.lists.lock() = ArcLists::default();
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.lists.lock().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl SharedCache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        Self::get(self, key)
    }

    fn set(&self, key: &str, value: String) {
        self.put(key, value);
    }

    fn delete(&self, key: &str) {
        self.remove(key);
    }
}

/// Cache that never stores anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

impl SharedCache for NoopCache {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _key: &str, _value: String) {}

    fn delete(&self, _key: &str) {}
}
