//! Hash-keyed cache whose entries expire after a number of idle frames
//!
//! Keys describe the *content* of a creation-info structure (formats,
//! layouts, view ids...), never the identity of a value. A lookup that hits
//! marks the entry used for the current frame; the per-frame tick
//! ([`StructuralCache::next_frame`]) ages every entry that was not used and
//! evicts the ones idle for more than `max_frames` frames.

use std::collections::hash_map::Entry;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};
use rustc_hash::FxHashMap;
use crate::error::Result;
use crate::engine_trace;

/// Destructor invoked for every evicted or cleared entry
pub type CacheDestructor<K, V> = Box<dyn FnMut(&K, V) + Send>;

/// Hit/miss/eviction counters of one cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
}

struct CacheEntry<V> {
    value: V,
    frames_since_last_usage: u32,
    used_this_frame: bool,
}

/// Content-addressed cache with idle-frame eviction
///
/// # Example
///
/// ```ignore
/// let mut cache = StructuralCache::new("render_passes", 3);
/// let rp = cache.get_or_create(key, |key| device.create_render_pass(&key.to_desc()))?;
/// // once per frame:
/// cache.next_frame();
/// ```
pub struct StructuralCache<K, V> {
    name: &'static str,
    entries: FxHashMap<K, CacheEntry<V>>,
    max_frames: u32,
    destructor: Option<CacheDestructor<K, V>>,
    stats: CacheStats,
}

impl<K: Hash + Eq + Clone + Debug, V> StructuralCache<K, V> {
    /// Create an empty cache evicting entries idle for more than `max_frames` frames
    pub fn new(name: &'static str, max_frames: u32) -> Self {
        Self {
            name,
            entries: FxHashMap::default(),
            max_frames,
            destructor: None,
            stats: CacheStats::default(),
        }
    }

    /// Install the destructor called for every evicted or cleared value
    pub fn with_destructor(mut self, destructor: impl FnMut(&K, V) + Send + 'static) -> Self {
        self.destructor = Some(Box::new(destructor));
        self
    }

    /// Name used in log messages
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Idle threshold
    pub fn max_frames(&self) -> u32 {
        self.max_frames
    }

    /// Change the idle threshold; applies from the next tick
    pub fn set_max_frames(&mut self, max_frames: u32) {
        self.max_frames = max_frames;
    }

    /// Look up `key`, marking the entry used and resetting its idle counter
    pub fn get(&mut self, key: &K) -> Option<&V> {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.used_this_frame = true;
                entry.frames_since_last_usage = 0;
                self.stats.hits += 1;
                Some(&entry.value)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Look up `key` without touching its usage state
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|entry| &entry.value)
    }

    /// Whether `key` is cached (does not mark it used)
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or overwrite `key`
    ///
    /// The entry starts with an idle counter of 0 but is not marked used:
    /// only lookups count as usage. Returns the overwritten value, if any.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.stats.inserts += 1;
        self.entries
            .insert(key, CacheEntry {
                value,
                frames_since_last_usage: 0,
                used_this_frame: false,
            })
            .map(|old| old.value)
    }

    /// Return the cached value for `key`, creating it with `create` on a miss
    ///
    /// Both paths mark the entry used for the current frame. A failed
    /// creation leaves the cache unchanged.
    pub fn get_or_create<F>(&mut self, key: K, create: F) -> Result<&V>
    where
        F: FnOnce(&K) -> Result<V>,
    {
        let entry = match self.entries.entry(key) {
            Entry::Occupied(occupied) => {
                self.stats.hits += 1;
                occupied.into_mut()
            }
            Entry::Vacant(vacant) => {
                self.stats.misses += 1;
                let value = create(vacant.key())?;
                engine_trace!("stellar::StructuralCache", "[{}] created entry for {:?}", self.name, vacant.key());
                self.stats.inserts += 1;
                vacant.insert(CacheEntry {
                    value,
                    frames_since_last_usage: 0,
                    used_this_frame: false,
                })
            }
        };
        entry.used_this_frame = true;
        entry.frames_since_last_usage = 0;
        Ok(&entry.value)
    }

    /// Remove `key` without running the destructor
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|entry| entry.value)
    }

    /// Visit every entry
    pub fn foreach(&self, mut f: impl FnMut(&K, &V)) {
        for (key, entry) in &self.entries {
            f(key, &entry.value);
        }
    }

    /// Visit every entry not used during the current frame
    pub fn foreach_unused(&self, mut f: impl FnMut(&K, &V)) {
        for (key, entry) in &self.entries {
            if !entry.used_this_frame {
                f(key, &entry.value);
            }
        }
    }

    /// Idle counter of `key`
    pub fn frames_since_last_usage(&self, key: &K) -> Option<u32> {
        self.entries.get(key).map(|entry| entry.frames_since_last_usage)
    }

    /// Eviction tick, called once per frame
    ///
    /// Used entries have their counter reset and their flag cleared; unused
    /// entries age by one frame. Entries whose counter exceeds `max_frames`
    /// are removed and passed to the destructor. Returns the eviction count.
    pub fn next_frame(&mut self) -> usize {
        let max_frames = self.max_frames;
        let mut expired = Vec::new();
        for (key, entry) in self.entries.iter_mut() {
            if entry.used_this_frame {
                entry.used_this_frame = false;
                entry.frames_since_last_usage = 0;
            } else {
                entry.frames_since_last_usage += 1;
                if entry.frames_since_last_usage > max_frames {
                    expired.push(key.clone());
                }
            }
        }

        for key in &expired {
            if let Some(entry) = self.entries.remove(key) {
                engine_trace!("stellar::StructuralCache", "[{}] evicted {:?}", self.name, key);
                self.destroy(key, entry.value);
            }
        }
        self.stats.evictions += expired.len() as u64;
        expired.len()
    }

    /// Destroy every entry through the destructor
    pub fn clear(&mut self) {
        let entries: Vec<(K, CacheEntry<V>)> = self.entries.drain().collect();
        for (key, entry) in entries {
            self.destroy(&key, entry.value);
        }
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hit/miss/eviction counters
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    fn destroy(&mut self, key: &K, value: V) {
        match self.destructor.as_mut() {
            Some(destructor) => destructor(key, value),
            None => drop(value),
        }
    }
}

impl<K, V> Drop for StructuralCache<K, V> {
    fn drop(&mut self) {
        if let Some(destructor) = self.destructor.as_mut() {
            for (key, entry) in self.entries.drain() {
                destructor(&key, entry.value);
            }
        }
    }
}

// ===== FRAME TICK =====

/// Anything that must be aged once per frame by the frame lifecycle
pub trait FrameTick: Send + Sync {
    /// Run the per-frame eviction tick; returns the number of evicted entries
    fn tick(&self) -> usize;

    /// Destroy everything (shutdown)
    fn clear_all(&self);
}

/// Cache shared between the render graph and the frame lifecycle
pub type SharedCache<K, V> = Mutex<StructuralCache<K, V>>;

impl<K, V> FrameTick for Mutex<StructuralCache<K, V>>
where
    K: Hash + Eq + Clone + Debug + Send,
    V: Send,
{
    fn tick(&self) -> usize {
        self.lock().unwrap_or_else(PoisonError::into_inner).next_frame()
    }

    fn clear_all(&self) {
        self.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

#[cfg(test)]
#[path = "structural_cache_tests.rs"]
mod tests;
