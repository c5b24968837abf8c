//! Fixed-capacity least-recently-used byte cache.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use super::ImageBytes;

struct Entry {
    bytes: ImageBytes,
    /// Position in the recency order; larger is more recent
    tick: u64,
}

/// LRU cache of encoded image bytes keyed by path.
///
/// Recency is tracked with a monotonically increasing tick per access and an
/// ordered index from tick to path, so the least recently used entry is always
/// the first one in `order`.
pub struct LruCache {
    capacity: usize,
    entries: HashMap<PathBuf, Entry>,
    order: BTreeMap<u64, PathBuf>,
    next_tick: u64,
}

impl LruCache {
    /// Create an empty cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: BTreeMap::new(),
            next_tick: 0,
        }
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check presence without changing recency.
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    fn bump(&mut self) -> u64 {
        let tick = self.next_tick;
        self.next_tick += 1;
        tick
    }

    /// Look up an entry and mark it most recently used.
    pub fn get(&mut self, path: &Path) -> Option<ImageBytes> {
        let tick = self.bump();
        let entry = self.entries.get_mut(path)?;
        self.order.remove(&entry.tick);
        entry.tick = tick;
        self.order.insert(tick, path.to_path_buf());
        Some(entry.bytes.clone())
    }

    /// Insert or replace an entry and mark it most recently used.
    ///
    /// Evicts the least recently used entry only when a new key is inserted
    /// into a full cache. Returns the evicted path, if any.
    pub fn put(&mut self, path: PathBuf, bytes: ImageBytes) -> Option<PathBuf> {
        if self.capacity == 0 {
            return None;
        }

        let tick = self.bump();
        if let Some(entry) = self.entries.get_mut(&path) {
            self.order.remove(&entry.tick);
            entry.tick = tick;
            entry.bytes = bytes;
            self.order.insert(tick, path);
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.evict_oldest()
        } else {
            None
        };

        self.order.insert(tick, path.clone());
        self.entries.insert(path, Entry { bytes, tick });
        evicted
    }

    fn evict_oldest(&mut self) -> Option<PathBuf> {
        let (_, path) = self.order.pop_first()?;
        self.entries.remove(&path);
        log::debug!("Evicted {:?} from preload cache", path);
        Some(path)
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn bytes(b: u8) -> ImageBytes {
        Arc::from(vec![b; 4])
    }

    fn p(name: &str) -> PathBuf {
        PathBuf::from(format!("/img/{}", name))
    }

    #[test]
    fn test_get_promotes_before_eviction() {
        let mut cache = LruCache::new(2);
        cache.put(p("a"), bytes(1));
        cache.put(p("b"), bytes(2));
        assert!(cache.get(&p("a")).is_some());

        let evicted = cache.put(p("c"), bytes(3));
        assert_eq!(evicted, Some(p("b")));
        assert!(cache.contains(&p("a")));
        assert!(!cache.contains(&p("b")));
        assert!(cache.contains(&p("c")));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_evicts_in_insertion_order_without_access() {
        let mut cache = LruCache::new(3);
        for name in ["a", "b", "c", "d", "e"] {
            cache.put(p(name), bytes(0));
        }
        assert_eq!(cache.len(), 3);
        assert!(!cache.contains(&p("a")));
        assert!(!cache.contains(&p("b")));
        assert!(cache.contains(&p("e")));
    }

    #[test]
    fn test_replace_existing_key_does_not_evict() {
        let mut cache = LruCache::new(2);
        cache.put(p("a"), bytes(1));
        cache.put(p("b"), bytes(2));
        assert_eq!(cache.put(p("a"), bytes(9)), None);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&p("a")).as_deref(), Some(&[9u8; 4][..]));

        // "a" was promoted by the replace, so "b" goes next
        assert_eq!(cache.put(p("c"), bytes(3)), Some(p("b")));
    }

    #[test]
    fn test_contains_does_not_promote() {
        let mut cache = LruCache::new(2);
        cache.put(p("a"), bytes(1));
        cache.put(p("b"), bytes(2));
        assert!(cache.contains(&p("a")));
        assert_eq!(cache.put(p("c"), bytes(3)), Some(p("a")));
    }

    #[test]
    fn test_miss_and_clear() {
        let mut cache = LruCache::new(2);
        assert!(cache.get(&p("x")).is_none());
        cache.put(p("a"), bytes(1));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 2);
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let mut cache = LruCache::new(0);
        assert_eq!(cache.put(p("a"), bytes(1)), None);
        assert!(cache.is_empty());
    }
}
