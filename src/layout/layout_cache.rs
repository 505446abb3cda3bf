use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;
use xxhash_rust::xxh3::xxh3_64;

use crate::layout::MasonryLayout;
use crate::models::{ColumnModel, MediaItem};

/// Maximum number of packed layouts to keep in memory.
const MAX_CACHE_ENTRIES: usize = 8;

/// Key for the layout cache, combining column count and list hash.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
struct CacheKey {
    column_count: u32,
    list_hash: u64,
}

/// Memoises packed columns so repeated renders of an unchanged prefix skip
/// the packing pass.
///
/// The list hash covers every item id and its height weight in order, so any
/// change to the prefix (append, broken-item removal, reorder) misses the cache.
pub struct LayoutCache {
    cache: Mutex<LruCache<CacheKey, Vec<ColumnModel>>>,
}

impl LayoutCache {
    pub fn new() -> Self {
        let capacity = NonZeroUsize::new(MAX_CACHE_ENTRIES).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Computes a fast hash of the item list (ids and height weights, in order).
    pub fn compute_list_hash(items: &[MediaItem]) -> u64 {
        let mut hasher_input = Vec::with_capacity(items.len() * 24);

        for item in items {
            hasher_input.extend_from_slice(item.id.as_str().as_bytes());
            // Separator so ids "1","23" and "12","3" hash differently
            hasher_input.push(0);
            hasher_input.extend_from_slice(&item.height_weight().to_le_bytes());
        }

        xxh3_64(&hasher_input)
    }

    pub fn get(&self, column_count: u32, list_hash: u64) -> Option<Vec<ColumnModel>> {
        let key = CacheKey {
            column_count,
            list_hash,
        };
        self.cache.lock().get(&key).cloned()
    }

    pub fn set(&self, column_count: u32, list_hash: u64, columns: Vec<ColumnModel>) {
        let key = CacheKey {
            column_count,
            list_hash,
        };
        self.cache.lock().put(key, columns);
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }
}

impl Default for LayoutCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Masonry packing with automatic cache management.
#[derive(Default)]
pub struct CachedMasonry {
    pub layout: MasonryLayout,
    pub cache: LayoutCache,
}

impl CachedMasonry {
    pub fn with_layout(layout: MasonryLayout) -> Self {
        Self {
            layout,
            cache: LayoutCache::new(),
        }
    }

    /// Packs `items`, reusing a previous result when neither the prefix nor the
    /// column count changed.
    pub fn compute(&self, items: &[MediaItem], column_count: u32) -> Vec<ColumnModel> {
        if items.is_empty() {
            return Vec::new();
        }

        let list_hash = LayoutCache::compute_list_hash(items);
        if let Some(columns) = self.cache.get(column_count, list_hash) {
            return columns;
        }

        let columns = self.layout.pack(items, column_count);
        self.cache.set(column_count, list_hash, columns.clone());
        columns
    }

    pub fn invalidate(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MediaSource, MediaType};

    fn make_item(id: &str, hint: &str) -> MediaItem {
        MediaItem::new(id, MediaSource::Path(format!("{}.jpg", id).into()), MediaType::Image)
            .with_height(hint)
    }

    #[test]
    fn test_list_hash_consistency() {
        let items = vec![make_item("a", "h-48"), make_item("b", "h-64")];
        assert_eq!(
            LayoutCache::compute_list_hash(&items),
            LayoutCache::compute_list_hash(&items)
        );
    }

    #[test]
    fn test_list_hash_changes_on_order() {
        let items1 = vec![make_item("a", "h-48"), make_item("b", "h-64")];
        let items2 = vec![make_item("b", "h-64"), make_item("a", "h-48")];
        assert_ne!(
            LayoutCache::compute_list_hash(&items1),
            LayoutCache::compute_list_hash(&items2)
        );
    }

    #[test]
    fn test_list_hash_changes_on_weight() {
        let items1 = vec![make_item("a", "h-48")];
        let items2 = vec![make_item("a", "h-96")];
        assert_ne!(
            LayoutCache::compute_list_hash(&items1),
            LayoutCache::compute_list_hash(&items2)
        );
    }

    #[test]
    fn test_list_hash_separates_ids() {
        let items1 = vec![make_item("1", "h-4"), make_item("23", "h-4")];
        let items2 = vec![make_item("12", "h-4"), make_item("3", "h-4")];
        assert_ne!(
            LayoutCache::compute_list_hash(&items1),
            LayoutCache::compute_list_hash(&items2)
        );
    }

    #[test]
    fn test_cache_eviction() {
        let cache = LayoutCache::new();
        for i in 0..(MAX_CACHE_ENTRIES + 5) {
            cache.set(4, i as u64, Vec::new());
        }
        assert_eq!(cache.len(), MAX_CACHE_ENTRIES);
        // Oldest entries were evicted first
        assert!(cache.get(4, 0).is_none());
        assert!(cache.get(4, (MAX_CACHE_ENTRIES + 4) as u64).is_some());
    }

    #[test]
    fn test_cached_masonry_hit_and_miss() {
        let masonry = CachedMasonry::default();
        let items: Vec<MediaItem> = (0..10)
            .map(|i| make_item(&i.to_string(), "h-48"))
            .collect();

        let first = masonry.compute(&items, 4);
        let second = masonry.compute(&items, 4);
        assert_eq!(first, second);
        assert_eq!(masonry.cache.len(), 1);

        // A different column count is a separate entry
        let three = masonry.compute(&items, 3);
        assert_eq!(three.len(), 3);
        assert_eq!(masonry.cache.len(), 2);

        masonry.invalidate();
        assert!(masonry.cache.is_empty());
    }

    #[test]
    fn test_empty_items_not_cached() {
        let masonry = CachedMasonry::default();
        assert!(masonry.compute(&[], 4).is_empty());
        assert!(masonry.cache.is_empty());
    }
}
