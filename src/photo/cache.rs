//! In-memory cache of photo bytes.
//!
//! `GET /images/{name}` is by far the hottest endpoint: every thumbnail in
//! the gallery grid and every lightbox view hits it. This LRU keeps recently
//! served photos in memory and evicts least-recently-used entries once the
//! total cached size exceeds its byte capacity.

use std::num::NonZeroUsize;

use bytes::Bytes;
use lru::LruCache;
use tokio::sync::RwLock;

/// Default cache capacity: 64MB
pub const DEFAULT_IMAGE_CACHE_CAPACITY: usize = 64 * 1024 * 1024;

/// Default maximum number of entries (to bound LRU overhead)
const DEFAULT_MAX_ENTRIES: usize = 4_096;

/// A cached photo.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedImage {
    pub data: Bytes,
    pub content_type: String,
}

/// LRU cache of photo bytes keyed by stored file name, bounded by total size.
pub struct ImageCache {
    cache: RwLock<LruCache<String, CachedImage>>,
    max_size: usize,
    current_size: RwLock<usize>,
}

impl ImageCache {
    /// Create a cache with the default capacity (64MB).
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_IMAGE_CACHE_CAPACITY)
    }

    /// Create a cache holding at most `max_size` bytes.
    pub fn with_capacity(max_size: usize) -> Self {
        Self::with_capacity_and_entries(max_size, DEFAULT_MAX_ENTRIES)
    }

    /// Create a cache with explicit byte capacity and entry limit.
    pub fn with_capacity_and_entries(max_size: usize, max_entries: usize) -> Self {
        Self {
            cache: RwLock::new(LruCache::new(
                NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN),
            )),
            max_size,
            current_size: RwLock::new(0),
        }
    }

    /// Look up a photo, marking it recently used.
    pub async fn get(&self, name: &str) -> Option<CachedImage> {
        let mut cache = self.cache.write().await;
        cache.get(name).cloned()
    }

    /// Check presence without touching LRU order.
    pub async fn contains(&self, name: &str) -> bool {
        let cache = self.cache.read().await;
        cache.contains(name)
    }

    /// Store a photo, evicting LRU entries until back under capacity.
    ///
    /// Photos larger than the whole capacity are not cached.
    pub async fn put(&self, name: impl Into<String>, image: CachedImage) {
        let data_size = image.data.len();
        if data_size > self.max_size {
            return;
        }

        let name = name.into();
        let mut cache = self.cache.write().await;
        let mut current_size = self.current_size.write().await;

        if let Some(old) = cache.peek(&name) {
            *current_size = current_size.saturating_sub(old.data.len());
        }

        // push() reports entries displaced by the entry-count bound
        if let Some((evicted_name, evicted)) = cache.push(name.clone(), image) {
            if evicted_name != name {
                *current_size = current_size.saturating_sub(evicted.data.len());
            }
        }
        *current_size += data_size;

        while *current_size > self.max_size {
            match cache.pop_lru() {
                Some((_, evicted)) => {
                    *current_size = current_size.saturating_sub(evicted.data.len());
                }
                None => break,
            }
        }
    }

    /// Drop a photo from the cache.
    pub async fn remove(&self, name: &str) -> Option<CachedImage> {
        let mut cache = self.cache.write().await;
        let mut current_size = self.current_size.write().await;

        let removed = cache.pop(name);
        if let Some(ref image) = removed {
            *current_size = current_size.saturating_sub(image.data.len());
        }
        removed
    }

    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        let mut current_size = self.current_size.write().await;
        cache.clear();
        *current_size = 0;
    }

    /// Number of cached photos.
    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cache.read().await.is_empty()
    }

    /// Total cached bytes.
    pub async fn size(&self) -> usize {
        *self.current_size.read().await
    }

    /// Maximum capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.max_size
    }
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new()
    }
}
