//! Process-lifetime cache of decoded and scaled images.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::domain::entities::{Bitmap, Dimensions, ImageId};
use crate::domain::ports::{FetchSource, Unavailable};

use super::disk_cache::DiskStore;
use super::entry::CacheEntry;

/// Identifier to entry table in front of a [`DiskStore`].
///
/// The table lock only covers lookup and insertion; all I/O runs under the
/// per-identifier entry lock, so slow work for one image never blocks
/// requests for another. Entries are never removed.
///
/// Owned and injected by the composing layer; tests build a fresh instance.
pub struct PixbufCache {
    store: DiskStore,
    entries: Mutex<HashMap<ImageId, Arc<CacheEntry>>>,
}

impl std::fmt::Debug for PixbufCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixbufCache")
            .field("root", &self.store.root())
            .field("entries", &self.len())
            .finish()
    }
}

impl PixbufCache {
    /// Creates an empty cache over `store`.
    #[must_use]
    pub fn new(store: DiskStore) -> Self {
        Self {
            store,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The backing disk store.
    #[must_use]
    pub const fn store(&self) -> &DiskStore {
        &self.store
    }

    /// Resolves `id` to a bitmap of the requested size.
    ///
    /// On first use the image is read from disk, or fetched from `source`
    /// and persisted when it is not there yet. At most one fetch is ever
    /// issued per identifier, however many callers race.
    ///
    /// # Errors
    /// Returns [`Unavailable`] if the image cannot be produced. This is
    /// final; callers should show an error placeholder and not retry.
    pub async fn get_bitmap(
        &self,
        id: &ImageId,
        dimensions: Dimensions,
        source: Option<FetchSource<'_>>,
    ) -> Result<Bitmap, Unavailable> {
        let entry = self.entry(id);
        entry.get_scaled(id, dimensions, source, &self.store).await
    }

    /// Returns the number of known identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if no identifier has been requested yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if `id` has an entry.
    #[must_use]
    pub fn contains(&self, id: &ImageId) -> bool {
        self.entries.lock().contains_key(id)
    }

    /// Returns cache statistics. Entries busy with a request are counted as
    /// such instead of being waited for.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let entries: Vec<Arc<CacheEntry>> = self.entries.lock().values().cloned().collect();
        let mut stats = CacheStats {
            entries: entries.len(),
            ..CacheStats::default()
        };
        for entry in &entries {
            match entry.try_snapshot() {
                Some(snapshot) => {
                    stats.loaded += usize::from(snapshot.loaded);
                    stats.failed += usize::from(snapshot.failed);
                    stats.variants += snapshot.variants;
                }
                None => stats.busy += 1,
            }
        }
        stats
    }

    /// Returns the entry for `id`, inserting an empty one if absent.
    fn entry(&self, id: &ImageId) -> Arc<CacheEntry> {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(id) {
            return Arc::clone(entry);
        }
        trace!(id = %id, "Creating cache entry");
        let entry = Arc::new(CacheEntry::new());
        entries.insert(id.clone(), Arc::clone(&entry));
        entry
    }
}

/// Statistics about the cache contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Known identifiers.
    pub entries: usize,
    /// Entries with a decoded original.
    pub loaded: usize,
    /// Entries permanently unavailable.
    pub failed: usize,
    /// Entries locked by an in-flight request.
    pub busy: usize,
    /// Memoized variants across all entries.
    pub variants: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache: {} images ({} loaded, {} failed, {} busy), {} variants",
            self.entries, self.loaded, self.failed, self.busy, self.variants
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{CacheError, MockImageFetcher};
    use crate::infrastructure::image::codec;
    use bytes::Bytes;
    use image::RgbaImage;
    use tempfile::TempDir;

    fn create_test_cache() -> (PixbufCache, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let cache = PixbufCache::new(DiskStore::new(temp_dir.path()));
        (cache, temp_dir)
    }

    fn png(width: u32, height: u32) -> Bytes {
        let bitmap = Bitmap::from(RgbaImage::new(width, height));
        Bytes::from(codec::encode_png(&bitmap).unwrap())
    }

    #[tokio::test]
    async fn test_entries_are_created_once() {
        let (cache, _temp) = create_test_cache();
        let id = ImageId::new("playlist/a");
        assert!(cache.is_empty());

        let _ = cache.get_bitmap(&id, Dimensions::square(60), None).await;
        let _ = cache.get_bitmap(&id, Dimensions::square(30), None).await;

        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&id));
        assert!(!cache.contains(&ImageId::new("playlist/b")));
    }

    #[tokio::test]
    async fn test_identifiers_are_independent() {
        let (cache, _temp) = create_test_cache();
        let mut fetcher = MockImageFetcher::new();
        fetcher
            .expect_fetch()
            .withf(|url| url.ends_with("/bad"))
            .times(1)
            .returning(|_| Err(CacheError::NetworkError("HTTP 500".into())));
        fetcher
            .expect_fetch()
            .withf(|url| url.ends_with("/good"))
            .times(1)
            .returning(|_| Ok(png(8, 8)));

        let bad = cache
            .get_bitmap(
                &ImageId::new("album/bad"),
                Dimensions::square(4),
                Some(FetchSource::new(&fetcher, "https://img.example/bad")),
            )
            .await;
        let good = cache
            .get_bitmap(
                &ImageId::new("album/good"),
                Dimensions::square(4),
                Some(FetchSource::new(&fetcher, "https://img.example/good")),
            )
            .await;

        assert!(bad.is_err());
        assert!(good.is_ok());
    }

    #[tokio::test]
    async fn test_stats() {
        let (cache, _temp) = create_test_cache();
        let mut fetcher = MockImageFetcher::new();
        fetcher.expect_fetch().times(1).returning(|_| Ok(png(16, 16)));
        let source = FetchSource::new(&fetcher, "https://img.example/x");

        let id = ImageId::new("playlist/x");
        cache
            .get_bitmap(&id, Dimensions::square(8), Some(source))
            .await
            .unwrap();
        let _ = cache
            .get_bitmap(&ImageId::new("playlist/missing"), Dimensions::square(8), None)
            .await;

        let stats = cache.stats();
        assert_eq!(
            stats,
            CacheStats {
                entries: 2,
                loaded: 1,
                failed: 1,
                busy: 0,
                variants: 3,
            }
        );
    }
}
