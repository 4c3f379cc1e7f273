//! Per-identifier cache state.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use crate::domain::entities::{Bitmap, Dimensions, ImageId};
use crate::domain::ports::{CacheError, CacheResult, FetchSource, Unavailable};

use super::codec;
use super::disk_cache::DiskStore;

/// Cache state for one identifier.
///
/// All work for the identifier (disk read, fetch, decode, scale) happens
/// while holding this entry's lock, so duplicate requests wait for the
/// first one and then read its memoized result.
#[derive(Debug, Default)]
pub struct CacheEntry {
    state: Mutex<EntryState>,
}

#[derive(Debug, Default)]
struct EntryState {
    original: Option<Bitmap>,
    scaled: HashMap<Dimensions, Bitmap>,
    failed: bool,
}

/// Point-in-time view of an entry, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntrySnapshot {
    /// The original has been decoded.
    pub loaded: bool,
    /// The entry is permanently unavailable.
    pub failed: bool,
    /// Number of memoized variants.
    pub variants: usize,
}

impl EntryState {
    fn remember_original(&mut self, original: Bitmap) {
        let (width, height) = (original.width(), original.height());
        self.scaled
            .insert(Dimensions::exact(width, height), original.clone());
        // A square original is also its own centered crop.
        if width == height {
            self.scaled
                .insert(Dimensions::square(width), original.clone());
        }
        self.original = Some(original);
    }
}

impl CacheEntry {
    /// Creates an empty entry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the bitmap for `dimensions`, loading and scaling as needed.
    ///
    /// # Errors
    /// Returns [`Unavailable`] when the image cannot be produced. The failure
    /// is sticky: later calls return it immediately without any I/O.
    pub async fn get_scaled(
        &self,
        id: &ImageId,
        dimensions: Dimensions,
        source: Option<FetchSource<'_>>,
        store: &DiskStore,
    ) -> Result<Bitmap, Unavailable> {
        let mut state = self.state.lock().await;

        if state.failed {
            trace!(id = %id, "Entry previously failed");
            return Err(Unavailable::new(id.clone()));
        }

        if let Some(bitmap) = state.scaled.get(&dimensions) {
            trace!(id = %id, %dimensions, "Memory cache hit");
            return Ok(bitmap.clone());
        }

        let original = if let Some(original) = &state.original {
            original.clone()
        } else {
            match Self::load_original(id, source, store).await {
                Ok(original) => {
                    state.remember_original(original.clone());
                    if let Some(bitmap) = state.scaled.get(&dimensions) {
                        return Ok(bitmap.clone());
                    }
                    original
                }
                Err(e) => {
                    warn!(id = %id, error = %e, "Image unavailable, not retrying");
                    state.failed = true;
                    return Err(Unavailable::new(id.clone()));
                }
            }
        };

        match codec::scale_off_thread(original, dimensions).await {
            Ok(scaled) => {
                trace!(id = %id, %dimensions, "Scaled image");
                state.scaled.insert(dimensions, scaled.clone());
                Ok(scaled)
            }
            // Dimensions are bounded, so only a broken decoded original can
            // fail here, and every other size of it would fail the same way.
            Err(e) => {
                warn!(id = %id, error = %e, "Failed to scale image");
                state.failed = true;
                Err(Unavailable::new(id.clone()))
            }
        }
    }

    /// Returns a snapshot if the entry is not busy.
    #[must_use]
    pub fn try_snapshot(&self) -> Option<EntrySnapshot> {
        let state = self.state.try_lock().ok()?;
        Some(EntrySnapshot {
            loaded: state.original.is_some(),
            failed: state.failed,
            variants: state.scaled.len(),
        })
    }

    /// Disk first; on a miss or a corrupt file, one fetch and one more disk read.
    async fn load_original(
        id: &ImageId,
        source: Option<FetchSource<'_>>,
        store: &DiskStore,
    ) -> CacheResult<Bitmap> {
        let path = store.path_for(id);

        match Self::load_from_disk(id, &path, store).await {
            Ok(original) => return Ok(original),
            Err(CacheError::NotFound(_)) => trace!(id = %id, "Disk cache miss"),
            Err(e) => debug!(id = %id, error = %e, "Discarded unreadable cache file"),
        }

        let Some(source) = source else {
            return Err(CacheError::NotFound(format!("{id} is not cached and has no source")));
        };

        debug!(id = %id, url = %source.url(), "Downloading image");
        let bytes = source.fetch().await?;
        store.write(&path, &bytes).await?;

        Self::load_from_disk(id, &path, store).await
    }

    /// Decodes the file at `path`, removing it if it is not a readable image.
    async fn load_from_disk(
        id: &ImageId,
        path: &std::path::Path,
        store: &DiskStore,
    ) -> CacheResult<Bitmap> {
        if !store.exists(path).await {
            return Err(CacheError::NotFound(path.display().to_string()));
        }
        let bytes = store.read(path).await?;

        match codec::decode_off_thread(bytes).await {
            Ok(original) => {
                debug!(
                    id = %id,
                    width = original.width(),
                    height = original.height(),
                    "Decoded image from disk"
                );
                Ok(original)
            }
            Err(e @ CacheError::DecodeError(_)) => {
                warn!(id = %id, error = %e, "Cached image is corrupt, removing");
                store.remove(path).await;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::MockImageFetcher;
    use bytes::Bytes;
    use image::RgbaImage;
    use tempfile::TempDir;

    fn png(width: u32, height: u32) -> Bytes {
        let bitmap = Bitmap::from(RgbaImage::from_pixel(
            width,
            height,
            image::Rgba([10, 20, 30, 255]),
        ));
        Bytes::from(codec::encode_png(&bitmap).unwrap())
    }

    #[tokio::test]
    async fn test_fetch_on_miss_then_memoize() {
        let temp = TempDir::new().unwrap();
        let store = DiskStore::new(temp.path());
        let entry = CacheEntry::new();
        let id = ImageId::new("playlist/one");

        let mut fetcher = MockImageFetcher::new();
        fetcher
            .expect_fetch()
            .withf(|url| url.ends_with("/one"))
            .times(1)
            .returning(|_| Ok(png(40, 40)));
        let source = FetchSource::new(&fetcher, "https://img.example/one");

        let first = entry
            .get_scaled(&id, Dimensions::square(20), Some(source), &store)
            .await
            .unwrap();
        let second = entry
            .get_scaled(&id, Dimensions::square(20), Some(source), &store)
            .await
            .unwrap();

        assert_eq!((first.width(), first.height()), (20, 20));
        assert!(first.ptr_eq(&second));
        assert!(store.exists(&store.path_for(&id)).await);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_sticky() {
        let temp = TempDir::new().unwrap();
        let store = DiskStore::new(temp.path());
        let entry = CacheEntry::new();
        let id = ImageId::new("album/broken");

        let mut fetcher = MockImageFetcher::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(|_| Err(CacheError::NetworkError("HTTP 404".into())));
        let source = FetchSource::new(&fetcher, "https://img.example/broken");

        for side in [60, 120, 60] {
            let result = entry
                .get_scaled(&id, Dimensions::square(side), Some(source), &store)
                .await;
            assert_eq!(result, Err(Unavailable::new(id.clone())));
        }
        assert_eq!(entry.try_snapshot().map(|s| s.failed), Some(true));
    }

    #[tokio::test]
    async fn test_corrupt_download_is_removed_and_not_refetched() {
        let temp = TempDir::new().unwrap();
        let store = DiskStore::new(temp.path());
        let entry = CacheEntry::new();
        let id = ImageId::new("album/garbage");

        let mut fetcher = MockImageFetcher::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(|_| Ok(Bytes::from_static(b"<html>not an image</html>")));
        let source = FetchSource::new(&fetcher, "https://img.example/garbage");

        assert!(entry
            .get_scaled(&id, Dimensions::square(60), Some(source), &store)
            .await
            .is_err());
        assert!(!store.exists(&store.path_for(&id)).await);
        assert!(entry
            .get_scaled(&id, Dimensions::square(60), Some(source), &store)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_corrupt_disk_file_triggers_fetch() {
        let temp = TempDir::new().unwrap();
        let store = DiskStore::new(temp.path());
        let entry = CacheEntry::new();
        let id = ImageId::new("playlist/stale");
        store
            .write(&store.path_for(&id), b"truncated")
            .await
            .unwrap();

        let mut fetcher = MockImageFetcher::new();
        fetcher.expect_fetch().times(1).returning(|_| Ok(png(10, 10)));
        let source = FetchSource::new(&fetcher, "https://img.example/stale");

        let bitmap = entry
            .get_scaled(&id, Dimensions::exact(10, 10), Some(source), &store)
            .await
            .unwrap();

        assert_eq!((bitmap.width(), bitmap.height()), (10, 10));
        assert_eq!(
            store.read(&store.path_for(&id)).await.unwrap(),
            png(10, 10).to_vec()
        );
    }

    #[tokio::test]
    async fn test_native_size_memoized_on_load() {
        let temp = TempDir::new().unwrap();
        let store = DiskStore::new(temp.path());
        let entry = CacheEntry::new();
        let id = ImageId::new("album/native");
        store.write(&store.path_for(&id), &png(30, 30)).await.unwrap();

        let exact = entry
            .get_scaled(&id, Dimensions::exact(30, 30), None, &store)
            .await
            .unwrap();
        let square = entry
            .get_scaled(&id, Dimensions::square(30), None, &store)
            .await
            .unwrap();

        assert!(exact.ptr_eq(&square));
        assert_eq!(
            entry.try_snapshot(),
            Some(EntrySnapshot {
                loaded: true,
                failed: false,
                variants: 2,
            })
        );
    }

    #[tokio::test]
    async fn test_oversized_request_leaves_entry_usable() {
        let temp = TempDir::new().unwrap();
        let store = DiskStore::new(temp.path());
        let entry = CacheEntry::new();
        let id = ImageId::new("album/wide");
        store.write(&store.path_for(&id), &png(16, 16)).await.unwrap();

        let wide = entry
            .get_scaled(&id, Dimensions::exact(u32::MAX, 2), None, &store)
            .await
            .unwrap();
        let small = entry
            .get_scaled(&id, Dimensions::square(8), None, &store)
            .await
            .unwrap();

        assert_eq!((wide.width(), wide.height()), (crate::domain::MAX_SIDE, 2));
        assert_eq!(small.width(), 8);
        assert_eq!(entry.try_snapshot().map(|s| s.failed), Some(false));
    }
}
