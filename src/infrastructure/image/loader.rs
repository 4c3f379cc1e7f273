//! Cover art loading for catalog views.
//!
//! Wraps the [`PixbufCache`] with catalog concepts: covers are addressed by
//! kind and catalog id, always square, and results can be delivered as
//! events to whichever context owns the UI.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, error};

use crate::domain::entities::{CoverKind, CoverState, Dimensions, ImageId};
use crate::domain::ports::{CacheResult, FetchSource, ImageFetcher};

use super::http_fetcher::HttpImageFetcher;
use super::pixbuf_cache::PixbufCache;

/// Side of list-row covers in pixels.
pub const DEFAULT_IMAGE_SIZE: u32 = 60;

/// Message sent when a cover finishes loading.
#[derive(Debug, Clone)]
pub struct CoverLoadedEvent {
    /// Kind of the cover.
    pub kind: CoverKind,
    /// Catalog id of the playlist or album.
    pub catalog_id: String,
    /// Final state, never `Loading`.
    pub state: CoverState,
}

/// Configuration for the cover loader.
#[derive(Debug, Clone)]
pub struct CoverArtLoaderConfig {
    /// Side of the square covers produced.
    pub image_size: u32,
    /// Maximum background loads running at once.
    pub max_concurrent_downloads: usize,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for CoverArtLoaderConfig {
    fn default() -> Self {
        Self {
            image_size: DEFAULT_IMAGE_SIZE,
            max_concurrent_downloads: 4,
            timeout_secs: super::http_fetcher::DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Loads square catalog covers through a shared [`PixbufCache`].
#[derive(Clone)]
pub struct CoverArtLoader {
    cache: Arc<PixbufCache>,
    fetcher: Arc<dyn ImageFetcher>,
    semaphore: Arc<Semaphore>,
    event_tx: mpsc::UnboundedSender<CoverLoadedEvent>,
    dimensions: Dimensions,
}

impl std::fmt::Debug for CoverArtLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoverArtLoader")
            .field("cache", &self.cache)
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

impl CoverArtLoader {
    /// Creates a loader that downloads with `fetcher`.
    #[must_use]
    pub fn new(
        config: &CoverArtLoaderConfig,
        cache: Arc<PixbufCache>,
        fetcher: Arc<dyn ImageFetcher>,
        event_tx: mpsc::UnboundedSender<CoverLoadedEvent>,
    ) -> Self {
        Self {
            cache,
            fetcher,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_downloads.max(1))),
            event_tx,
            dimensions: Dimensions::square(config.image_size),
        }
    }

    /// Creates a loader that downloads over HTTP.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn with_http(
        config: &CoverArtLoaderConfig,
        cache: Arc<PixbufCache>,
        event_tx: mpsc::UnboundedSender<CoverLoadedEvent>,
    ) -> CacheResult<Self> {
        let fetcher = HttpImageFetcher::new(Duration::from_secs(config.timeout_secs))?;
        Ok(Self::new(config, cache, Arc::new(fetcher), event_tx))
    }

    /// Size of the covers this loader produces.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// The shared cache.
    #[must_use]
    pub const fn cache(&self) -> &Arc<PixbufCache> {
        &self.cache
    }

    /// Loads a cover, downloading it from `url` if it is not cached yet.
    pub async fn load(&self, kind: CoverKind, catalog_id: &str, url: &str) -> CoverState {
        let id = ImageId::cover(kind, catalog_id);
        let source = FetchSource::new(self.fetcher.as_ref(), url);
        self.cache
            .get_bitmap(&id, self.dimensions, Some(source))
            .await
            .into()
    }

    /// Loads a cover from the cache only.
    ///
    /// A cover that is neither in memory nor on disk becomes permanently
    /// unavailable, so use this only for covers known to be cached.
    pub async fn load_cached(&self, kind: CoverKind, catalog_id: &str) -> CoverState {
        let id = ImageId::cover(kind, catalog_id);
        self.cache.get_bitmap(&id, self.dimensions, None).await.into()
    }

    /// Starts loading a cover in the background.
    ///
    /// The result is sent as a [`CoverLoadedEvent`]; show
    /// [`CoverState::Loading`] until it arrives. Must be called from within
    /// a tokio runtime.
    pub fn load_async(&self, kind: CoverKind, catalog_id: String, url: String) {
        let loader = self.clone();
        tokio::spawn(async move {
            let Ok(_permit) = loader.semaphore.acquire().await else {
                return;
            };
            let state = loader.load(kind, &catalog_id, &url).await;
            debug!(%kind, catalog_id = %catalog_id, ready = state.is_ready(), "Cover loaded");
            let event = CoverLoadedEvent {
                kind,
                catalog_id,
                state,
            };
            if let Err(e) = loader.event_tx.send(event) {
                error!("Failed to deliver cover: {}", e);
            }
        });
    }

    /// Starts loading several covers in the background.
    pub fn prefetch_batch(&self, covers: Vec<(CoverKind, String, String)>) {
        for (kind, catalog_id, url) in covers {
            self.load_async(kind, catalog_id, url);
        }
    }
}
