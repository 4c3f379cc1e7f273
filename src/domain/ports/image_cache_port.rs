//! Port definitions for the cover art cache.

use std::fmt;

use bytes::Bytes;

use crate::domain::entities::ImageId;

/// Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Errors that can occur while resolving an image.
///
/// These never reach callers of the cache; they are logged and collapsed
/// into [`Unavailable`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    /// Image not found on disk.
    #[error("Image not found: {0}")]
    NotFound(String),
    /// Stored bytes are not a readable image.
    #[error("Decode error: {0}")]
    DecodeError(String),
    /// I/O error during cache operation.
    #[error("IO error: {0}")]
    IoError(String),
    /// Network error during download.
    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Terminal answer for an image that cannot be produced.
///
/// Not retryable: once returned for an identifier, every later request for
/// that identifier returns it too.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("image {id} is unavailable")]
pub struct Unavailable {
    /// The identifier that failed.
    pub id: ImageId,
}

impl Unavailable {
    /// Creates the marker for `id`.
    #[must_use]
    pub fn new(id: ImageId) -> Self {
        Self { id }
    }
}

/// Port for downloading the source bytes of an image.
/// Implementations must be thread-safe.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Downloads the raw, undecoded bytes behind `url`.
    async fn fetch(&self, url: &str) -> CacheResult<Bytes>;
}

/// Where to download an image from on a cache miss.
#[derive(Clone, Copy)]
pub struct FetchSource<'a> {
    fetcher: &'a dyn ImageFetcher,
    url: &'a str,
}

impl<'a> FetchSource<'a> {
    /// Pairs a fetcher with the URL of one image.
    #[must_use]
    pub fn new(fetcher: &'a dyn ImageFetcher, url: &'a str) -> Self {
        Self { fetcher, url }
    }

    /// The remote URL.
    #[must_use]
    pub const fn url(&self) -> &'a str {
        self.url
    }

    /// Downloads the image bytes.
    ///
    /// # Errors
    /// Returns whatever the underlying fetcher reports.
    pub async fn fetch(&self) -> CacheResult<Bytes> {
        self.fetcher.fetch(self.url).await
    }
}

impl fmt::Debug for FetchSource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchSource")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}
