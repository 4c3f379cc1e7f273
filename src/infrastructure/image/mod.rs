//! Image handling infrastructure.
//!
//! This module provides:
//! - Disk persistence of fetched image bytes
//! - Decoding, square cropping and resizing
//! - A per-identifier memoizing cache with at most one fetch per image
//! - Catalog cover loading with background delivery

pub mod codec;
pub mod disk_cache;
pub mod entry;
pub mod http_fetcher;
pub mod loader;
pub mod pixbuf_cache;
pub mod placeholder;

pub use disk_cache::DiskStore;
pub use entry::{CacheEntry, EntrySnapshot};
pub use http_fetcher::HttpImageFetcher;
pub use loader::{CoverArtLoader, CoverArtLoaderConfig, CoverLoadedEvent, DEFAULT_IMAGE_SIZE};
pub use pixbuf_cache::{CacheStats, PixbufCache};
pub use placeholder::Placeholders;
