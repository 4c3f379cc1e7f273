//! Infrastructure layer with disk, network and configuration adapters.

/// Application configuration.
pub mod config;
/// Image handling (disk store, decoding, caching, cover loading).
pub mod image;

pub use config::{CliArgs, ConfigError, CoverArtConfig, LogLevel, StorageManager};
pub use self::image::{
    CacheStats, CoverArtLoader, CoverArtLoaderConfig, CoverLoadedEvent, DiskStore,
    HttpImageFetcher, PixbufCache, Placeholders,
};
