mod image_cache_port;

pub use image_cache_port::{CacheError, CacheResult, FetchSource, ImageFetcher, Unavailable};

#[cfg(test)]
pub use image_cache_port::MockImageFetcher;
