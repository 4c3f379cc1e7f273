//! Domain layer with core image types and port definitions.

/// Entity definitions.
pub mod entities;
/// Port definitions.
pub mod ports;

pub use entities::{Bitmap, CoverKind, CoverState, Dimensions, ImageId, MAX_SIDE};
pub use ports::{CacheError, CacheResult, FetchSource, ImageFetcher, Unavailable};
