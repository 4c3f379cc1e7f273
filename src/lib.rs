//! Coverart - cover art cache for a music streaming client.
//!
//! This crate resolves playlist and album covers to scaled bitmaps. Source
//! images are fetched once, persisted on disk, and every requested size is
//! memoized in memory for the lifetime of the process.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Domain layer containing image types and port definitions.
pub mod domain;
/// Infrastructure layer containing the cache and its adapters.
pub mod infrastructure;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "coverart";
