//! Domain types for cover art images.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use image::RgbaImage;

/// Unique identifier for a cached image.
///
/// Opaque to the cache: the same identifier names one logical image on disk,
/// in memory and on the network. Cover identifiers are built with
/// [`ImageId::cover`] and look like `playlist/37i9dQZF1DX0XUsuxWHRQd`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(Arc<str>);

impl ImageId {
    /// Creates a new `ImageId` from any string-like input.
    #[must_use]
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// Creates the identifier of a catalog cover, namespaced by its kind.
    #[must_use]
    pub fn cover(kind: CoverKind, catalog_id: &str) -> Self {
        Self::new(format!("{}/{catalog_id}", kind.as_str()))
    }

    /// Creates an `ImageId` from a URL by hashing it.
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        let result = hasher.finalize();
        Self::new(hex::encode(&result[..16]))
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ImageId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Largest side, in pixels, of any requested variant.
pub const MAX_SIDE: u32 = 4096;

/// Requested output size of a cached image.
///
/// Square requests are canonicalized on construction: the height always
/// equals the width, so `(60, 40, square)` and `(60, 60, square)` are the
/// same key. Both sides are clamped to `1..=MAX_SIDE`, so every request can
/// be allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    width: u32,
    height: u32,
    square_crop: bool,
}

impl Dimensions {
    /// Creates canonical dimensions.
    #[must_use]
    pub fn new(width: u32, height: u32, square_crop: bool) -> Self {
        let width = width.clamp(1, MAX_SIDE);
        let height = if square_crop {
            width
        } else {
            height.clamp(1, MAX_SIDE)
        };
        Self {
            width,
            height,
            square_crop,
        }
    }

    /// Creates a square, center-cropped request of the given side.
    #[must_use]
    pub fn square(side: u32) -> Self {
        Self::new(side, side, true)
    }

    /// Creates a plain resize request.
    #[must_use]
    pub fn exact(width: u32, height: u32) -> Self {
        Self::new(width, height, false)
    }

    /// Target width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Target height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Whether the centered square region is cropped before resizing.
    #[must_use]
    pub const fn square_crop(&self) -> bool {
        self.square_crop
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)?;
        if self.square_crop {
            f.write_str(" (square)")?;
        }
        Ok(())
    }
}

/// Decoded RGBA pixel buffer.
///
/// Cloning is cheap; clones share the same pixels, which is how memoized
/// variants are handed out without copying.
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap(Arc<RgbaImage>);

impl Bitmap {
    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.0.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.0.height()
    }

    /// Raw RGBA8 pixels, row-major.
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        self.0.as_raw()
    }

    /// Borrows the underlying image buffer.
    #[must_use]
    pub fn as_image(&self) -> &RgbaImage {
        &self.0
    }

    /// Returns true if both bitmaps share the same pixel allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<RgbaImage> for Bitmap {
    fn from(image: RgbaImage) -> Self {
        Self(Arc::new(image))
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish_non_exhaustive()
    }
}

/// Catalog object a cover belongs to. Each kind has its own cache namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoverKind {
    /// Playlist cover.
    Playlist,
    /// Album cover.
    Album,
}

impl CoverKind {
    /// Namespace used in identifiers and on disk.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Playlist => "playlist",
            Self::Album => "album",
        }
    }
}

impl fmt::Display for CoverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known cover kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown cover kind: {0}")]
pub struct ParseCoverKindError(pub String);

impl FromStr for CoverKind {
    type Err = ParseCoverKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "playlist" => Ok(Self::Playlist),
            "album" => Ok(Self::Album),
            _ => Err(ParseCoverKindError(s.to_string())),
        }
    }
}

/// What a caller should show for a cover.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CoverState {
    /// The request is still outstanding.
    #[default]
    Loading,
    /// The scaled cover is ready.
    Ready(Bitmap),
    /// The cover is permanently unavailable; do not retry.
    Error,
}

impl CoverState {
    /// Returns true if the cover is ready for rendering.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Returns true if the cover is still loading.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Returns true if loading failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Error)
    }

    /// Returns the bitmap if ready.
    #[must_use]
    pub const fn bitmap(&self) -> Option<&Bitmap> {
        match self {
            Self::Ready(bitmap) => Some(bitmap),
            _ => None,
        }
    }
}

impl<E> From<Result<Bitmap, E>> for CoverState {
    fn from(result: Result<Bitmap, E>) -> Self {
        result.map_or(Self::Error, Self::Ready)
    }
}
