//! Decoding and scaling of cover bitmaps.
//!
//! The pure functions here are CPU bound; the async wrappers run them on the
//! blocking pool so cache callers never stall a runtime worker.

use image::imageops::{self, FilterType};

use crate::domain::entities::{Bitmap, Dimensions};
use crate::domain::ports::{CacheError, CacheResult};

/// Filter used for every resize. Bilinear, deterministic for equal inputs.
const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// Decodes encoded image bytes into an RGBA bitmap.
///
/// # Errors
/// Returns `DecodeError` for malformed, truncated, non-image or empty data.
pub fn decode(bytes: &[u8]) -> CacheResult<Bitmap> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| CacheError::DecodeError(format!("Failed to decode image: {e}")))?;
    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(CacheError::DecodeError("Image has no pixels".into()));
    }
    Ok(Bitmap::from(decoded.into_rgba8()))
}

/// Runs [`decode`] on the blocking pool.
///
/// # Errors
/// Returns `DecodeError` if the bytes are not a readable image or the
/// decoding task panicked.
pub async fn decode_off_thread(bytes: Vec<u8>) -> CacheResult<Bitmap> {
    tokio::task::spawn_blocking(move || decode(&bytes))
        .await
        .map_err(|e| CacheError::DecodeError(format!("Decode task panicked: {e}")))?
}

/// Crops the centered `side x side` region, `side` being the shorter edge.
/// Square inputs are returned as is.
#[must_use]
pub fn crop_center_square(bitmap: &Bitmap) -> Bitmap {
    let (width, height) = (bitmap.width(), bitmap.height());
    if width == height {
        return bitmap.clone();
    }
    let side = width.min(height);
    let x = (width - side) / 2;
    let y = (height - side) / 2;
    Bitmap::from(imageops::crop_imm(bitmap.as_image(), x, y, side, side).to_image())
}

/// Resizes to exactly `width x height`. Same-size inputs are returned as is.
#[must_use]
pub fn resize(bitmap: &Bitmap, width: u32, height: u32) -> Bitmap {
    if bitmap.width() == width && bitmap.height() == height {
        return bitmap.clone();
    }
    Bitmap::from(imageops::resize(
        bitmap.as_image(),
        width.max(1),
        height.max(1),
        RESIZE_FILTER,
    ))
}

/// Produces the variant of `original` requested by `dimensions`.
#[must_use]
pub fn scale(original: &Bitmap, dimensions: Dimensions) -> Bitmap {
    let base = if dimensions.square_crop() {
        crop_center_square(original)
    } else {
        original.clone()
    };
    resize(&base, dimensions.width(), dimensions.height())
}

/// Runs [`scale`] on the blocking pool.
///
/// # Errors
/// Returns `DecodeError` if the scaling task panicked.
pub async fn scale_off_thread(original: Bitmap, dimensions: Dimensions) -> CacheResult<Bitmap> {
    tokio::task::spawn_blocking(move || scale(&original, dimensions))
        .await
        .map_err(|e| CacheError::DecodeError(format!("Scale task panicked: {e}")))
}

/// Encodes `bitmap` as PNG bytes.
///
/// # Errors
/// Returns `DecodeError` if the encoder fails.
pub fn encode_png(bitmap: &Bitmap) -> CacheResult<Vec<u8>> {
    let mut out = Vec::new();
    bitmap
        .as_image()
        .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
        .map_err(|e| CacheError::DecodeError(format!("Failed to encode PNG: {e}")))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    /// 300x200 image: red left band, green center square, blue right band.
    fn banded() -> Bitmap {
        Bitmap::from(RgbaImage::from_fn(300, 200, |x, _| {
            if x < 50 {
                Rgba([255, 0, 0, 255])
            } else if x < 250 {
                Rgba([0, 255, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        }))
    }

    #[test]
    fn test_decode_png_roundtrip_dimensions() {
        let png = encode_png(&banded()).unwrap();
        let decoded = decode(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (300, 200));
        assert_eq!(decoded, banded());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode(b"definitely not an image"),
            Err(CacheError::DecodeError(_))
        ));
    }

    #[test]
    fn test_decode_rejects_truncated() {
        let png = encode_png(&banded()).unwrap();
        assert!(decode(&png[..png.len() / 2]).is_err());
    }

    #[test]
    fn test_crop_center_square_takes_middle() {
        let cropped = crop_center_square(&banded());
        assert_eq!((cropped.width(), cropped.height()), (200, 200));
        assert!(cropped.as_image().pixels().all(|p| *p == Rgba([0, 255, 0, 255])));
    }

    #[test]
    fn test_crop_of_square_is_noop() {
        let square = Bitmap::from(RgbaImage::new(50, 50));
        assert!(crop_center_square(&square).ptr_eq(&square));
    }

    #[test]
    fn test_crop_portrait() {
        let portrait = Bitmap::from(RgbaImage::new(20, 60));
        let cropped = crop_center_square(&portrait);
        assert_eq!((cropped.width(), cropped.height()), (20, 20));
    }

    #[test]
    fn test_resize_same_size_is_noop() {
        let bitmap = banded();
        assert!(resize(&bitmap, 300, 200).ptr_eq(&bitmap));
    }

    #[test]
    fn test_scale_square_crops_before_resize() {
        let scaled = scale(&banded(), Dimensions::square(60));
        assert_eq!((scaled.width(), scaled.height()), (60, 60));
        assert!(scaled.as_image().pixels().all(|p| *p == Rgba([0, 255, 0, 255])));
    }

    #[test]
    fn test_scale_exact_keeps_bands() {
        let scaled = scale(&banded(), Dimensions::exact(30, 20));
        assert_eq!((scaled.width(), scaled.height()), (30, 20));
        assert_eq!(scaled.as_image().get_pixel(0, 10), &Rgba([255, 0, 0, 255]));
        assert_eq!(scaled.as_image().get_pixel(29, 10), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_scale_is_deterministic() {
        let a = scale(&banded(), Dimensions::exact(77, 33));
        let b = scale(&banded(), Dimensions::exact(77, 33));
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_decode_off_thread_matches_decode() {
        let png = encode_png(&banded()).unwrap();
        let decoded = decode_off_thread(png).await.unwrap();
        assert_eq!(decoded, banded());
        assert!(matches!(
            decode_off_thread(b"garbage".to_vec()).await,
            Err(CacheError::DecodeError(_))
        ));
    }
}
