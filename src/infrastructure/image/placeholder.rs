//! Bitmaps shown while a cover loads or after it failed.

use image::{Rgba, RgbaImage};

use crate::domain::entities::{Bitmap, CoverState};

const BACKGROUND: Rgba<u8> = Rgba([48, 48, 48, 255]);
const FOREGROUND: Rgba<u8> = Rgba([140, 140, 140, 255]);

/// Loading and error placeholder bitmaps of one size.
///
/// Built once by the composing layer and shared; nothing here is global.
#[derive(Debug, Clone)]
pub struct Placeholders {
    loading: Bitmap,
    error: Bitmap,
}

impl Placeholders {
    /// Draws both placeholders as `side x side` squares.
    #[must_use]
    pub fn new(side: u32) -> Self {
        let side = side.max(1);
        Self {
            loading: Bitmap::from(loading_image(side)),
            error: Bitmap::from(error_image(side)),
        }
    }

    /// Flat square shown while a request is outstanding.
    #[must_use]
    pub const fn loading(&self) -> &Bitmap {
        &self.loading
    }

    /// Crossed-out square shown for unavailable covers.
    #[must_use]
    pub const fn error(&self) -> &Bitmap {
        &self.error
    }

    /// Picks what to draw for `state`.
    #[must_use]
    pub fn resolve<'a>(&'a self, state: &'a CoverState) -> &'a Bitmap {
        match state {
            CoverState::Loading => &self.loading,
            CoverState::Ready(bitmap) => bitmap,
            CoverState::Error => &self.error,
        }
    }
}

fn loading_image(side: u32) -> RgbaImage {
    RgbaImage::from_pixel(side, side, BACKGROUND)
}

fn error_image(side: u32) -> RgbaImage {
    let stroke = (side / 16).max(1);
    RgbaImage::from_fn(side, side, |x, y| {
        let on_diagonal = x.abs_diff(y) < stroke || (x + y).abs_diff(side - 1) < stroke;
        if on_diagonal { FOREGROUND } else { BACKGROUND }
    })
}
