//! Domain entity definitions.

mod image;

pub use self::image::{
    Bitmap, CoverKind, CoverState, Dimensions, ImageId, MAX_SIDE, ParseCoverKindError,
};
