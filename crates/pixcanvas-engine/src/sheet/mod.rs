//! Sprite sheet arena.
//!
//! Sprites are __not__ packed as boxes in a 2D atlas. Their pixels are appended
//! to one flat, logically 1D arena, and each sprite is remembered as an
//! `(address, width, height)` entry. Sampling ditches the sampler entirely and
//! reads texels by integer coordinate, so no filtering bleed can occur.
//!
//! GPU 1D textures are too small for a whole sheet, so the arena is tiled row
//! by row into a 2D texture of width `sheet_width`. [`SheetLayout::locate`] is
//! the only place that knows about this tiling; the builder writes texels
//! through it and the sprite sampler reads through it.

mod builder;
mod error;
mod layout;

pub use builder::{
    AnimationHandle, SheetBuilder, SheetPixels, SpriteData, SpriteEntry, SpriteHandle,
    DEFAULT_MAX_SHEET_WIDTH, MIN_SHEET_WIDTH,
};
pub use error::SheetError;
pub use layout::SheetLayout;
