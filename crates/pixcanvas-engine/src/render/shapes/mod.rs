//! Canvas drawers, one per primitive kind.
//!
//! Every drawer lazily builds its pipeline for the canvas format, appends its
//! instances to a frame-scoped buffer and records a `LoadOp::Load` pass.

mod common;

pub mod circle;
pub mod primitives;
pub mod rect;
pub mod sprite;

pub use circle::{Circle, CircleRenderer};
pub use primitives::{strip_indices, LineStrip, PrimitiveRenderer, PrimitiveVertex, STRIP_RESTART};
pub use rect::{RectRenderer, Rectangle, DEFAULT_STRETCH};
pub use sprite::{Sprite, SpriteInstance, SpriteRenderer, SHEET_FORMAT};

pub(crate) use common::{QuadBuffers, QuadVertex};
