//! Canvas coordinate space and color types shared by every drawer.
//!
//! Canonical canvas space:
//! - Integer pixels, origin at the bottom-left pixel
//! - +X right, +Y up
//! - Pixel `(x, y)` covers `[x, x + 1) × [y, y + 1)` in device space, center at `+0.5`
//!
//! Every position reaches clip space through [`to_clip`]; shaders call the WGSL
//! twin of the same function.

mod canvas;
mod color;

pub use canvas::{clip_to_device, to_clip, CanvasInfo};
pub use color::{srgb_to_linear, ColorRgba};
