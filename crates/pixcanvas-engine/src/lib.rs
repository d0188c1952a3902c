//! Pixel-precise 2D canvas renderer.
//!
//! Primitives are drawn into a fixed-resolution off-screen canvas addressed in
//! integer pixels, which is then magnified onto the window. The crate owns the
//! coordinate mapping, the drawers and their CPU reference, the sprite sheet
//! arena and a small winit/wgpu runtime to host them.

pub mod coords;
pub mod core;
pub mod device;
pub mod logging;
pub mod raster;
pub mod render;
pub mod sheet;
pub mod time;
pub mod window;
