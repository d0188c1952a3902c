//! CPU reference rasterizer.
//!
//! Every drawer is evaluated at pixel centers with the same vertex mapping and
//! fragment function as its WGSL counterpart, so the exact pixel placement the
//! GPU path promises can be checked without a device.
//!
//! Coverage follows the usual top-left fill convention for axis-aligned quads:
//! a pixel is covered when its center lies in `[x0, x1) × [y0, y1)` of the quad
//! in device space. Line strips depend on the backend's line rasterizer and are
//! not modelled.

mod soft_canvas;

pub use soft_canvas::SoftCanvas;
