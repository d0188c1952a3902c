//! GPU rendering subsystem.
//!
//! Drawers write into an off-screen canvas addressed in integer pixels with the
//! origin at the bottom-left; the upscale blitter then presents the canvas on
//! the display surface.
//!
//! Convention:
//! - integer canvas coordinates land on pixel centers (`to_clip` in `common.wgsl`)
//! - colors are straight linear RGBA; shaders premultiply their output and the
//!   canvas stores premultiplied values
//! - batches are drawn in submission order, later ones on top

mod canvas;
mod ctx;
mod renderer;
mod scene;
pub mod shapes;
mod upscale;

pub use canvas::{Canvas, CANVAS_FORMAT};
pub use ctx::{RenderCtx, RenderTarget};
pub use renderer::{PixelRenderer, RenderConfig, SurfaceTarget};
pub use scene::{Batch, Scene};
pub use upscale::{active_quad, ActiveQuad, UpscaleFilter, UpscaleRenderer};
