use crate::coords::CanvasInfo;
use crate::device::{Gpu, SurfaceErrorAction};
use crate::render::{PixelRenderer, Scene, SurfaceTarget};
use crate::sheet::SpriteEntry;
use crate::time::FrameTime;

use super::app::AppControl;

/// Per-frame context passed to [`App::on_frame`](super::App::on_frame).
pub struct FrameCtx<'a> {
    /// Canvas resolution; draw coordinates run over `0..width` × `0..height`.
    pub canvas: CanvasInfo,
    pub time: FrameTime,
    /// Cleared before every frame. Batches are drawn in push order.
    pub scene: &'a mut Scene,
    /// Entry table of the uploaded sheet.
    pub sprites: &'a [SpriteEntry],
}

/// Acquires a surface frame, records `scene` through `renderer` and presents.
///
/// Surface errors are absorbed except fatal ones, which end the loop.
pub(crate) fn present_scene(
    gpu: &mut Gpu<'_>,
    renderer: &mut PixelRenderer,
    scene: &Scene,
    pre_present: impl FnOnce(),
) -> AppControl {
    let (w, h) = gpu.size();
    if w == 0 || h == 0 {
        return AppControl::Continue;
    }

    let mut frame = match gpu.begin_frame() {
        Ok(f) => f,
        Err(err) => {
            if gpu.handle_surface_error(err) == SurfaceErrorAction::Fatal {
                return AppControl::Exit;
            }
            return AppControl::Continue;
        }
    };

    let size = frame.size();
    renderer.render(
        gpu.device(),
        gpu.queue(),
        SurfaceTarget {
            encoder: &mut frame.encoder,
            view: &frame.view,
            format: gpu.surface_format(),
            size,
        },
        scene,
    );

    pre_present();
    gpu.submit(frame);
    AppControl::Continue
}
