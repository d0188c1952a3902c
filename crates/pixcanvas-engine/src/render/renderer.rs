use std::borrow::Cow;

use anyhow::{anyhow, ensure, Result};

use crate::coords::{CanvasInfo, ColorRgba};
use crate::sheet::{SheetBuilder, SheetPixels, SpriteEntry};

use super::canvas::Canvas;
use super::scene::{Batch, Scene};
use super::shapes::{
    CircleRenderer, PrimitiveRenderer, RectRenderer, SpriteRenderer, DEFAULT_STRETCH,
};
use super::upscale::{UpscaleFilter, UpscaleRenderer};
use super::{RenderCtx, RenderTarget};

/// Canvas and blit settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Canvas resolution in pixels. Both must be non-zero.
    pub canvas: (u32, u32),

    /// Rectangle corner-inclusion margin in pixels.
    ///
    /// [`DEFAULT_STRETCH`] suits rasterizers that include only pixels whose
    /// center lies strictly inside a triangle.
    pub stretch: f32,

    pub upscale_filter: UpscaleFilter,

    /// Canvas color at the start of every frame (straight linear RGBA).
    pub clear_color: [f32; 4],

    /// Display color around the scaled canvas (straight linear RGBA).
    pub letterbox_color: [f32; 4],

    /// Initial slot count of each drawer's instance buffer.
    pub initial_instance_capacity: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            canvas: (320, 180),
            stretch: DEFAULT_STRETCH,
            upscale_filter: UpscaleFilter::Nearest,
            clear_color: ColorRgba::black().to_array(),
            letterbox_color: ColorRgba::black().to_array(),
            initial_instance_capacity: 256,
        }
    }
}

/// Display surface a frame is presented to.
pub struct SurfaceTarget<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub view: &'a wgpu::TextureView,
    pub format: wgpu::TextureFormat,
    /// Physical pixels.
    pub size: (u32, u32),
}

/// Draws a [`Scene`] into the off-screen canvas in batch order, then blits the
/// canvas to the display.
pub struct PixelRenderer {
    config: RenderConfig,
    canvas: Canvas,

    rects: RectRenderer,
    circles: CircleRenderer,
    sprites: SpriteRenderer,
    primitives: PrimitiveRenderer,
    upscale: UpscaleRenderer,
}

impl PixelRenderer {
    /// Creates the canvas target and the drawers.
    ///
    /// Fails on a zero or oversized canvas, a non-finite or negative stretch, and
    /// non-finite clear or letterbox colors.
    pub fn new(device: &wgpu::Device, config: RenderConfig) -> Result<Self> {
        let (w, h) = config.canvas;
        let info = CanvasInfo::new(w, h)
            .ok_or_else(|| anyhow!("canvas resolution must be non-zero, got {w}×{h}"))?;

        let max = device.limits().max_texture_dimension_2d;
        ensure!(
            w <= max && h <= max,
            "canvas resolution {w}×{h} exceeds the device texture limit {max}"
        );
        ensure!(
            config.stretch.is_finite() && config.stretch >= 0.0,
            "stretch must be finite and non-negative, got {}",
            config.stretch
        );

        let clear = ColorRgba::from(config.clear_color);
        let letterbox = ColorRgba::from(config.letterbox_color);
        ensure!(
            clear.is_finite() && letterbox.is_finite(),
            "clear and letterbox colors must be finite, got {clear:?} and {letterbox:?}"
        );

        let canvas = Canvas::new(device, info, config.stretch);
        let upscale = UpscaleRenderer::new(config.upscale_filter, letterbox.premultiplied().to_wgpu());

        log::info!("pixel renderer ready: canvas {w}×{h}, {:?} upscale", config.upscale_filter);

        Ok(Self {
            config,
            canvas,
            rects: RectRenderer::new(),
            circles: CircleRenderer::new(),
            sprites: SpriteRenderer::new(),
            primitives: PrimitiveRenderer::new(),
            upscale,
        })
    }

    #[inline]
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    #[inline]
    pub fn canvas_info(&self) -> CanvasInfo {
        self.canvas.info()
    }

    /// A builder for a sheet that fits this device's texture limit.
    pub fn sheet_builder(&self, device: &wgpu::Device, name: impl Into<String>) -> SheetBuilder {
        SheetBuilder::new(name, device.limits().max_texture_dimension_2d)
    }

    /// Uploads `sheet` for all following sprite batches.
    pub fn upload_sheet(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, sheet: SheetPixels) {
        self.sprites.upload_sheet(device, queue, sheet);
    }

    /// Entry table of the uploaded sheet.
    pub fn sprite_entries(&self) -> &[SpriteEntry] {
        self.sprites.entries()
    }

    /// Records the whole frame into `surface.encoder`.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface: SurfaceTarget<'_>,
        scene: &Scene,
    ) {
        self.rects.begin_frame();
        self.circles.begin_frame();
        self.sprites.begin_frame();
        self.primitives.begin_frame();

        self.clear_canvas(surface.encoder);

        let ctx = RenderCtx::new(device, queue, &self.canvas, self.config.initial_instance_capacity);
        for batch in scene.batches() {
            let mut target = RenderTarget::new(&mut *surface.encoder, self.canvas.view());
            match batch {
                Batch::Rects(rects) => {
                    let rects = non_degenerate(rects, |r| r.is_degenerate(), "rectangles");
                    self.rects.render(&ctx, &mut target, &rects);
                }
                Batch::Circles(circles) => {
                    let circles = non_degenerate(circles, |c| c.is_degenerate(), "circles");
                    self.circles.render(&ctx, &mut target, &circles);
                }
                Batch::Sprites(sprites) => self.sprites.render(&ctx, &mut target, sprites),
                Batch::Points(points) => self.primitives.render_points(&ctx, &mut target, points),
                Batch::LineStrips(strips) => self.primitives.render_lines(&ctx, &mut target, strips),
            }
        }

        self.upscale.render(
            device,
            queue,
            surface.encoder,
            surface.view,
            surface.format,
            surface.size,
            &self.canvas,
        );
    }

    fn clear_canvas(&self, encoder: &mut wgpu::CommandEncoder) {
        let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("pixcanvas canvas clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: self.canvas.view(),
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(ColorRgba::from(self.config.clear_color).premultiplied().to_wgpu()),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
    }
}

/// Borrows `items` unchanged unless some are zero-sized, which are dropped.
fn non_degenerate<'a, T: Clone>(
    items: &'a [T],
    degenerate: impl Fn(&T) -> bool,
    kind: &str,
) -> Cow<'a, [T]> {
    let dropped = items.iter().filter(|i| degenerate(*i)).count();
    if dropped == 0 {
        return Cow::Borrowed(items);
    }
    log::debug!("dropped {dropped} zero-sized {kind}");
    Cow::Owned(items.iter().filter(|i| !degenerate(*i)).cloned().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::shapes::{Circle, Rectangle};

    #[test]
    fn default_config_uses_default_stretch_and_nearest() {
        let c = RenderConfig::default();
        assert_eq!(c.stretch, DEFAULT_STRETCH);
        assert_eq!(c.upscale_filter, UpscaleFilter::Nearest);
        assert!(CanvasInfo::new(c.canvas.0, c.canvas.1).is_some());
        assert_eq!(c.clear_color, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn non_degenerate_borrows_when_clean() {
        let rects = [Rectangle { offset: [0, 0], dimensions: [2, 2], color: [1.0; 4] }];
        let out = non_degenerate(&rects, |r| r.is_degenerate(), "rectangles");
        assert!(matches!(out, Cow::Borrowed(_)));
    }

    #[test]
    fn non_degenerate_drops_zero_sized_in_order() {
        let c = |d: u32| Circle { offset: [d as i32, 0], diameter: d, color: [1.0; 4] };
        let circles = [c(3), c(0), c(5)];
        let out = non_degenerate(&circles, |c| c.is_degenerate(), "circles");
        assert_eq!(&*out, &[c(3), c(5)]);
    }
}
