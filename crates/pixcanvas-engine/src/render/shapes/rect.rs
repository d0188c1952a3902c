use bytemuck::{Pod, Zeroable};

use crate::render::{RenderCtx, RenderTarget};

use super::common::{
    begin_canvas_pass, canvas_shader_source, premul_alpha_blend, FrameBuffer, QuadBuffers,
    QuadVertex,
};

/// Default corner-inclusion margin, in pixels.
///
/// Tuned against rasterizers that only include a pixel whose center is
/// strictly inside the shape. Backends with a different rule may need another
/// value; see [`RenderConfig::stretch`](crate::render::RenderConfig::stretch).
pub const DEFAULT_STRETCH: f32 = 0.002;

/// Filled axis-aligned rectangle.
///
/// Instance layout (32 bytes):
///
///  offset  0  offset      [i32; 2]   loc 1
///  offset  8  dimensions  [u32; 2]   loc 2
///  offset 16  color       [f32; 4]   loc 3
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Rectangle {
    /// Canvas position of the minimum (bottom-left) pixel.
    pub offset: [i32; 2],
    /// Width and height in pixels, both at least 1.
    pub dimensions: [u32; 2],
    /// Straight linear RGBA.
    pub color: [f32; 4],
}

impl Rectangle {
    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        1 => Sint32x2,  // offset
        2 => Uint32x2,  // dimensions
        3 => Float32x4  // color
    ];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Rectangle>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }

    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.dimensions[0] == 0 || self.dimensions[1] == 0
    }

    /// Canvas-space position of a unit-quad corner, before `to_clip`.
    ///
    /// `offset + (dimensions - 1 + 2s) * corner - s`: the footprint spans from the
    /// first to the last covered pixel coordinate, widened by `s` on every side.
    #[inline]
    pub fn corner_position(&self, corner: [f32; 2], stretch: f32) -> [f32; 2] {
        let ext_x = self.dimensions[0] as f32 - 1.0 + 2.0 * stretch;
        let ext_y = self.dimensions[1] as f32 - 1.0 + 2.0 * stretch;
        [
            self.offset[0] as f32 + ext_x * corner[0] - stretch,
            self.offset[1] as f32 + ext_y * corner[1] - stretch,
        ]
    }
}

/// Instanced rectangle drawer.
#[derive(Default)]
pub struct RectRenderer {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,
    quad: Option<QuadBuffers>,
    instances: Option<FrameBuffer<Rectangle>>,
}

impl RectRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets instance ranges of the previous frame.
    pub fn begin_frame(&mut self) {
        if let Some(instances) = self.instances.as_mut() {
            instances.reset();
        }
    }

    /// Draws `rects` over the canvas in one instanced call.
    ///
    /// Degenerate rectangles must be filtered by the caller.
    pub fn render(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>, rects: &[Rectangle]) {
        if rects.is_empty() {
            return;
        }

        self.ensure_pipeline(ctx);
        if self.quad.is_none() {
            self.quad = Some(QuadBuffers::new(ctx.device, "pixcanvas rect"));
        }
        let instances = self.instances.get_or_insert_with(|| {
            FrameBuffer::new("pixcanvas rect instances", wgpu::BufferUsages::VERTEX)
                .with_capacity(ctx.device, ctx.instance_capacity)
        });

        let Some((instance_vbo, range)) = instances.push(ctx.device, ctx.queue, rects) else { return };
        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(quad) = self.quad.as_ref() else { return };

        let mut rpass = begin_canvas_pass(target.encoder, target.color_view, "pixcanvas rect pass");
        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, ctx.canvas.bind_group(), &[]);
        rpass.set_vertex_buffer(0, quad.vbo.slice(..));
        rpass.set_vertex_buffer(1, instance_vbo.slice(..));
        rpass.set_index_buffer(quad.ibo.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..6, 0, range);
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        let format = ctx.canvas.format();
        if self.pipeline_format == Some(format) && self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("pixcanvas rect shader"),
            source: wgpu::ShaderSource::Wgsl(
                canvas_shader_source(include_str!("../shaders/rect.wgsl")).into(),
            ),
        });

        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pixcanvas rect pipeline layout"),
            bind_group_layouts: &[ctx.canvas.bind_group_layout()],
            immediate_size: 0,
        });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("pixcanvas rect pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[QuadVertex::layout(), Rectangle::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(premul_alpha_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!("rect pipeline created for {format:?}");
        self.pipeline_format = Some(format);
        self.pipeline = Some(pipeline);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: i32, y: i32, w: u32, h: u32) -> Rectangle {
        Rectangle { offset: [x, y], dimensions: [w, h], color: [1.0; 4] }
    }

    #[test]
    fn instance_layout_matches_struct() {
        assert_eq!(std::mem::size_of::<Rectangle>(), 32);
        assert_eq!(Rectangle::layout().array_stride, 32);
        let offsets: Vec<u64> = Rectangle::ATTRS.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 8, 16]);
    }

    #[test]
    fn footprint_spans_first_to_last_pixel_plus_margin() {
        let r = rect(2, 3, 4, 1);
        assert_eq!(r.corner_position([0.0, 0.0], 0.0), [2.0, 3.0]);
        assert_eq!(r.corner_position([1.0, 1.0], 0.0), [5.0, 3.0]);

        let lo = r.corner_position([0.0, 0.0], 0.25);
        let hi = r.corner_position([1.0, 1.0], 0.25);
        assert_eq!(lo, [1.75, 2.75]);
        assert_eq!(hi, [5.25, 3.25]);
    }

    #[test]
    fn zero_dimension_is_degenerate() {
        assert!(rect(0, 0, 0, 3).is_degenerate());
        assert!(rect(0, 0, 3, 0).is_degenerate());
        assert!(!rect(0, 0, 1, 1).is_degenerate());
    }
}
