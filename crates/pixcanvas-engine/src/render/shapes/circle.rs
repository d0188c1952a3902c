use bytemuck::{Pod, Zeroable};

use crate::render::{RenderCtx, RenderTarget};

use super::common::{
    begin_canvas_pass, canvas_shader_source, premul_alpha_blend, FrameBuffer, QuadBuffers,
    QuadVertex,
};

/// Anti-aliased circle drawn as a one-pixel band at the edge of its disc.
///
/// Instance layout (28 bytes):
///
///  offset  0  offset    [i32; 2]   loc 1
///  offset  8  diameter  u32        loc 2
///  offset 12  color     [f32; 4]   loc 3
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Circle {
    /// Canvas position of the bounding box's minimum pixel.
    pub offset: [i32; 2],
    /// Bounding box edge length in pixels, at least 1.
    pub diameter: u32,
    /// Straight linear RGBA.
    pub color: [f32; 4],
}

impl Circle {
    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        1 => Sint32x2,  // offset
        2 => Uint32,    // diameter
        3 => Float32x4  // color
    ];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Circle>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }

    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.diameter == 0
    }

    /// Canvas-space position of a unit-quad corner, before `to_clip`.
    ///
    /// The half-pixel shift puts the box edges on pixel edges, so the box
    /// covers exactly `diameter × diameter` pixel centers.
    #[inline]
    pub fn corner_position(&self, corner: [f32; 2]) -> [f32; 2] {
        let d = self.diameter as f32;
        [
            self.offset[0] as f32 + d * corner[0] - 0.5,
            self.offset[1] as f32 + d * corner[1] - 0.5,
        ]
    }

    /// Fragment color at circle-space coordinate `local` (`2 * corner - 1`).
    ///
    /// Inside the band `1 - 2/diameter <= |local| <= 1` the fill color is
    /// returned, everywhere else transparent black.
    #[inline]
    pub fn shade(&self, local: [f32; 2]) -> [f32; 4] {
        let d = (local[0] * local[0] + local[1] * local[1]).sqrt();
        let t = 2.0 / self.diameter as f32;
        if d >= 1.0 - t && d <= 1.0 {
            self.color
        } else {
            [0.0; 4]
        }
    }
}

/// Instanced circle drawer.
#[derive(Default)]
pub struct CircleRenderer {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,
    quad: Option<QuadBuffers>,
    instances: Option<FrameBuffer<Circle>>,
}

impl CircleRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_frame(&mut self) {
        if let Some(instances) = self.instances.as_mut() {
            instances.reset();
        }
    }

    pub fn render(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>, circles: &[Circle]) {
        if circles.is_empty() {
            return;
        }

        self.ensure_pipeline(ctx);
        if self.quad.is_none() {
            self.quad = Some(QuadBuffers::new(ctx.device, "pixcanvas circle"));
        }
        let instances = self.instances.get_or_insert_with(|| {
            FrameBuffer::new("pixcanvas circle instances", wgpu::BufferUsages::VERTEX)
                .with_capacity(ctx.device, ctx.instance_capacity)
        });

        let Some((instance_vbo, range)) = instances.push(ctx.device, ctx.queue, circles) else { return };
        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(quad) = self.quad.as_ref() else { return };

        let mut rpass = begin_canvas_pass(target.encoder, target.color_view, "pixcanvas circle pass");
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
            label: Some("pixcanvas circle shader"),
            source: wgpu::ShaderSource::Wgsl(
                canvas_shader_source(include_str!("../shaders/circle.wgsl")).into(),
            ),
        });

        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pixcanvas circle pipeline layout"),
            bind_group_layouts: &[ctx.canvas.bind_group_layout()],
            immediate_size: 0,
        });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("pixcanvas circle pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[QuadVertex::layout(), Circle::layout()],
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

        log::debug!("circle pipeline created for {format:?}");
        self.pipeline_format = Some(format);
        self.pipeline = Some(pipeline);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle(diameter: u32) -> Circle {
        Circle { offset: [0, 0], diameter, color: [0.0, 1.0, 0.0, 1.0] }
    }

    #[test]
    fn diameter_does_not_overlap_color() {
        assert_eq!(std::mem::size_of::<Circle>(), 28);
        let offsets: Vec<u64> = Circle::ATTRS.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 8, 12]);
    }

    #[test]
    fn box_edges_sit_on_pixel_edges() {
        let c = Circle { offset: [4, 6], ..circle(5) };
        assert_eq!(c.corner_position([0.0, 0.0]), [3.5, 5.5]);
        assert_eq!(c.corner_position([1.0, 1.0]), [8.5, 10.5]);
    }

    #[test]
    fn band_is_one_pixel_wide() {
        let c = circle(10);
        // t = 0.2: band is 0.8..=1.0
        assert_eq!(c.shade([0.9, 0.0]), c.color);
        assert_eq!(c.shade([0.0, -1.0]), c.color);
        assert_eq!(c.shade([0.5, 0.0]), [0.0; 4]);
        assert_eq!(c.shade([0.0, 0.0]), [0.0; 4]);
        assert_eq!(c.shade([0.8, 0.8]), [0.0; 4]);
    }

    #[test]
    fn diameter_one_covers_whole_disc() {
        let c = circle(1);
        assert_eq!(c.shade([0.0, 0.0]), c.color);
        assert_eq!(c.shade([0.6, 0.6]), c.color);
    }
}
