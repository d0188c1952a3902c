//! Non-instanced points and line strips.
//!
//! Coverage for slanted lines is whatever the backend's line rasterizer does;
//! only axis-aligned lines through pixel centers are pixel exact.

use bytemuck::{Pod, Zeroable};

use crate::render::{RenderCtx, RenderTarget};

use super::common::{begin_canvas_pass, canvas_shader_source, premul_alpha_blend, FrameBuffer};

/// Index that ends one line strip and starts the next within a draw.
pub const STRIP_RESTART: u32 = u32::MAX;

/// One vertex of a point list or line strip, in canvas coordinates.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct PrimitiveVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl PrimitiveVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x2, // position
        1 => Float32x4  // color
    ];

    #[inline]
    pub fn new(position: [f32; 2], color: [f32; 4]) -> Self {
        Self { position, color }
    }

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PrimitiveVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Connected polyline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineStrip {
    pub points: Vec<PrimitiveVertex>,
}

impl LineStrip {
    pub fn new(points: Vec<PrimitiveVertex>) -> Self {
        Self { points }
    }
}

impl FromIterator<PrimitiveVertex> for LineStrip {
    fn from_iter<I: IntoIterator<Item = PrimitiveVertex>>(iter: I) -> Self {
        Self { points: iter.into_iter().collect() }
    }
}

/// Flattens `strips` into one vertex list and a restart-separated index list.
///
/// Strips with fewer than two points draw nothing and are left out.
pub fn strip_indices(strips: &[LineStrip]) -> (Vec<PrimitiveVertex>, Vec<u32>) {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for strip in strips.iter().filter(|s| s.points.len() >= 2) {
        if !indices.is_empty() {
            indices.push(STRIP_RESTART);
        }
        let base = vertices.len() as u32;
        indices.extend((0..strip.points.len() as u32).map(|i| base + i));
        vertices.extend_from_slice(&strip.points);
    }

    (vertices, indices)
}

/// Point list and line strip drawer.
#[derive(Default)]
pub struct PrimitiveRenderer {
    pipeline_format: Option<wgpu::TextureFormat>,
    points_pipeline: Option<wgpu::RenderPipeline>,
    lines_pipeline: Option<wgpu::RenderPipeline>,
    vertices: Option<FrameBuffer<PrimitiveVertex>>,
    indices: Option<FrameBuffer<u32>>,
}

impl PrimitiveRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_frame(&mut self) {
        if let Some(v) = self.vertices.as_mut() {
            v.reset();
        }
        if let Some(i) = self.indices.as_mut() {
            i.reset();
        }
    }

    pub fn render_points(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        points: &[PrimitiveVertex],
    ) {
        if points.is_empty() {
            return;
        }

        self.ensure_pipelines(ctx);
        let vertices = self.vertices.get_or_insert_with(|| {
            FrameBuffer::new("pixcanvas primitive vertices", wgpu::BufferUsages::VERTEX)
                .with_capacity(ctx.device, ctx.instance_capacity)
        });

        let Some((vbo, range)) = vertices.push(ctx.device, ctx.queue, points) else { return };
        let Some(pipeline) = self.points_pipeline.as_ref() else { return };

        let mut rpass = begin_canvas_pass(target.encoder, target.color_view, "pixcanvas points pass");
        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, ctx.canvas.bind_group(), &[]);
        rpass.set_vertex_buffer(0, vbo.slice(..));
        rpass.draw(range, 0..1);
    }

    pub fn render_lines(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        strips: &[LineStrip],
    ) {
        let (flat, strip_idx) = strip_indices(strips);
        if strip_idx.is_empty() {
            return;
        }

        self.ensure_pipelines(ctx);
        let vertices = self.vertices.get_or_insert_with(|| {
            FrameBuffer::new("pixcanvas primitive vertices", wgpu::BufferUsages::VERTEX)
                .with_capacity(ctx.device, ctx.instance_capacity)
        });
        let indices = self.indices.get_or_insert_with(|| {
            FrameBuffer::new("pixcanvas primitive indices", wgpu::BufferUsages::INDEX)
                .with_capacity(ctx.device, ctx.instance_capacity)
        });

        let Some((vbo, vrange)) = vertices.push(ctx.device, ctx.queue, &flat) else { return };
        let Some((ibo, irange)) = indices.push(ctx.device, ctx.queue, &strip_idx) else { return };
        let Some(pipeline) = self.lines_pipeline.as_ref() else { return };

        let mut rpass = begin_canvas_pass(target.encoder, target.color_view, "pixcanvas lines pass");
        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, ctx.canvas.bind_group(), &[]);
        rpass.set_vertex_buffer(0, vbo.slice(..));
        rpass.set_index_buffer(ibo.slice(..), wgpu::IndexFormat::Uint32);
        // Strip indices are relative to the batch; the restart value is
        // compared before the base vertex is applied.
        rpass.draw_indexed(irange, vrange.start as i32, 0..1);
    }

    fn ensure_pipelines(&mut self, ctx: &RenderCtx<'_>) {
        let format = ctx.canvas.format();
        if self.pipeline_format == Some(format)
            && self.points_pipeline.is_some()
            && self.lines_pipeline.is_some()
        {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("pixcanvas primitive shader"),
            source: wgpu::ShaderSource::Wgsl(
                canvas_shader_source(include_str!("../shaders/primitive.wgsl")).into(),
            ),
        });

        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pixcanvas primitive pipeline layout"),
            bind_group_layouts: &[ctx.canvas.bind_group_layout()],
            immediate_size: 0,
        });

        let build = |label: &str,
                     topology: wgpu::PrimitiveTopology,
                     strip_index_format: Option<wgpu::IndexFormat>| {
            ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[PrimitiveVertex::layout()],
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
                    topology,
                    strip_index_format,
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
            })
        };

        let points = build("pixcanvas points pipeline", wgpu::PrimitiveTopology::PointList, None);
        let lines = build(
            "pixcanvas lines pipeline",
            wgpu::PrimitiveTopology::LineStrip,
            Some(wgpu::IndexFormat::Uint32),
        );

        log::debug!("primitive pipelines created for {format:?}");
        self.pipeline_format = Some(format);
        self.points_pipeline = Some(points);
        self.lines_pipeline = Some(lines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32) -> PrimitiveVertex {
        PrimitiveVertex::new([x, 0.0], [1.0; 4])
    }

    #[test]
    fn vertex_stride() {
        assert_eq!(PrimitiveVertex::layout().array_stride, 24);
    }

    #[test]
    fn strips_are_separated_by_restart() {
        let strips = [
            LineStrip::new(vec![v(0.0), v(1.0), v(2.0)]),
            LineStrip::new(vec![v(5.0), v(6.0)]),
        ];
        let (verts, idx) = strip_indices(&strips);
        assert_eq!(verts.len(), 5);
        assert_eq!(idx, vec![0, 1, 2, STRIP_RESTART, 3, 4]);
    }

    #[test]
    fn short_strips_are_dropped() {
        let strips = [
            LineStrip::new(vec![v(0.0)]),
            LineStrip::default(),
            LineStrip::new(vec![v(1.0), v(2.0)]),
        ];
        let (verts, idx) = strip_indices(&strips);
        assert_eq!(verts, vec![v(1.0), v(2.0)]);
        assert_eq!(idx, vec![0, 1]);
    }

    #[test]
    fn no_strips_no_indices() {
        let (verts, idx) = strip_indices(&[]);
        assert!(verts.is_empty() && idx.is_empty());
    }

    #[test]
    fn line_strip_collects() {
        let s: LineStrip = (0..3).map(|i| v(i as f32)).collect();
        assert_eq!(s.points.len(), 3);
    }
}
