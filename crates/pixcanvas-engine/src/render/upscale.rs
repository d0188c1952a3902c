//! Canvas to display blit.
//!
//! The canvas is scaled by the largest whole factor that fits the display and
//! centered; the uncovered border is cleared to the letterbox color.

use bytemuck::{Pod, Zeroable};

use crate::coords::CanvasInfo;

use super::canvas::Canvas;
use super::shapes::{QuadBuffers, QuadVertex};

/// Sampler filter used when magnifying the canvas.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum UpscaleFilter {
    /// Every canvas pixel becomes a `k×k` block.
    #[default]
    Nearest,
    Linear,
}

impl UpscaleFilter {
    fn to_wgpu(self) -> wgpu::FilterMode {
        match self {
            UpscaleFilter::Nearest => wgpu::FilterMode::Nearest,
            UpscaleFilter::Linear => wgpu::FilterMode::Linear,
        }
    }
}

/// Placement of the scaled canvas on the display, in display pixels (y up).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ActiveQuad {
    /// Display pixel of the canvas's bottom-left corner. Negative when the
    /// display is smaller than the canvas.
    pub offset: [i32; 2],
    pub size: [u32; 2],
    pub scale: u32,
}

impl ActiveQuad {
    /// Clip-space `(lo, hi)` corners of the quad on a `surface` sized display.
    pub fn clip_bounds(&self, surface: (u32, u32)) -> ([f32; 2], [f32; 2]) {
        let sw = surface.0.max(1) as f32;
        let sh = surface.1.max(1) as f32;
        let lo = [
            self.offset[0] as f32 / sw * 2.0 - 1.0,
            self.offset[1] as f32 / sh * 2.0 - 1.0,
        ];
        let hi = [
            (self.offset[0] as f32 + self.size[0] as f32) / sw * 2.0 - 1.0,
            (self.offset[1] as f32 + self.size[1] as f32) / sh * 2.0 - 1.0,
        ];
        (lo, hi)
    }

    /// Canvas pixel shown at display pixel `(x, y)`, or `None` in the letterbox.
    pub fn canvas_pixel(&self, x: u32, y: u32) -> Option<(u32, u32)> {
        let dx = x as i64 - self.offset[0] as i64;
        let dy = y as i64 - self.offset[1] as i64;
        if dx < 0 || dy < 0 || dx >= self.size[0] as i64 || dy >= self.size[1] as i64 {
            return None;
        }
        let k = self.scale as i64;
        Some(((dx / k) as u32, (dy / k) as u32))
    }
}

/// Largest whole-number magnification of `canvas` that fits `surface`, centered.
///
/// The scale never drops below 1; a display smaller than the canvas crops it.
pub fn active_quad(surface: (u32, u32), canvas: CanvasInfo) -> ActiveQuad {
    let (cw, ch) = (canvas.width().max(1), canvas.height().max(1));
    let scale = (surface.0 / cw).min(surface.1 / ch).max(1);
    let size = [cw * scale, ch * scale];
    let offset = [
        (surface.0 as i64 - size[0] as i64).div_euclid(2) as i32,
        (surface.1 as i64 - size[1] as i64).div_euclid(2) as i32,
    ];
    ActiveQuad { offset, size, scale }
}

/// Mirrors `ActiveQuad` in `upscale.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct QuadUniform {
    lo: [f32; 2],
    hi: [f32; 2],
}

/// Full-screen blit of the canvas into the display surface.
pub struct UpscaleRenderer {
    filter: UpscaleFilter,
    letterbox: wgpu::Color,

    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group_layout: Option<wgpu::BindGroupLayout>,
    bind_group: Option<wgpu::BindGroup>,
    uniform: Option<wgpu::Buffer>,
    quad: Option<QuadBuffers>,
    /// Surface size the uniform was last written for.
    uniform_surface: Option<(u32, u32)>,
}

impl UpscaleRenderer {
    pub fn new(filter: UpscaleFilter, letterbox: wgpu::Color) -> Self {
        Self {
            filter,
            letterbox,
            pipeline_format: None,
            pipeline: None,
            bind_group_layout: None,
            bind_group: None,
            uniform: None,
            quad: None,
            uniform_surface: None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
        surface_format: wgpu::TextureFormat,
        surface_size: (u32, u32),
        canvas: &Canvas,
    ) {
        self.ensure_pipeline(device, surface_format);
        self.ensure_bindings(device, canvas);
        if self.quad.is_none() {
            self.quad = Some(QuadBuffers::new(device, "pixcanvas upscale"));
        }

        if self.uniform_surface != Some(surface_size) {
            let quad = active_quad(surface_size, canvas.info());
            let (lo, hi) = quad.clip_bounds(surface_size);
            if let Some(ubo) = self.uniform.as_ref() {
                queue.write_buffer(ubo, 0, bytemuck::bytes_of(&QuadUniform { lo, hi }));
            }
            log::debug!(
                "upscale ×{} at {:?} on {}×{}",
                quad.scale,
                quad.offset,
                surface_size.0,
                surface_size.1
            );
            self.uniform_surface = Some(surface_size);
        }

        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(bind_group) = self.bind_group.as_ref() else { return };
        let Some(quad) = self.quad.as_ref() else { return };

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("pixcanvas upscale pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: surface_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.letterbox),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.set_vertex_buffer(0, quad.vbo.slice(..));
        rpass.set_index_buffer(quad.ibo.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..6, 0, 0..1);
    }

    // ── lazy-init helpers ──────────────────────────────────────────────────

    fn ensure_bindings(&mut self, device: &wgpu::Device, canvas: &Canvas) {
        if self.bind_group.is_some() {
            return;
        }
        let Some(bgl) = self.bind_group_layout.as_ref() else { return };

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("pixcanvas upscale sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: self.filter.to_wgpu(),
            min_filter: self.filter.to_wgpu(),
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let uniform = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("pixcanvas upscale ubo"),
            size: std::mem::size_of::<QuadUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("pixcanvas upscale bind group"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(canvas.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniform.as_entire_binding(),
                },
            ],
        });

        self.bind_group = Some(bind_group);
        self.uniform = Some(uniform);
        self.uniform_surface = None;
    }

    fn ensure_pipeline(&mut self, device: &wgpu::Device, format: wgpu::TextureFormat) {
        if self.pipeline_format == Some(format) && self.pipeline.is_some() {
            return;
        }

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("pixcanvas upscale shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/upscale.wgsl").into()),
        });

        let bgl = self.bind_group_layout.get_or_insert_with(|| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("pixcanvas upscale bgl"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::VERTEX,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: wgpu::BufferSize::new(
                                std::mem::size_of::<QuadUniform>() as u64,
                            ),
                        },
                        count: None,
                    },
                ],
            })
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pixcanvas upscale pipeline layout"),
            bind_group_layouts: &[bgl],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("pixcanvas upscale pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[QuadVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
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

        log::debug!("upscale pipeline created for {format:?}");
        self.pipeline_format = Some(format);
        self.pipeline = Some(pipeline);
    }
}
