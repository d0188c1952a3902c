use bytemuck::{Pod, Zeroable};

use crate::render::{RenderCtx, RenderTarget};
use crate::sheet::{SheetPixels, SpriteEntry, SpriteHandle};

use super::common::{
    begin_canvas_pass, canvas_shader_source, premul_alpha_blend, FrameBuffer, QuadBuffers,
    QuadVertex,
};

/// Texture format of uploaded sheets. Sprite pixels are sRGB encoded.
pub const SHEET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Caller-facing sprite draw: which sprite, where.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SpriteInstance {
    /// Canvas position of the sprite's bottom-left pixel, before the entry offset.
    pub position: [i32; 2],
    pub sprite: SpriteHandle,
}

impl SpriteInstance {
    #[inline]
    pub fn new(position: [i32; 2], sprite: SpriteHandle) -> Self {
        Self { position, sprite }
    }

    /// Looks the sprite up in `entries` and applies its draw offset.
    pub fn resolve(&self, entries: &[SpriteEntry]) -> Option<Sprite> {
        let entry = entries.get(self.sprite.index())?;
        Some(Sprite {
            position: [
                self.position[0].wrapping_add(entry.offset.0),
                self.position[1].wrapping_add(entry.offset.1),
            ],
            dimensions: [entry.width(), entry.height()],
            address: entry.address,
        })
    }
}

/// GPU sprite record.
///
/// Instance layout (20 bytes):
///
///  offset  0  position    [i32; 2]   loc 1
///  offset  8  dimensions  [u32; 2]   loc 2
///  offset 16  address     u32        loc 3
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Pod, Zeroable)]
pub struct Sprite {
    pub position: [i32; 2],
    pub dimensions: [u32; 2],
    /// Logical arena index of the sprite's top-left pixel.
    pub address: u32,
}

impl Sprite {
    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        1 => Sint32x2,  // position
        2 => Uint32x2,  // dimensions
        3 => Uint32     // address
    ];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Sprite>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }

    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.dimensions[0] == 0 || self.dimensions[1] == 0
    }

    /// Canvas-space position of a unit-quad corner, before `to_clip`.
    #[inline]
    pub fn corner_position(&self, corner: [f32; 2]) -> [f32; 2] {
        [
            self.position[0] as f32 + self.dimensions[0] as f32 * corner[0] - 0.5,
            self.position[1] as f32 + self.dimensions[1] as f32 * corner[1] - 0.5,
        ]
    }

    /// Sprite-space coordinate at a unit-quad corner: x right, y down from the
    /// top row, integral at pixel centers.
    #[inline]
    pub fn local_coord(&self, corner: [f32; 2]) -> [f32; 2] {
        [
            self.dimensions[0] as f32 * corner[0] - 0.5,
            self.dimensions[1] as f32 * (1.0 - corner[1]) - 0.5,
        ]
    }

    /// Logical arena index read for the interpolated coordinate `local`.
    ///
    /// Snaps with ties-to-even, like WGSL `round`. Nothing is clamped against
    /// the sprite's bounds.
    #[inline]
    pub fn logical_index(&self, local: [f32; 2]) -> u32 {
        let x = local[0].round_ties_even().max(0.0) as u32;
        let y = local[1].round_ties_even().max(0.0) as u32;
        self.address
            .wrapping_add(x)
            .wrapping_add(y.wrapping_mul(self.dimensions[0]))
    }

    /// RGBA8 texel the fragment stage loads at `local`.
    pub fn sample(&self, sheet: &SheetPixels, local: [f32; 2]) -> [u8; 4] {
        let (x, y) = sheet.layout().locate(self.logical_index(local));
        sheet.load(x, y)
    }
}

impl SheetPixels {
    /// Resolves a sprite draw against this sheet's entry table.
    #[inline]
    pub fn resolve(&self, instance: &SpriteInstance) -> Option<Sprite> {
        instance.resolve(self.entries())
    }
}

/// An uploaded sheet texture and its bind group.
struct GpuSheet {
    // Kept alive for the view.
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    entries: Box<[SpriteEntry]>,
}

/// Instanced sprite drawer. Owns the uploaded sheet.
#[derive(Default)]
pub struct SpriteRenderer {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,
    sheet_bgl: Option<wgpu::BindGroupLayout>,
    sheet: Option<GpuSheet>,
    quad: Option<QuadBuffers>,
    instances: Option<FrameBuffer<Sprite>>,
    resolved: Vec<Sprite>,
    warned_no_sheet: bool,
}

impl SpriteRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_frame(&mut self) {
        if let Some(instances) = self.instances.as_mut() {
            instances.reset();
        }
    }

    /// Entry table of the current sheet, empty before the first upload.
    pub fn entries(&self) -> &[SpriteEntry] {
        self.sheet.as_ref().map_or(&[], |s| &s.entries)
    }

    /// Uploads `sheet`, replacing any previous one.
    pub fn upload_sheet(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, sheet: SheetPixels) {
        let (name, layout, height, texels, entries) = sheet.into_parts();
        let width = layout.width();
        let size = wgpu::Extent3d { width, height, depth_or_array_layers: 1 };

        let label = format!("pixcanvas sheet {name}");
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SHEET_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &texels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&label),
            layout: self.sheet_bind_group_layout(device),
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            }],
        });

        log::debug!("uploaded sheet '{name}' ({width}×{height}, {} sprites)", entries.len());
        self.sheet = Some(GpuSheet { _texture: texture, bind_group, entries });
        self.warned_no_sheet = false;
    }

    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        sprites: &[SpriteInstance],
    ) {
        if sprites.is_empty() {
            return;
        }
        let Some(sheet) = self.sheet.as_ref() else {
            if !self.warned_no_sheet {
                log::warn!("sprites drawn before a sheet was uploaded; skipping");
                self.warned_no_sheet = true;
            }
            return;
        };

        self.resolved.clear();
        self.resolved.extend(
            sprites
                .iter()
                .filter_map(|s| s.resolve(&sheet.entries))
                .filter(|s| !s.is_degenerate()),
        );
        let skipped = sprites.len() - self.resolved.len();
        if skipped > 0 {
            log::debug!("skipped {skipped} sprites with unknown handles");
        }

        self.ensure_pipeline(ctx);
        if self.quad.is_none() {
            self.quad = Some(QuadBuffers::new(ctx.device, "pixcanvas sprite"));
        }
        let instances = self.instances.get_or_insert_with(|| {
            FrameBuffer::new("pixcanvas sprite instances", wgpu::BufferUsages::VERTEX)
                .with_capacity(ctx.device, ctx.instance_capacity)
        });

        let Some((instance_vbo, range)) = instances.push(ctx.device, ctx.queue, &self.resolved) else { return };
        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(quad) = self.quad.as_ref() else { return };
        let Some(sheet) = self.sheet.as_ref() else { return };

        let mut rpass = begin_canvas_pass(target.encoder, target.color_view, "pixcanvas sprite pass");
        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, ctx.canvas.bind_group(), &[]);
        rpass.set_bind_group(1, &sheet.bind_group, &[]);
        rpass.set_vertex_buffer(0, quad.vbo.slice(..));
        rpass.set_vertex_buffer(1, instance_vbo.slice(..));
        rpass.set_index_buffer(quad.ibo.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..6, 0, range);
    }

    fn sheet_bind_group_layout(&mut self, device: &wgpu::Device) -> &wgpu::BindGroupLayout {
        self.sheet_bgl.get_or_insert_with(|| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("pixcanvas sheet bgl"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                }],
            })
        })
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        let format = ctx.canvas.format();
        if self.pipeline_format == Some(format) && self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("pixcanvas sprite shader"),
            source: wgpu::ShaderSource::Wgsl(
                canvas_shader_source(include_str!("../shaders/sprite.wgsl")).into(),
            ),
        });

        let sheet_bgl = self.sheet_bind_group_layout(ctx.device);
        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pixcanvas sprite pipeline layout"),
            bind_group_layouts: &[ctx.canvas.bind_group_layout(), sheet_bgl],
            immediate_size: 0,
        });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("pixcanvas sprite pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[QuadVertex::layout(), Sprite::layout()],
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

        log::debug!("sprite pipeline created for {format:?}");
        self.pipeline_format = Some(format);
        self.pipeline = Some(pipeline);
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use super::*;
    use crate::sheet::{SheetBuilder, SpriteData};

    fn entry(address: u32, w: u32, h: u32, offset: (i32, i32)) -> SpriteEntry {
        SpriteEntry {
            address,
            dimensions: (NonZeroU32::new(w).unwrap(), NonZeroU32::new(h).unwrap()),
            offset,
        }
    }

    // ── layout ────────────────────────────────────────────────────────────

    #[test]
    fn sprite_record_is_twenty_bytes() {
        assert_eq!(std::mem::size_of::<Sprite>(), 20);
        let offsets: Vec<u64> = Sprite::ATTRS.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 8, 16]);
    }

    // ── resolve ───────────────────────────────────────────────────────────

    #[test]
    fn resolve_applies_entry_offset() {
        let entries = [entry(0, 1, 1, (0, 0)), entry(1, 3, 2, (-1, 4))];
        let s = SpriteInstance::new([10, 20], SpriteHandle(1)).resolve(&entries).unwrap();
        assert_eq!(s, Sprite { position: [9, 24], dimensions: [3, 2], address: 1 });
    }

    #[test]
    fn resolve_unknown_handle_is_none() {
        let entries = [entry(0, 1, 1, (0, 0))];
        assert!(SpriteInstance::new([0, 0], SpriteHandle(5)).resolve(&entries).is_none());
    }

    // ── addressing ────────────────────────────────────────────────────────

    #[test]
    fn local_coord_is_integral_at_pixel_centers() {
        let s = Sprite { position: [0, 0], dimensions: [4, 3], address: 0 };
        // Center of the top-left pixel.
        let local = s.local_coord([0.5 / 4.0, 1.0 - 0.5 / 3.0]);
        assert!(local[0].abs() < 1e-5 && local[1].abs() < 1e-5);
        // Center of the bottom-right pixel.
        let local = s.local_coord([3.5 / 4.0, 0.5 / 3.0]);
        assert!((local[0] - 3.0).abs() < 1e-5 && (local[1] - 2.0).abs() < 1e-5);
    }

    #[test]
    fn logical_index_walks_rows() {
        let s = Sprite { position: [0, 0], dimensions: [4, 3], address: 10 };
        assert_eq!(s.logical_index([0.0, 0.0]), 10);
        assert_eq!(s.logical_index([3.0, 0.0]), 13);
        assert_eq!(s.logical_index([1.0, 2.0]), 19);
        assert_eq!(s.logical_index([0.9999, 1.0001]), 15);
    }

    #[test]
    fn sample_crosses_sheet_rows() {
        let mut b = SheetBuilder::new("t", 4);
        let h = b
            .add(SpriteData::from_fn((3, 2), (0, 0), |x, y| [x as u8, y as u8, 7, 255]).unwrap())
            .unwrap();
        let sheet = b.build();
        let s = SpriteInstance::new([0, 0], h).resolve(sheet.entries()).unwrap();
        // Address 1, width 4: the sprite's second row wraps onto sheet row 1.
        for y in 0..2u32 {
            for x in 0..3u32 {
                assert_eq!(s.sample(&sheet, [x as f32, y as f32]), [x as u8, y as u8, 7, 255]);
            }
        }
    }
}
