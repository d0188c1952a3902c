use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::coords::CanvasInfo;

/// Off-screen canvas color format.
pub const CANVAS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Mirrors `CanvasInfo` in `common.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(crate) struct CanvasUniform {
    pub dimensions: [u32; 2],
    pub stretch: f32,
    pub _pad: u32,
}

impl CanvasUniform {
    pub(crate) fn new(info: CanvasInfo, stretch: f32) -> Self {
        Self {
            dimensions: [info.width(), info.height()],
            stretch,
            _pad: 0,
        }
    }
}

/// The off-screen render target every drawer writes to, plus the canvas uniform
/// shared by their pipelines (group 0).
pub struct Canvas {
    info: CanvasInfo,
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    _uniform: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
}

impl Canvas {
    pub fn new(device: &wgpu::Device, info: CanvasInfo, stretch: f32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("pixcanvas canvas"),
            size: wgpu::Extent3d {
                width: info.width(),
                height: info.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: CANVAS_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("pixcanvas canvas ubo"),
            contents: bytemuck::bytes_of(&CanvasUniform::new(info, stretch)),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("pixcanvas canvas bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<CanvasUniform>() as u64,
                    ),
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("pixcanvas canvas bind group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.as_entire_binding(),
            }],
        });

        log::debug!("canvas target created ({}×{})", info.width(), info.height());

        Self {
            info,
            _texture: texture,
            view,
            _uniform: uniform,
            bind_group_layout,
            bind_group,
        }
    }

    #[inline]
    pub fn info(&self) -> CanvasInfo {
        self.info
    }

    #[inline]
    pub fn format(&self) -> wgpu::TextureFormat {
        CANVAS_FORMAT
    }

    #[inline]
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    #[inline]
    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    #[inline]
    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_is_sixteen_bytes() {
        assert_eq!(std::mem::size_of::<CanvasUniform>(), 16);
    }

    #[test]
    fn uniform_carries_stretch_in_third_word() {
        let info = CanvasInfo::new(320, 180).unwrap();
        let u = CanvasUniform::new(info, 0.25);
        let words: &[u32] = bytemuck::cast_slice(bytemuck::bytes_of(&u));
        assert_eq!(words[0], 320);
        assert_eq!(words[1], 180);
        assert_eq!(f32::from_bits(words[2]), 0.25);
        assert_eq!(words[3], 0);
    }
}
