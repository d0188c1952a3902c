//! Shared GPU types and utilities used by all canvas drawers.

use std::marker::PhantomData;
use std::ops::Range;

use bytemuck::{Pod, Zeroable};

// ── blend ─────────────────────────────────────────────────────────────────

/// Canvas blend state.
///
/// Fragment shaders premultiply their straight-alpha output, so opaque fragments
/// overwrite the destination and `vec4(0)` fragments leave it untouched.
pub(crate) fn premul_alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

// ── shader source ─────────────────────────────────────────────────────────

const COMMON_WGSL: &str = include_str!("../shaders/common.wgsl");

/// Prepends the shared canvas uniform and `to_clip` to a drawer's WGSL body.
pub(crate) fn canvas_shader_source(body: &str) -> String {
    let mut src = String::with_capacity(COMMON_WGSL.len() + body.len() + 1);
    src.push_str(COMMON_WGSL);
    src.push('\n');
    src.push_str(body);
    src
}

// ── quad vertex ───────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(crate) struct QuadVertex {
    pub corner: [f32; 2], // 0..1
}

impl QuadVertex {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

pub(crate) const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { corner: [0.0, 0.0] },
    QuadVertex { corner: [1.0, 0.0] },
    QuadVertex { corner: [1.0, 1.0] },
    QuadVertex { corner: [0.0, 1.0] },
];

pub(crate) const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// Static unit quad (vertex + index buffer) shared by the instanced drawers.
pub(crate) struct QuadBuffers {
    pub vbo: wgpu::Buffer,
    pub ibo: wgpu::Buffer,
}

impl QuadBuffers {
    pub(crate) fn new(device: &wgpu::Device, label: &str) -> Self {
        use wgpu::util::DeviceExt;

        let vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} quad vbo")),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let ibo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} quad ibo")),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self { vbo, ibo }
    }
}

// ── frame-scoped instance storage ─────────────────────────────────────────

/// Slot bookkeeping for a buffer that is appended to several times per frame.
///
/// Every batch gets its own range, so `queue.write_buffer` calls for later
/// batches never clobber data an earlier pass in the same submission reads.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct SlotCursor {
    capacity: usize,
    cursor: usize,
}

/// Outcome of [`SlotCursor::reserve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Reservation {
    /// `Some(capacity)` when a fresh buffer of that many elements is needed.
    pub grow_to: Option<usize>,
    /// Element range to write and draw.
    pub range: Range<usize>,
}

impl SlotCursor {
    /// Starts a new frame; all ranges handed out before become reusable.
    pub(crate) fn reset(&mut self) {
        self.cursor = 0;
    }

    pub(crate) fn reserve(&mut self, len: usize) -> Reservation {
        let mut grow_to = None;
        if self.cursor + len > self.capacity {
            // Earlier ranges stay in the old buffer, which recorded passes keep alive.
            let cap = (self.capacity * 2).max(len).next_power_of_two().max(64);
            self.capacity = cap;
            self.cursor = 0;
            grow_to = Some(cap);
        }
        let range = self.cursor..self.cursor + len;
        self.cursor += len;
        Reservation { grow_to, range }
    }
}

/// GPU buffer of `T` records filled through a [`SlotCursor`].
pub(crate) struct FrameBuffer<T: Pod> {
    label: &'static str,
    usage: wgpu::BufferUsages,
    buffer: Option<wgpu::Buffer>,
    slots: SlotCursor,
    _marker: PhantomData<T>,
}

impl<T: Pod> FrameBuffer<T> {
    pub(crate) fn new(label: &'static str, usage: wgpu::BufferUsages) -> Self {
        Self {
            label,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            buffer: None,
            slots: SlotCursor::default(),
            _marker: PhantomData,
        }
    }

    /// Pre-sizes the buffer so the first frames do not reallocate.
    pub(crate) fn with_capacity(mut self, device: &wgpu::Device, capacity: usize) -> Self {
        if capacity > 0 {
            let r = self.slots.reserve(capacity);
            if let Some(cap) = r.grow_to {
                self.buffer = Some(self.create(device, cap));
            }
            self.slots.reset();
        }
        self
    }

    pub(crate) fn reset(&mut self) {
        self.slots.reset();
    }

    fn create(&self, device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
        log::debug!("{}: allocating {capacity} slots", self.label);
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(self.label),
            size: (capacity * std::mem::size_of::<T>()) as u64,
            usage: self.usage,
            mapped_at_creation: false,
        })
    }

    /// Uploads `items` into a fresh range and returns the buffer with the range
    /// in elements. Returns `None` for an empty slice.
    pub(crate) fn push(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        items: &[T],
    ) -> Option<(&wgpu::Buffer, Range<u32>)> {
        if items.is_empty() {
            return None;
        }

        let Reservation { grow_to, range } = self.slots.reserve(items.len());
        if let Some(cap) = grow_to {
            self.buffer = Some(self.create(device, cap));
        }
        let buffer = self.buffer.as_ref()?;

        let offset = (range.start * std::mem::size_of::<T>()) as u64;
        queue.write_buffer(buffer, offset, bytemuck::cast_slice(items));
        Some((buffer, range.start as u32..range.end as u32))
    }
}

// ── canvas render pass ────────────────────────────────────────────────────

/// Opens a pass that draws over the current canvas contents.
pub(crate) fn begin_canvas_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    view: &wgpu::TextureView,
    label: &str,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Load,
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── SlotCursor ────────────────────────────────────────────────────────

    #[test]
    fn first_reservation_allocates_minimum() {
        let mut s = SlotCursor::default();
        let r = s.reserve(3);
        assert_eq!(r.grow_to, Some(64));
        assert_eq!(r.range, 0..3);
    }

    #[test]
    fn batches_in_one_frame_do_not_overlap() {
        let mut s = SlotCursor::default();
        let a = s.reserve(10);
        let b = s.reserve(20);
        let c = s.reserve(5);
        assert_eq!(a.range, 0..10);
        assert_eq!((b.grow_to, b.range), (None, 10..30));
        assert_eq!((c.grow_to, c.range), (None, 30..35));
    }

    #[test]
    fn overflow_moves_to_a_fresh_buffer() {
        let mut s = SlotCursor::default();
        s.reserve(60);
        let r = s.reserve(10);
        assert_eq!(r.grow_to, Some(128));
        assert_eq!(r.range, 0..10);
    }

    #[test]
    fn reset_reuses_the_buffer() {
        let mut s = SlotCursor::default();
        s.reserve(40);
        s.reset();
        let r = s.reserve(40);
        assert_eq!(r.grow_to, None);
        assert_eq!(r.range, 0..40);
    }

    #[test]
    fn large_batch_rounds_up_to_power_of_two() {
        let mut s = SlotCursor::default();
        assert_eq!(s.reserve(1000).grow_to, Some(1024));
    }

    // ── shader source ─────────────────────────────────────────────────────

    #[test]
    fn canvas_shader_source_prepends_to_clip() {
        let src = canvas_shader_source("fn body() {}");
        assert!(src.contains("fn to_clip"));
        assert!(src.ends_with("fn body() {}"));
    }

    #[test]
    fn quad_layout_stride() {
        assert_eq!(QuadVertex::layout().array_stride, 8);
    }
}
