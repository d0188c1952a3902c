use super::canvas::Canvas;

/// Per-frame context handed to every drawer.
pub struct RenderCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub canvas: &'a Canvas,
    /// Initial slot count for instance buffers created this frame.
    pub instance_capacity: usize,
}

impl<'a> RenderCtx<'a> {
    #[inline]
    pub fn new(
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        canvas: &'a Canvas,
        instance_capacity: usize,
    ) -> Self {
        Self {
            device,
            queue,
            canvas,
            instance_capacity,
        }
    }
}

/// Target for drawing (encoder + color view).
pub struct RenderTarget<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub color_view: &'a wgpu::TextureView,
}

impl<'a> RenderTarget<'a> {
    #[inline]
    pub fn new(encoder: &'a mut wgpu::CommandEncoder, color_view: &'a wgpu::TextureView) -> Self {
        Self { encoder, color_view }
    }
}
