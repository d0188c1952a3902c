/// Largest texture edge requested by default. Sheets and the canvas are
/// bounded by it.
pub const DEFAULT_MAX_TEXTURE_DIMENSION: u32 = 8192;

/// Initialization parameters for the GPU layer.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Prefer an sRGB surface format when available, so the linear canvas is
    /// encoded on presentation.
    pub prefer_srgb: bool,

    /// Present mode (swap behavior).
    pub present_mode: wgpu::PresentMode,

    /// Optional alpha mode preference for the surface.
    ///
    /// If provided but unsupported on the current surface, a supported mode is selected.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Required wgpu features. None are needed by the drawers.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,

    /// Desired maximum frame latency for the surface. A hint only.
    pub desired_maximum_frame_latency: u32,
}

impl GpuInit {
    /// WebGL2-level limits with room for large sprite sheets.
    pub fn default_limits() -> wgpu::Limits {
        wgpu::Limits {
            max_texture_dimension_2d: DEFAULT_MAX_TEXTURE_DIMENSION,
            ..wgpu::Limits::downlevel_webgl2_defaults()
        }
    }
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: Self::default_limits(),
            desired_maximum_frame_latency: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits_allow_large_sheets() {
        let init = GpuInit::default();
        assert_eq!(init.required_limits.max_texture_dimension_2d, 8192);
        assert_eq!(
            init.required_limits.max_bind_groups,
            wgpu::Limits::downlevel_webgl2_defaults().max_bind_groups
        );
        assert!(init.required_features.is_empty());
        assert!(init.prefer_srgb);
    }
}
