/// Straight (non-premultiplied) linear RGBA color, `[0, 1]` per channel.
///
/// Instance records carry colors as `[f32; 4]`; this type is the config-facing
/// form used for clear and letterbox colors. The canvas stores premultiplied
/// values, so render targets are cleared with [`ColorRgba::premultiplied`].
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ColorRgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ColorRgba {
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn black() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }

    /// Color channels scaled by alpha.
    #[inline]
    pub fn premultiplied(self) -> Self {
        Self::new(self.r * self.a, self.g * self.a, self.b * self.a, self.a)
    }

    #[inline]
    pub const fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    #[inline]
    pub fn to_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: self.r as f64,
            g: self.g as f64,
            b: self.b as f64,
            a: self.a as f64,
        }
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite() && self.a.is_finite()
    }
}

impl From<[f32; 4]> for ColorRgba {
    #[inline]
    fn from(c: [f32; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }
}

/// Decodes one sRGB-encoded byte the way an `*UnormSrgb` texture load does.
///
/// Alpha is stored linearly; callers decode only the color channels.
#[inline]
pub fn srgb_to_linear(byte: u8) -> f32 {
    let c = byte as f32 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srgb_endpoints_are_exact() {
        assert_eq!(srgb_to_linear(0), 0.0);
        assert!((srgb_to_linear(255) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn srgb_midpoint_is_darker_in_linear() {
        let mid = srgb_to_linear(128);
        assert!(mid > 0.2 && mid < 0.25, "{mid}");
    }

    #[test]
    fn premultiplied_scales_color_by_alpha() {
        let c = ColorRgba::new(1.0, 0.5, 0.0, 0.5).premultiplied();
        assert_eq!(c, ColorRgba::new(0.5, 0.25, 0.0, 0.5));
        assert_eq!(ColorRgba::black().premultiplied(), ColorRgba::black());
    }

    #[test]
    fn non_finite_channels_are_detected() {
        assert!(ColorRgba::black().is_finite());
        assert!(!ColorRgba::new(0.0, f32::NAN, 0.0, 1.0).is_finite());
        assert!(!ColorRgba::new(0.0, 0.0, 0.0, f32::INFINITY).is_finite());
    }

    #[test]
    fn wgpu_color_keeps_channels() {
        let c = ColorRgba::new(0.25, 0.5, 0.75, 1.0).to_wgpu();
        assert_eq!((c.r, c.g, c.b, c.a), (0.25, 0.5, 0.75, 1.0));
    }
}
