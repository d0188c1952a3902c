/// Pixel dimensions of the logical canvas.
///
/// Supplied once per frame (or on resize) and read by every drawer. Both
/// components are non-zero; [`CanvasInfo::new`] enforces it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct CanvasInfo {
    pub dimensions: (u32, u32),
}

impl CanvasInfo {
    /// Returns `None` when either dimension is zero.
    #[inline]
    pub const fn new(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            None
        } else {
            Some(Self { dimensions: (width, height) })
        }
    }

    #[inline]
    pub const fn width(self) -> u32 {
        self.dimensions.0
    }

    #[inline]
    pub const fn height(self) -> u32 {
        self.dimensions.1
    }

    /// Number of pixels on the canvas.
    #[inline]
    pub const fn area(self) -> usize {
        self.dimensions.0 as usize * self.dimensions.1 as usize
    }
}

/// Maps a canvas coordinate to clip space.
///
/// `clip.xy = (0.5 + coord) / dims * 2 - 1`. The half-pixel bias makes an
/// integer coordinate land on the center of the pixel it addresses, with
/// device `(-1, -1)` being the bottom-left corner of pixel `(0, 0)`.
#[inline]
pub fn to_clip(coord: [f32; 2], canvas: CanvasInfo) -> [f32; 4] {
    let (w, h) = canvas.dimensions;
    [
        (0.5 + coord[0]) / w as f32 * 2.0 - 1.0,
        (0.5 + coord[1]) / h as f32 * 2.0 - 1.0,
        0.0,
        1.0,
    ]
}

/// Standard viewport transform from clip space to y-up device pixels.
#[inline]
pub fn clip_to_device(clip: [f32; 4], canvas: CanvasInfo) -> [f32; 2] {
    let (w, h) = canvas.dimensions;
    let x = clip[0] / clip[3];
    let y = clip[1] / clip[3];
    [(x + 1.0) * 0.5 * w as f32, (y + 1.0) * 0.5 * h as f32]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas(w: u32, h: u32) -> CanvasInfo {
        CanvasInfo::new(w, h).unwrap()
    }

    // ── construction ──────────────────────────────────────────────────────

    #[test]
    fn zero_dimensions_are_rejected() {
        assert!(CanvasInfo::new(0, 10).is_none());
        assert!(CanvasInfo::new(10, 0).is_none());
        assert_eq!(canvas(3, 4).area(), 12);
    }

    // ── to_clip ───────────────────────────────────────────────────────────

    #[test]
    fn origin_maps_to_center_of_bottom_left_pixel() {
        let clip = to_clip([0.0, 0.0], canvas(4, 2));
        assert_eq!(clip, [-0.75, -0.5, 0.0, 1.0]);
    }

    #[test]
    fn last_pixel_maps_inside_top_right_corner() {
        let clip = to_clip([3.0, 1.0], canvas(4, 2));
        assert_eq!(clip, [0.75, 0.5, 0.0, 1.0]);
    }

    #[test]
    fn every_pixel_lands_on_its_own_center() {
        for (w, h) in [(1, 1), (2, 3), (7, 5), (16, 9), (320, 180), (241, 113)] {
            let info = canvas(w, h);
            for y in 0..h {
                for x in 0..w {
                    let [dx, dy] = clip_to_device(to_clip([x as f32, y as f32], info), info);
                    assert!((dx - (x as f32 + 0.5)).abs() < 1e-3, "x {x} of {w}: {dx}");
                    assert!((dy - (y as f32 + 0.5)).abs() < 1e-3, "y {y} of {h}: {dy}");
                    assert_eq!((dx.floor() as u32, dy.floor() as u32), (x, y));
                }
            }
        }
    }

    #[test]
    fn negative_coordinates_fall_off_canvas() {
        let info = canvas(8, 8);
        let [dx, dy] = clip_to_device(to_clip([-1.0, -3.0], info), info);
        assert!(dx < 0.0);
        assert!(dy < 0.0);
    }
}
