use crate::coords::{clip_to_device, srgb_to_linear, to_clip, CanvasInfo};
use crate::render::shapes::{Circle, PrimitiveVertex, Rectangle, Sprite, SpriteInstance};
use crate::render::{active_quad, Batch, Scene, UpscaleFilter};
use crate::sheet::SheetPixels;

/// Linear RGBA pixel grid with the origin at the bottom-left, like the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct SoftCanvas {
    info: CanvasInfo,
    /// Row-major, row 0 is canvas `y = 0`.
    pixels: Vec<[f32; 4]>,
}

/// Device-space bounds of a quad, `lo` inclusive and `hi` exclusive.
#[derive(Debug, Copy, Clone)]
struct QuadBounds {
    lo: [f32; 2],
    hi: [f32; 2],
}

impl QuadBounds {
    /// Maps the quad spanned by `corner_position(0, 0)` and `corner_position(1, 1)`
    /// to device space.
    fn new(info: CanvasInfo, corner_position: impl Fn([f32; 2]) -> [f32; 2]) -> Self {
        let lo = clip_to_device(to_clip(corner_position([0.0, 0.0]), info), info);
        let hi = clip_to_device(to_clip(corner_position([1.0, 1.0]), info), info);
        Self { lo, hi }
    }

    /// Unit-quad parameter at the center of pixel `(x, y)`, if the pixel is covered.
    fn corner_at(&self, x: u32, y: u32) -> Option<[f32; 2]> {
        let cx = x as f32 + 0.5;
        let cy = y as f32 + 0.5;
        if cx < self.lo[0] || cx >= self.hi[0] || cy < self.lo[1] || cy >= self.hi[1] {
            return None;
        }
        Some([
            (cx - self.lo[0]) / (self.hi[0] - self.lo[0]),
            (cy - self.lo[1]) / (self.hi[1] - self.lo[1]),
        ])
    }

    /// Pixel index range worth testing along one axis, clipped to `limit`.
    fn span(lo: f32, hi: f32, limit: u32) -> std::ops::Range<u32> {
        let start = (lo - 0.5).floor().max(0.0).min(limit as f32) as u32;
        let end = (hi + 0.5).ceil().max(0.0).min(limit as f32) as u32;
        start..end
    }
}

/// Composites a straight-alpha `src` over the premultiplied `dst`, matching the
/// shaders' premultiplied output and the pipelines' `One, OneMinusSrcAlpha` state.
#[inline]
fn blend(dst: [f32; 4], src: [f32; 4]) -> [f32; 4] {
    let a = src[3];
    let k = 1.0 - a;
    [
        src[0] * a + dst[0] * k,
        src[1] * a + dst[1] * k,
        src[2] * a + dst[2] * k,
        a + dst[3] * k,
    ]
}

/// sRGB texel as `textureLoad` returns it from an sRGB view.
#[inline]
fn decode_texel(texel: [u8; 4]) -> [f32; 4] {
    [
        srgb_to_linear(texel[0]),
        srgb_to_linear(texel[1]),
        srgb_to_linear(texel[2]),
        texel[3] as f32 / 255.0,
    ]
}

impl SoftCanvas {
    pub fn new(info: CanvasInfo, clear: [f32; 4]) -> Self {
        Self {
            info,
            pixels: vec![clear; info.area()],
        }
    }

    #[inline]
    pub fn info(&self) -> CanvasInfo {
        self.info
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.info.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.info.height()
    }

    /// Pixel at canvas coordinate `(x, y)`. Panics when out of range.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [f32; 4] {
        self.pixels[self.index(x, y)]
    }

    pub fn clear(&mut self, color: [f32; 4]) {
        self.pixels.fill(color);
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width() as usize + x as usize
    }

    #[inline]
    fn blend_at(&mut self, x: u32, y: u32, src: [f32; 4]) {
        let i = self.index(x, y);
        self.pixels[i] = blend(self.pixels[i], src);
    }

    /// Runs `shade` for every pixel covered by `bounds`.
    fn fill_quad(&mut self, bounds: QuadBounds, mut shade: impl FnMut([f32; 2]) -> [f32; 4]) {
        let xs = QuadBounds::span(bounds.lo[0], bounds.hi[0], self.width());
        let ys = QuadBounds::span(bounds.lo[1], bounds.hi[1], self.height());
        for y in ys {
            for x in xs.clone() {
                if let Some(corner) = bounds.corner_at(x, y) {
                    self.blend_at(x, y, shade(corner));
                }
            }
        }
    }

    pub fn draw_rects(&mut self, rects: &[Rectangle], stretch: f32) {
        for rect in rects.iter().filter(|r| !r.is_degenerate()) {
            let bounds = QuadBounds::new(self.info, |c| rect.corner_position(c, stretch));
            self.fill_quad(bounds, |_| rect.color);
        }
    }

    pub fn draw_circles(&mut self, circles: &[Circle]) {
        for circle in circles.iter().filter(|c| !c.is_degenerate()) {
            let bounds = QuadBounds::new(self.info, |c| circle.corner_position(c));
            self.fill_quad(bounds, |c| circle.shade([2.0 * c[0] - 1.0, 2.0 * c[1] - 1.0]));
        }
    }

    /// Draws resolved sprites. Handles missing from `sheet` are skipped.
    pub fn draw_sprites(&mut self, sprites: &[SpriteInstance], sheet: &SheetPixels) {
        let resolved: Vec<Sprite> = sprites
            .iter()
            .filter_map(|s| sheet.resolve(s))
            .filter(|s| !s.is_degenerate())
            .collect();
        for sprite in &resolved {
            let bounds = QuadBounds::new(self.info, |c| sprite.corner_position(c));
            self.fill_quad(bounds, |c| decode_texel(sprite.sample(sheet, sprite.local_coord(c))));
        }
    }

    /// Each point lights the pixel its mapped position falls in.
    pub fn draw_points(&mut self, points: &[PrimitiveVertex]) {
        for p in points {
            let [dx, dy] = clip_to_device(to_clip(p.position, self.info), self.info);
            if dx < 0.0 || dy < 0.0 {
                continue;
            }
            let (x, y) = (dx.floor() as u32, dy.floor() as u32);
            if x < self.width() && y < self.height() {
                self.blend_at(x, y, p.color);
            }
        }
    }

    /// Draws every batch of `scene` in order. Sprite batches need `sheet`;
    /// line strips are skipped.
    pub fn draw_scene(&mut self, scene: &Scene, stretch: f32, sheet: Option<&SheetPixels>) {
        for batch in scene.batches() {
            match batch {
                Batch::Rects(r) => self.draw_rects(r, stretch),
                Batch::Circles(c) => self.draw_circles(c),
                Batch::Sprites(s) => {
                    if let Some(sheet) = sheet {
                        self.draw_sprites(s, sheet);
                    }
                }
                Batch::Points(p) => self.draw_points(p),
                Batch::LineStrips(_) => {}
            }
        }
    }

    /// Blits the canvas onto a `display` sized grid the way the upscale pass does.
    pub fn upscale(&self, display: CanvasInfo, filter: UpscaleFilter, letterbox: [f32; 4]) -> SoftCanvas {
        let quad = active_quad(display.dimensions, self.info);
        let mut out = SoftCanvas::new(display, letterbox);

        for y in 0..display.height() {
            for x in 0..display.width() {
                let Some(texel) = quad.canvas_pixel(x, y) else { continue };
                let color = match filter {
                    UpscaleFilter::Nearest => self.pixel(texel.0, texel.1),
                    UpscaleFilter::Linear => {
                        let u = (x as f32 - quad.offset[0] as f32 + 0.5) / quad.size[0] as f32;
                        let v = (y as f32 - quad.offset[1] as f32 + 0.5) / quad.size[1] as f32;
                        self.sample_linear(u, v)
                    }
                };
                let i = out.index(x, y);
                out.pixels[i] = color;
            }
        }
        out
    }

    /// Bilinear sample at normalized `(u, v)` with clamp-to-edge addressing.
    fn sample_linear(&self, u: f32, v: f32) -> [f32; 4] {
        let fx = u * self.width() as f32 - 0.5;
        let fy = v * self.height() as f32 - 0.5;
        let (x0, y0) = (fx.floor(), fy.floor());
        let (tx, ty) = (fx - x0, fy - y0);

        let clamp_x = |x: f32| x.clamp(0.0, (self.width() - 1) as f32) as u32;
        let clamp_y = |y: f32| y.clamp(0.0, (self.height() - 1) as f32) as u32;
        let (xa, xb) = (clamp_x(x0), clamp_x(x0 + 1.0));
        let (ya, yb) = (clamp_y(y0), clamp_y(y0 + 1.0));

        let (p00, p10) = (self.pixel(xa, ya), self.pixel(xb, ya));
        let (p01, p11) = (self.pixel(xa, yb), self.pixel(xb, yb));

        let mut out = [0.0; 4];
        for i in 0..4 {
            let bottom = p00[i] + (p10[i] - p00[i]) * tx;
            let top = p01[i] + (p11[i] - p01[i]) * tx;
            out[i] = bottom + (top - bottom) * ty;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::shapes::DEFAULT_STRETCH;
    use crate::sheet::{SheetBuilder, SpriteData};

    const BLACK: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
    const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
    const BLUE: [f32; 4] = [0.0, 0.0, 1.0, 1.0];
    const CLEAR: [f32; 4] = [0.0; 4];

    fn canvas(w: u32, h: u32) -> SoftCanvas {
        SoftCanvas::new(CanvasInfo::new(w, h).unwrap(), BLACK)
    }

    fn rect(offset: [i32; 2], dimensions: [u32; 2], color: [f32; 4]) -> Rectangle {
        Rectangle { offset, dimensions, color }
    }

    fn lit(c: &SoftCanvas, color: [f32; 4]) -> Vec<(u32, u32)> {
        let mut out = Vec::new();
        for y in 0..c.height() {
            for x in 0..c.width() {
                if c.pixel(x, y) == color {
                    out.push((x, y));
                }
            }
        }
        out
    }

    // ── coordinate mapping ────────────────────────────────────────────────

    #[test]
    fn every_point_lights_its_own_pixel() {
        for (w, h) in [(1, 1), (7, 3), (64, 48), (320, 180)] {
            let mut c = canvas(w, h);
            let points: Vec<PrimitiveVertex> = (0..h)
                .flat_map(|y| (0..w).map(move |x| (x, y)))
                .map(|(x, y)| PrimitiveVertex::new([x as f32, y as f32], [x as f32, y as f32, 0.0, 1.0]))
                .collect();
            c.draw_points(&points);
            for y in 0..h {
                for x in 0..w {
                    assert_eq!(c.pixel(x, y), [x as f32, y as f32, 0.0, 1.0], "{w}×{h} at ({x}, {y})");
                }
            }
        }
    }

    #[test]
    fn points_outside_the_canvas_are_ignored() {
        let mut c = canvas(4, 4);
        c.draw_points(&[
            PrimitiveVertex::new([-1.0, 0.0], RED),
            PrimitiveVertex::new([4.0, 0.0], RED),
        ]);
        assert!(lit(&c, RED).is_empty());
    }

    // ── rectangles ────────────────────────────────────────────────────────

    #[test]
    fn rect_covers_exactly_its_pixels() {
        for (offset, dims) in [([3, 2], [4, 5]), ([0, 0], [1, 1]), ([9, 7], [1, 1]), ([0, 0], [10, 8])] {
            let mut c = canvas(10, 8);
            c.draw_rects(&[rect(offset, dims, RED)], DEFAULT_STRETCH);

            let mut expected = Vec::new();
            for y in offset[1] as u32..offset[1] as u32 + dims[1] {
                for x in offset[0] as u32..offset[0] as u32 + dims[0] {
                    expected.push((x, y));
                }
            }
            assert_eq!(lit(&c, RED), expected, "offset {offset:?} dims {dims:?}");
        }
    }

    #[test]
    fn rect_partly_off_canvas_is_clipped() {
        let mut c = canvas(4, 4);
        c.draw_rects(&[rect([-2, 3], [3, 3], RED)], DEFAULT_STRETCH);
        assert_eq!(lit(&c, RED), vec![(0, 3)]);
    }

    #[test]
    fn zero_stretch_loses_the_far_edges() {
        let mut c = canvas(8, 8);
        c.draw_rects(&[rect([1, 1], [3, 2], RED)], 0.0);
        // Centers on the right and top edges fall outside the half-open bounds.
        assert_eq!(lit(&c, RED), vec![(1, 1), (2, 1)]);
    }

    #[test]
    fn zero_sized_rect_draws_nothing() {
        let mut c = canvas(4, 4);
        c.draw_rects(&[rect([1, 1], [0, 3], RED), rect([1, 1], [3, 0], RED)], DEFAULT_STRETCH);
        assert!(lit(&c, RED).is_empty());
    }

    // ── circles ───────────────────────────────────────────────────────────

    fn circle_pixels(diameter: u32) -> (SoftCanvas, Vec<(u32, u32)>) {
        let mut c = canvas(diameter, diameter);
        c.draw_circles(&[Circle { offset: [0, 0], diameter, color: RED }]);
        let pixels = lit(&c, RED);
        (c, pixels)
    }

    #[test]
    fn circle_is_symmetric_under_mirroring_and_transposition() {
        for d in 1..=40 {
            let (c, _) = circle_pixels(d);
            for y in 0..d {
                for x in 0..d {
                    let p = c.pixel(x, y);
                    assert_eq!(p, c.pixel(d - 1 - x, y), "d={d} mirror x at ({x}, {y})");
                    assert_eq!(p, c.pixel(x, d - 1 - y), "d={d} mirror y at ({x}, {y})");
                    assert_eq!(p, c.pixel(y, x), "d={d} transpose at ({x}, {y})");
                }
            }
        }
    }

    #[test]
    fn circle_touches_its_box_midpoints_and_skips_corners_and_center() {
        for d in [3, 4, 5, 6, 7, 8, 9, 16, 33] {
            let (c, _) = circle_pixels(d);
            let m = d / 2;
            assert_eq!(c.pixel(m, 0), RED, "d={d}");
            assert_eq!(c.pixel(0, m), RED, "d={d}");
            assert_eq!(c.pixel(d - 1, m), RED, "d={d}");
            assert_eq!(c.pixel(m, d - 1), RED, "d={d}");
            if d < 4 {
                // The band of a 3-pixel ring reaches its corners.
                continue;
            }
            assert_eq!(c.pixel(0, 0), BLACK, "d={d}");
            assert_eq!(c.pixel(d - 1, d - 1), BLACK, "d={d}");
            assert_eq!(c.pixel(m, m), BLACK, "d={d}");
        }
    }

    #[test]
    fn circle_of_diameter_one_is_a_single_pixel() {
        let (_, pixels) = circle_pixels(1);
        assert_eq!(pixels, vec![(0, 0)]);
    }

    #[test]
    fn circle_outside_band_keeps_destination() {
        let mut c = canvas(12, 12);
        c.draw_rects(&[rect([0, 0], [12, 12], BLUE)], DEFAULT_STRETCH);
        c.draw_circles(&[Circle { offset: [1, 1], diameter: 10, color: RED }]);
        assert_eq!(c.pixel(6, 6), BLUE);
        assert_eq!(c.pixel(0, 0), BLUE);
        assert_eq!(c.pixel(6, 1), RED);
    }

    // ── sprites ───────────────────────────────────────────────────────────

    #[test]
    fn sprites_reproduce_their_pixels_across_sheet_rows() {
        // A narrow sheet forces sprites to straddle physical rows.
        let mut b = SheetBuilder::new("t", 5);
        let source = |id: u8| move |x: u32, y: u32| [id, x as u8 * 20, y as u8 * 30, 255];
        let a = b.add(SpriteData::from_fn((3, 2), (0, 0), source(10)).unwrap()).unwrap();
        let s = b.add(SpriteData::from_fn((2, 4), (0, 0), source(200)).unwrap()).unwrap();
        let sheet = b.build();

        let mut c = canvas(8, 8);
        c.draw_sprites(
            &[SpriteInstance::new([0, 0], a), SpriteInstance::new([4, 3], s)],
            &sheet,
        );

        for (pos, (w, h), id) in [([0u32, 0u32], (3u32, 2u32), 10u8), ([4, 3], (2, 4), 200)] {
            for sy in 0..h {
                for sx in 0..w {
                    // Sprite row 0 is the top row, so it lands on the highest canvas row.
                    let cx = pos[0] + sx;
                    let cy = pos[1] + (h - 1 - sy);
                    let expected = decode_texel(source(id)(sx, sy));
                    assert_eq!(c.pixel(cx, cy), expected, "sprite {id} pixel ({sx}, {sy})");
                }
            }
        }
    }

    #[test]
    fn sprite_offset_shifts_the_draw_position() {
        let mut b = SheetBuilder::new("t", 64);
        let h = b
            .add(SpriteData::from_fn((1, 1), (2, 1), |_, _| [255, 255, 255, 255]).unwrap())
            .unwrap();
        let sheet = b.build();
        let mut c = canvas(4, 4);
        c.draw_sprites(&[SpriteInstance::new([1, 1], h)], &sheet);
        assert_eq!(lit(&c, [1.0; 4]), vec![(3, 2)]);
    }

    #[test]
    fn transparent_sprite_texels_keep_destination() {
        let mut b = SheetBuilder::new("t", 64);
        let h = b
            .add(
                SpriteData::from_fn((2, 1), (0, 0), |x, _| if x == 0 { [0; 4] } else { [255, 0, 0, 255] })
                    .unwrap(),
            )
            .unwrap();
        let sheet = b.build();
        let mut c = canvas(2, 1);
        c.draw_sprites(&[SpriteInstance::new([0, 0], h)], &sheet);
        assert_eq!(c.pixel(0, 0), BLACK);
        assert_eq!(c.pixel(1, 0), RED);
    }

    // ── alpha ─────────────────────────────────────────────────────────────

    fn approx(a: [f32; 4], b: [f32; 4]) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-5)
    }

    #[test]
    fn half_alpha_rect_mixes_with_destination() {
        let mut c = canvas(2, 1);
        c.draw_rects(&[rect([0, 0], [1, 1], [1.0, 0.0, 0.0, 0.5])], DEFAULT_STRETCH);
        assert_eq!(c.pixel(0, 0), [0.5, 0.0, 0.0, 1.0]);
        assert_eq!(c.pixel(1, 0), BLACK);
    }

    #[test]
    fn half_alpha_circle_and_point_mix_with_destination() {
        let mut c = canvas(3, 1);
        c.draw_circles(&[Circle { offset: [0, 0], diameter: 1, color: [0.0, 1.0, 0.0, 0.5] }]);
        c.draw_points(&[PrimitiveVertex::new([2.0, 0.0], [0.0, 0.0, 1.0, 0.25])]);
        assert_eq!(c.pixel(0, 0), [0.0, 0.5, 0.0, 1.0]);
        assert_eq!(c.pixel(2, 0), [0.0, 0.0, 0.25, 1.0]);
    }

    #[test]
    fn half_alpha_sprite_texel_mixes_with_destination() {
        let mut b = SheetBuilder::new("t", 64);
        let h = b
            .add(SpriteData::from_fn((1, 1), (0, 0), |_, _| [255, 0, 0, 128]).unwrap())
            .unwrap();
        let sheet = b.build();
        let mut c = canvas(1, 1);
        c.draw_sprites(&[SpriteInstance::new([0, 0], h)], &sheet);

        let a = 128.0 / 255.0;
        let red = srgb_to_linear(255);
        let expected = [red * a, 0.0, 0.0, 1.0];
        assert!(approx(c.pixel(0, 0), expected), "{:?}", c.pixel(0, 0));
    }

    // ── draw order ────────────────────────────────────────────────────────

    #[test]
    fn later_batches_overwrite_earlier_ones() {
        let a = rect([0, 0], [3, 3], RED);
        let b = rect([1, 1], [3, 3], BLUE);

        let mut scene = Scene::new();
        scene.push_rect(a);
        scene.push_rect(b);
        let mut c = canvas(4, 4);
        c.draw_scene(&scene, DEFAULT_STRETCH, None);
        assert_eq!(c.pixel(2, 2), BLUE);
        assert_eq!(c.pixel(0, 0), RED);

        let mut scene = Scene::new();
        scene.push_rect(b);
        scene.push_rect(a);
        let mut c = canvas(4, 4);
        c.draw_scene(&scene, DEFAULT_STRETCH, None);
        assert_eq!(c.pixel(2, 2), RED);
        assert_eq!(c.pixel(3, 3), BLUE);
    }

    #[test]
    fn order_holds_across_kinds() {
        let mut scene = Scene::new();
        scene.push_rect(rect([0, 0], [5, 5], RED));
        scene.push_circle(Circle { offset: [0, 0], diameter: 5, color: BLUE });
        scene.push_rect(rect([2, 0], [1, 1], RED));
        let mut c = canvas(5, 5);
        c.draw_scene(&scene, DEFAULT_STRETCH, None);
        assert_eq!(c.pixel(0, 2), BLUE);
        assert_eq!(c.pixel(2, 0), RED);
        assert_eq!(c.pixel(2, 2), RED);
    }

    // ── upscale ───────────────────────────────────────────────────────────

    fn checker() -> SoftCanvas {
        let mut c = SoftCanvas::new(CanvasInfo::new(3, 2).unwrap(), CLEAR);
        for y in 0..2 {
            for x in 0..3 {
                let i = c.index(x, y);
                c.pixels[i] = [x as f32 / 2.0, y as f32, 0.5, 1.0];
            }
        }
        c
    }

    #[test]
    fn nearest_upscale_makes_k_by_k_blocks() {
        let src = checker();
        let display = CanvasInfo::new(8, 6).unwrap();
        let out = src.upscale(display, UpscaleFilter::Nearest, CLEAR);
        // k = 2, canvas at (1, 1)..(7, 5)
        for y in 0..6 {
            for x in 0..8 {
                let inside = (1..7).contains(&x) && (1..5).contains(&y);
                let expected = if inside { src.pixel((x - 1) / 2, (y - 1) / 2) } else { CLEAR };
                assert_eq!(out.pixel(x, y), expected, "display ({x}, {y})");
            }
        }
    }

    #[test]
    fn nearest_upscale_at_scale_one_is_identity() {
        let src = checker();
        let out = src.upscale(src.info(), UpscaleFilter::Nearest, CLEAR);
        assert_eq!(out, src);
    }

    #[test]
    fn linear_upscale_blends_between_neighbours() {
        let mut src = SoftCanvas::new(CanvasInfo::new(2, 1).unwrap(), CLEAR);
        src.pixels[0] = [0.0, 0.0, 0.0, 1.0];
        src.pixels[1] = [1.0, 1.0, 1.0, 1.0];
        let out = src.upscale(CanvasInfo::new(8, 4).unwrap(), UpscaleFilter::Linear, CLEAR);
        // Outer columns clamp to the edge texels.
        assert_eq!(out.pixel(0, 0)[0], 0.0);
        assert_eq!(out.pixel(7, 0)[0], 1.0);
        let mid = out.pixel(4, 0)[0];
        assert!(mid > 0.5 && mid < 1.0, "{mid}");
        assert!(out.pixel(3, 0)[0] < mid);
    }
}
