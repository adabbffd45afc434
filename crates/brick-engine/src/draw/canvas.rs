//! Software 2D canvas.
//!
//! A small subset of the HTML canvas 2D context over an RGBA8 image:
//! save/restore, affine transforms, `fill_rect`, `draw_image`, text and the
//! `source-over` / `lighter` composite operations.
//!
//! Rasterization is point-sampled: a pixel is covered when its center falls
//! inside the transformed shape. Image sampling is nearest-texel. Pixels are
//! stored with straight (non-premultiplied) alpha.

use image::{Rgba, RgbaImage};

use crate::coords::{Affine, Rect, Vec2};
use crate::paint::{BlendMode, Color};
use crate::text::{FontId, FontSystem};

use super::params::TextAlign;

#[derive(Debug, Copy, Clone)]
struct CanvasState {
    transform: Affine,
    composite: BlendMode,
    fill: Color,
    stroke: Color,
    line_width: f32,
    text_align: TextAlign,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            composite: BlendMode::Normal,
            fill: Color::BLACK,
            stroke: Color::BLACK,
            line_width: 1.0,
            text_align: TextAlign::Left,
        }
    }
}

pub struct Canvas2d {
    pixels: RgbaImage,
    state: CanvasState,
    stack: Vec<CanvasState>,
}

impl Canvas2d {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width.max(1), height.max(1)),
            state: CanvasState::default(),
            stack: Vec::new(),
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    #[inline]
    pub fn image(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Clears to transparent and resets all state. Reallocates only on a size change.
    pub fn reset(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        if self.pixels.width() != width || self.pixels.height() != height {
            self.pixels = RgbaImage::new(width, height);
        } else {
            self.clear();
        }
        self.state = CanvasState::default();
        self.stack.clear();
    }

    /// Clears every pixel to transparent. State is kept.
    pub fn clear(&mut self) {
        for p in self.pixels.pixels_mut() {
            *p = Rgba([0, 0, 0, 0]);
        }
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        (x < self.width() && y < self.height()).then(|| self.pixels.get_pixel(x, y).0)
    }

    /// Bounds of all pixels with non-zero alpha, in raster space.
    pub fn painted_bounds(&self) -> Option<Rect> {
        let mut bounds: Option<Rect> = None;
        for (x, y, p) in self.pixels.enumerate_pixels() {
            if p.0[3] == 0 {
                continue;
            }
            let cell = Rect::new(x as f32, y as f32, 1.0, 1.0);
            bounds = Some(match bounds {
                None => cell,
                Some(b) => b.include(cell.min).include(cell.max),
            });
        }
        bounds
    }

    // ── state ─────────────────────────────────────────────────────────────

    pub fn save(&mut self) {
        self.stack.push(self.state);
    }

    /// Pops the last saved state. Unbalanced calls are ignored, as on a canvas.
    pub fn restore(&mut self) {
        if let Some(s) = self.stack.pop() {
            self.state = s;
        }
    }

    pub fn translate(&mut self, x: f32, y: f32) {
        self.state.transform = self.state.transform.translate(x, y);
    }

    pub fn rotate(&mut self, radians: f32) {
        self.state.transform = self.state.transform.rotate(radians);
    }

    pub fn scale(&mut self, x: f32, y: f32) {
        self.state.transform = self.state.transform.scale(x, y);
    }

    #[inline]
    pub fn transform(&self) -> Affine {
        self.state.transform
    }

    pub fn set_composite(&mut self, mode: BlendMode) {
        self.state.composite = mode;
    }

    #[inline]
    pub fn composite(&self) -> BlendMode {
        self.state.composite
    }

    pub fn set_fill_color(&mut self, color: Color) {
        self.state.fill = color;
    }

    pub fn set_stroke_color(&mut self, color: Color) {
        self.state.stroke = color;
    }

    pub fn set_line_width(&mut self, width: f32) {
        self.state.line_width = width;
    }

    pub fn set_text_align(&mut self, align: TextAlign) {
        self.state.text_align = align;
    }

    // ── shapes ────────────────────────────────────────────────────────────

    /// Fills a rectangle given in local (pre-transform) coordinates.
    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        let color = self.state.fill.clamped();
        let mode = self.state.composite;
        self.raster_local_rect(Rect::new(x, y, w, h), |_, _| Some(color), mode);
    }

    /// Copies `src` (image pixels) onto `dst` (local coordinates).
    ///
    /// Each texel is multiplied by `tint` and offset by `additive`
    /// (`texel * tint + additive`).
    pub fn draw_image(
        &mut self,
        image: &RgbaImage,
        src: Rect,
        dst: Rect,
        tint: Color,
        additive: Color,
    ) {
        if image.width() == 0 || image.height() == 0 {
            return;
        }
        let mode = self.state.composite;
        let (iw, ih) = (image.width() as i64, image.height() as i64);
        let dst_size = dst.size();

        self.raster_local_rect(
            dst,
            |lx, ly| {
                let u = (lx - dst.min.x) / dst_size.x;
                let v = (ly - dst.min.y) / dst_size.y;
                let sx = (src.min.x + u * src.width()).floor() as i64;
                let sy = (src.min.y + v * src.height()).floor() as i64;
                let texel = image.get_pixel(sx.clamp(0, iw - 1) as u32, sy.clamp(0, ih - 1) as u32);
                let [r, g, b, a] = texel.0;
                let t = Color::from_u8(r, g, b, a);
                let c = Color::new(
                    t.r * tint.r + additive.r,
                    t.g * tint.g + additive.g,
                    t.b * tint.b + additive.b,
                    t.a * tint.a + additive.a,
                );
                Some(c.clamped())
            },
            mode,
        );
    }

    /// Rasterizes the local-space `rect` through the current transform.
    ///
    /// `shade` receives the local coordinates of each covered pixel center.
    fn raster_local_rect<F>(&mut self, rect: Rect, mut shade: F, mode: BlendMode)
    where
        F: FnMut(f32, f32) -> Option<Color>,
    {
        let m = self.state.transform;
        let Some(inv) = m.inverse() else { return };

        let local = Rect::from_min_max(
            Vec2::new(rect.min.x.min(rect.max.x), rect.min.y.min(rect.max.y)),
            Vec2::new(rect.min.x.max(rect.max.x), rect.min.y.max(rect.max.y)),
        );
        let corners = [
            m.apply(local.min),
            m.apply(Vec2::new(local.max.x, local.min.y)),
            m.apply(local.max),
            m.apply(Vec2::new(local.min.x, local.max.y)),
        ];
        let Some(bounds) = Rect::bounding(corners) else { return };
        if !(bounds.min.is_finite() && bounds.max.is_finite()) {
            return;
        }

        let x0 = bounds.min.x.floor().max(0.0) as u32;
        let y0 = bounds.min.y.floor().max(0.0) as u32;
        let x1 = (bounds.max.x.ceil().max(0.0) as u32).min(self.width());
        let y1 = (bounds.max.y.ceil().max(0.0) as u32).min(self.height());

        for py in y0..y1 {
            for px in x0..x1 {
                let p = inv.apply(Vec2::new(px as f32 + 0.5, py as f32 + 0.5));
                if !local.contains(p) {
                    continue;
                }
                if let Some(c) = shade(p.x, p.y) {
                    self.blend_pixel(px, py, c, mode);
                }
            }
        }
    }

    fn blend_pixel(&mut self, x: u32, y: u32, src: Color, mode: BlendMode) {
        if src.a <= 0.0 && mode == BlendMode::Normal {
            return;
        }
        let dst = self.pixels.get_pixel_mut(x, y);
        let [dr, dg, db, da] = dst.0;
        let d = Color::from_u8(dr, dg, db, da);

        // Work in premultiplied space, store straight.
        let (sr, sg, sb, sa) = (src.r * src.a, src.g * src.a, src.b * src.a, src.a);
        let (pr, pg, pb, pa) = (d.r * d.a, d.g * d.a, d.b * d.a, d.a);

        let (or, og, ob, oa) = match mode {
            BlendMode::Normal => {
                let k = 1.0 - sa;
                (sr + pr * k, sg + pg * k, sb + pb * k, sa + pa * k)
            }
            BlendMode::Additive => (
                (sr + pr).min(1.0),
                (sg + pg).min(1.0),
                (sb + pb).min(1.0),
                (sa + pa).min(1.0),
            ),
        };

        let out = if oa > 0.0 {
            Color::new(or / oa, og / oa, ob / oa, oa)
        } else {
            Color::TRANSPARENT
        };
        *dst = Rgba(out.to_u8());
    }

    // ── text ──────────────────────────────────────────────────────────────

    /// Fills `text` at local `(x, y)` with the fill color.
    ///
    /// `(x, y)` is the anchor chosen by the text align; vertically the em box
    /// is centered on `y`. Only the translation part of the current transform
    /// applies to glyphs.
    pub fn fill_text(&mut self, fonts: &FontSystem, font: Option<FontId>, text: &str, x: f32, y: f32, px: f32) {
        let color = self.state.fill;
        self.draw_text_stamped(fonts, font, text, Vec2::new(x, y), px, color, &[Vec2::ZERO]);
    }

    /// Outlines `text` with the stroke color and line width.
    ///
    /// The outline is approximated by stamping the glyph coverage around a
    /// circle of radius `line_width / 2`.
    pub fn stroke_text(&mut self, fonts: &FontSystem, font: Option<FontId>, text: &str, x: f32, y: f32, px: f32) {
        let color = self.state.stroke;
        let radius = self.state.line_width * 0.5;
        if radius <= 0.0 {
            return;
        }
        let steps = 16;
        let offsets: Vec<Vec2> = (0..steps)
            .flat_map(|i| {
                let a = i as f32 * core::f32::consts::TAU / steps as f32;
                let dir = Vec2::new(a.cos(), a.sin());
                [dir.scale(radius), dir.scale(radius * 0.5)]
            })
            .collect();
        self.draw_text_stamped(fonts, font, text, Vec2::new(x, y), px, color, &offsets);
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_text_stamped(
        &mut self,
        fonts: &FontSystem,
        font: Option<FontId>,
        text: &str,
        anchor: Vec2,
        px: f32,
        color: Color,
        offsets: &[Vec2],
    ) {
        if text.is_empty() || px.is_nan() || px <= 0.0 {
            return;
        }
        let Some(face) = fonts.resolve(font) else { return };

        let (glyphs, width, ascent, descent) = FontSystem::layout_line(face, text, px);
        let origin = self.state.transform.apply(anchor);
        let left = match self.state.text_align {
            TextAlign::Left => origin.x,
            TextAlign::Center => origin.x - width * 0.5,
            TextAlign::Right => origin.x - width,
        };
        let top = origin.y - (ascent - descent) * 0.5;

        let color = color.clamped();
        let mode = self.state.composite;

        // Union of all stamps per pixel so overlapping offsets don't over-darken.
        let mut coverage: std::collections::HashMap<(i64, i64), u8> = std::collections::HashMap::new();
        for g in &glyphs {
            let (metrics, bitmap) = face.rasterize_config(g.key);
            if metrics.width == 0 || metrics.height == 0 {
                continue;
            }
            for off in offsets {
                let gx = (left + g.x + off.x).round() as i64;
                let gy = (top + g.y + off.y).round() as i64;
                for row in 0..metrics.height {
                    for col in 0..metrics.width {
                        let c = bitmap[row * metrics.width + col];
                        if c == 0 {
                            continue;
                        }
                        let key = (gx + col as i64, gy + row as i64);
                        let entry = coverage.entry(key).or_insert(0);
                        *entry = (*entry).max(c);
                    }
                }
            }
        }

        let (w, h) = (i64::from(self.width()), i64::from(self.height()));
        for ((x, y), c) in coverage {
            if x < 0 || y < 0 || x >= w || y >= h {
                continue;
            }
            let a = color.a * (c as f32 / 255.0);
            self.blend_pixel(x as u32, y as u32, color.with_alpha(a), mode);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [u8; 4] = [255, 0, 0, 255];

    fn filled(canvas: &Canvas2d) -> usize {
        canvas.image().pixels().filter(|p| p.0[3] > 0).count()
    }

    // ── fill_rect ─────────────────────────────────────────────────────────

    #[test]
    fn axis_aligned_rect_covers_exact_pixels() {
        let mut c = Canvas2d::new(16, 16);
        c.set_fill_color(Color::rgb(1.0, 0.0, 0.0));
        c.fill_rect(2.0, 3.0, 4.0, 5.0);
        assert_eq!(filled(&c), 20);
        assert_eq!(c.painted_bounds(), Some(Rect::new(2.0, 3.0, 4.0, 5.0)));
        assert_eq!(c.pixel(2, 3), Some(RED));
        assert_eq!(c.pixel(6, 3), Some([0, 0, 0, 0]));
    }

    #[test]
    fn transform_applies_to_rect() {
        let mut c = Canvas2d::new(32, 32);
        c.set_fill_color(Color::WHITE);
        c.save();
        c.translate(16.0, 16.0);
        c.scale(8.0, 4.0);
        c.fill_rect(-0.5, -0.5, 1.0, 1.0);
        c.restore();
        assert_eq!(c.painted_bounds(), Some(Rect::new(12.0, 14.0, 8.0, 4.0)));
        assert_eq!(c.transform(), Affine::IDENTITY);
    }

    #[test]
    fn negative_scale_mirrors_without_changing_coverage() {
        let mut c = Canvas2d::new(32, 32);
        c.set_fill_color(Color::WHITE);
        c.translate(16.0, 16.0);
        c.scale(-8.0, 4.0);
        c.fill_rect(-0.5, -0.5, 1.0, 1.0);
        assert_eq!(c.painted_bounds(), Some(Rect::new(12.0, 14.0, 8.0, 4.0)));
    }

    #[test]
    fn zero_size_draws_nothing() {
        let mut c = Canvas2d::new(8, 8);
        c.set_fill_color(Color::WHITE);
        c.scale(0.0, 4.0);
        c.fill_rect(0.0, 0.0, 1.0, 1.0);
        assert_eq!(filled(&c), 0);
    }

    #[test]
    fn unbalanced_restore_is_ignored() {
        let mut c = Canvas2d::new(4, 4);
        c.translate(1.0, 1.0);
        c.restore();
        assert_eq!(c.transform(), Affine::IDENTITY.translate(1.0, 1.0));
    }

    // ── compositing ───────────────────────────────────────────────────────

    #[test]
    fn source_over_blends_half_alpha() {
        let mut c = Canvas2d::new(1, 1);
        c.set_fill_color(Color::BLACK);
        c.fill_rect(0.0, 0.0, 1.0, 1.0);
        c.set_fill_color(Color::new(1.0, 1.0, 1.0, 0.5));
        c.fill_rect(0.0, 0.0, 1.0, 1.0);
        assert_eq!(c.pixel(0, 0), Some([128, 128, 128, 255]));
    }

    #[test]
    fn lighter_adds_and_saturates() {
        let mut c = Canvas2d::new(1, 1);
        c.set_fill_color(Color::rgb(0.5, 0.25, 0.0));
        c.fill_rect(0.0, 0.0, 1.0, 1.0);
        c.set_composite(BlendMode::Additive);
        c.set_fill_color(Color::rgb(0.75, 0.25, 0.0));
        c.fill_rect(0.0, 0.0, 1.0, 1.0);
        assert_eq!(c.pixel(0, 0), Some([255, 128, 0, 255]));
    }

    // ── draw_image ────────────────────────────────────────────────────────

    fn checker() -> RgbaImage {
        // 2x1 image: left red, right blue.
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([0, 0, 255, 255]));
        img
    }

    #[test]
    fn draw_image_samples_source_rect() {
        let mut c = Canvas2d::new(4, 2);
        c.draw_image(
            &checker(),
            Rect::new(0.0, 0.0, 2.0, 1.0),
            Rect::new(0.0, 0.0, 4.0, 2.0),
            Color::WHITE,
            Color::TRANSPARENT,
        );
        assert_eq!(c.pixel(0, 0), Some(RED));
        assert_eq!(c.pixel(1, 1), Some(RED));
        assert_eq!(c.pixel(2, 0), Some([0, 0, 255, 255]));
    }

    #[test]
    fn mirrored_draw_image_flips_texels() {
        let mut c = Canvas2d::new(4, 2);
        c.translate(2.0, 1.0);
        c.scale(-4.0, 2.0);
        c.draw_image(
            &checker(),
            Rect::new(0.0, 0.0, 2.0, 1.0),
            Rect::new(-0.5, -0.5, 1.0, 1.0),
            Color::WHITE,
            Color::TRANSPARENT,
        );
        assert_eq!(c.pixel(0, 0), Some([0, 0, 255, 255]));
        assert_eq!(c.pixel(3, 0), Some(RED));
    }

    #[test]
    fn tint_and_additive_apply_to_texels() {
        let mut c = Canvas2d::new(1, 1);
        let mut img = RgbaImage::new(1, 1);
        img.put_pixel(0, 0, Rgba([255, 255, 255, 255]));
        c.draw_image(
            &img,
            Rect::new(0.0, 0.0, 1.0, 1.0),
            Rect::new(0.0, 0.0, 1.0, 1.0),
            Color::rgb(0.0, 1.0, 0.0),
            Color::new(1.0, 0.0, 0.0, 0.0),
        );
        assert_eq!(c.pixel(0, 0), Some([255, 255, 0, 255]));
    }

    // ── text ──────────────────────────────────────────────────────────────

    #[test]
    fn text_without_fonts_is_skipped() {
        let mut c = Canvas2d::new(8, 8);
        c.set_fill_color(Color::WHITE);
        c.fill_text(&FontSystem::new(), None, "hi", 4.0, 4.0, 6.0);
        assert_eq!(filled(&c), 0);
    }

    fn text_bounds(align: TextAlign, y: f32) -> Rect {
        let mut c = Canvas2d::new(200, 100);
        c.set_fill_color(Color::WHITE);
        c.set_text_align(align);
        c.fill_text(&crate::text::sans(), None, "HH", 100.0, y, 20.0);
        c.painted_bounds().unwrap()
    }

    #[test]
    fn align_picks_anchor_edge() {
        let left = text_bounds(TextAlign::Left, 50.0);
        assert!((100.0..=104.0).contains(&left.min.x), "{left:?}");

        let right = text_bounds(TextAlign::Right, 50.0);
        assert!((96.0..=100.0).contains(&right.max.x), "{right:?}");

        let center = text_bounds(TextAlign::Center, 50.0);
        assert!((center.center().x - 100.0).abs() <= 1.5, "{center:?}");
        // Glyphs snap to whole pixels independently.
        assert!((left.width() - right.width()).abs() <= 1.0);
        assert!((center.width() - right.width()).abs() <= 1.0);
    }

    #[test]
    fn text_is_vertically_centered_on_anchor() {
        let line = crate::text::sans().measure_text("HH", None, 20.0).y;
        let b = text_bounds(TextAlign::Center, 50.0);
        assert!(b.min.y >= 50.0 - line / 2.0 - 1.0, "{b:?}");
        assert!(b.max.y <= 50.0 + line / 2.0 + 1.0, "{b:?}");
        assert!((b.center().y - 50.0).abs() <= 2.0, "{b:?}");

        let lower = text_bounds(TextAlign::Center, 57.0);
        assert_eq!(lower.min.y - b.min.y, 7.0);
        assert_eq!(lower.max.y - b.max.y, 7.0);
    }

    #[test]
    fn fill_covers_stroke_outline() {
        let fonts = crate::text::sans();
        let blue = [0, 0, 255, 255];

        let mut plain = Canvas2d::new(100, 80);
        plain.set_fill_color(Color::rgb(1.0, 0.0, 0.0));
        plain.set_text_align(TextAlign::Center);
        plain.fill_text(&fonts, None, "H", 50.0, 40.0, 40.0);

        let mut outlined = Canvas2d::new(100, 80);
        outlined.set_text_align(TextAlign::Center);
        outlined.set_stroke_color(Color::rgb(0.0, 0.0, 1.0));
        outlined.set_line_width(4.0);
        outlined.stroke_text(&fonts, None, "H", 50.0, 40.0, 40.0);
        outlined.set_fill_color(Color::rgb(1.0, 0.0, 0.0));
        outlined.fill_text(&fonts, None, "H", 50.0, 40.0, 40.0);

        // Every fully covered glyph pixel stays pure fill color.
        let solid: Vec<(u32, u32)> = plain
            .image()
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[3] == 255)
            .map(|(x, y, _)| (x, y))
            .collect();
        assert!(!solid.is_empty());
        for (x, y) in solid {
            assert_eq!(outlined.pixel(x, y), Some(RED), "({x}, {y})");
        }

        let strokes = outlined.image().pixels().filter(|p| p.0 == blue).count();
        assert!(strokes > 0);

        let inner = plain.painted_bounds().unwrap();
        let outer = outlined.painted_bounds().unwrap();
        assert!(outer.min.x < inner.min.x && outer.min.y < inner.min.y, "{outer:?} {inner:?}");
        assert!(outer.max.x > inner.max.x && outer.max.y > inner.max.y, "{outer:?} {inner:?}");
    }
}
