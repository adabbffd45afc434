//! World-space draw API and backend routing.

use crate::coords::Vec2;
use crate::paint::{BlendMode, Color};
use crate::text::FontSystem;

use super::backend::{BackendKind, BackendStats, DrawBackend, QuadDraw};
use super::batch::BatchRenderer;
use super::canvas::Canvas2d;
use super::immediate::ImmediateRenderer;
use super::params::{TextDraw, TileDraw};
use super::tile::TileSheets;
use super::view::View;

/// Construction options for [`DrawLayer`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawLayerConfig {
    /// Create the batch backend. When `false` every draw goes to the canvas.
    pub accelerated: bool,
    /// Cell size used when a [`TileDraw`] leaves `tile_size` unset.
    pub tile_size_default: Vec2,
    /// UV inset per side, in sheet pixels.
    pub tile_bleed_scale: f32,
}

impl Default for DrawLayerConfig {
    fn default() -> Self {
        Self {
            accelerated: true,
            tile_size_default: Vec2::splat(16.0),
            tile_bleed_scale: 0.3,
        }
    }
}

/// Counters for one finished frame.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FrameStats {
    /// Tile/rect/line draws issued through the [`Painter`].
    pub draws: usize,
    pub texts: usize,
    pub batch: BackendStats,
    pub immediate: BackendStats,
}

/// Owns both draw backends plus the resources draws refer to.
///
/// Three output layers are produced per frame, bottom to top: the main
/// canvas (immediate backend), the batch vertices, the overlay canvas (text).
pub struct DrawLayer {
    batch: Option<BatchRenderer>,
    immediate: ImmediateRenderer,
    overlay: Canvas2d,
    texts: usize,

    fonts: FontSystem,
    sheets: TileSheets,

    tile_size_default: Vec2,
    bleed: f32,

    view: View,
    draws: usize,
    last_stats: FrameStats,
}

impl DrawLayer {
    pub fn new(config: DrawLayerConfig) -> Self {
        let batch = config.accelerated.then(BatchRenderer::new);
        log::info!(
            "draw layer: {} backend",
            if batch.is_some() { "batch" } else { "canvas" }
        );
        Self {
            batch,
            immediate: ImmediateRenderer::new(),
            overlay: Canvas2d::new(1, 1),
            texts: 0,
            fonts: FontSystem::new(),
            sheets: TileSheets::new(),
            tile_size_default: config.tile_size_default,
            bleed: config.tile_bleed_scale,
            view: View::new(Default::default(), Default::default()),
            draws: 0,
            last_stats: FrameStats::default(),
        }
    }

    /// Backend used by draws that ask for acceleration.
    pub fn backend_kind(&self) -> BackendKind {
        if self.batch.is_some() {
            BackendKind::Batch
        } else {
            BackendKind::Immediate
        }
    }

    #[inline]
    pub fn is_accelerated(&self) -> bool {
        self.batch.is_some()
    }

    /// Drops the batch backend for the rest of the session.
    pub fn fall_back_to_immediate(&mut self) {
        if self.batch.take().is_some() {
            log::warn!("switching to canvas backend for all later frames");
        }
    }

    #[inline]
    pub fn fonts(&self) -> &FontSystem {
        &self.fonts
    }

    #[inline]
    pub fn fonts_mut(&mut self) -> &mut FontSystem {
        &mut self.fonts
    }

    #[inline]
    pub fn sheets(&self) -> &TileSheets {
        &self.sheets
    }

    #[inline]
    pub fn sheets_mut(&mut self) -> &mut TileSheets {
        &mut self.sheets
    }

    #[inline]
    pub fn batch(&self) -> Option<&BatchRenderer> {
        self.batch.as_ref()
    }

    #[inline]
    pub fn main_canvas(&self) -> &Canvas2d {
        self.immediate.canvas()
    }

    /// `true` when the main canvas received a draw this frame.
    #[inline]
    pub fn main_canvas_used(&self) -> bool {
        self.immediate.has_output()
    }

    #[inline]
    pub fn overlay(&self) -> &Canvas2d {
        &self.overlay
    }

    /// `true` when the overlay received text this frame.
    #[inline]
    pub fn overlay_used(&self) -> bool {
        self.texts > 0
    }

    #[inline]
    pub fn view(&self) -> &View {
        &self.view
    }

    /// Stats of the last completed frame.
    #[inline]
    pub fn last_stats(&self) -> FrameStats {
        self.last_stats
    }

    /// Starts a frame: collects finished sheet loads and resets every backend.
    pub fn begin_frame(&mut self, view: View) {
        self.sheets.poll();
        self.view = view;
        self.draws = 0;
        self.texts = 0;

        if let Some(batch) = self.batch.as_mut() {
            batch.begin_frame(view.canvas);
        }
        self.immediate.begin_frame(view.canvas);

        let (w, h) = view.canvas.pixel_size();
        self.overlay.reset(w, h);
    }

    /// Draw API for the current frame.
    pub fn painter(&mut self) -> Painter<'_> {
        Painter { layer: self }
    }

    /// Finishes the frame; the batch backend flushes its last batch here.
    pub fn end_frame(&mut self) -> FrameStats {
        let batch = self
            .batch
            .as_mut()
            .map(|b| b.end_frame())
            .unwrap_or_default();
        let immediate = self.immediate.end_frame();

        self.last_stats = FrameStats {
            draws: self.draws,
            texts: self.texts,
            batch,
            immediate,
        };
        log::trace!("frame stats: {:?}", self.last_stats);
        self.last_stats
    }

    fn route(&mut self, accelerated: bool) -> (&mut dyn DrawBackend, &TileSheets) {
        let backend: &mut dyn DrawBackend = match self.batch.as_mut() {
            Some(batch) if accelerated => batch,
            _ => &mut self.immediate,
        };
        (backend, &self.sheets)
    }
}

/// Line as a rotated rect: `(center, size, world angle)`.
///
/// The rect spans `a` to `b` along its x axis and is `thickness` thick.
pub fn line_rect(a: Vec2, b: Vec2, thickness: f32) -> (Vec2, Vec2, f32) {
    let delta = b - a;
    (
        (a + b).scale(0.5),
        Vec2::new(delta.length(), thickness),
        delta.angle(),
    )
}

/// Frame-scoped draw API. Obtained from [`DrawLayer::painter`].
///
/// Positions and sizes are in world units; angles are world radians,
/// counter-clockwise.
pub struct Painter<'a> {
    layer: &'a mut DrawLayer,
}

impl Painter<'_> {
    pub const DEFAULT_LINE_THICKNESS: f32 = 0.1;

    #[inline]
    pub fn view(&self) -> &View {
        &self.layer.view
    }

    #[inline]
    pub fn fonts(&self) -> &FontSystem {
        &self.layer.fonts
    }

    /// Tile/rect/line draws so far this frame.
    #[inline]
    pub fn draw_count(&self) -> usize {
        self.layer.draws
    }

    /// Draws a centered quad at `pos`, textured when `opts.tile_index >= 0`.
    pub fn draw_tile(&mut self, pos: Vec2, opts: &TileDraw) {
        let layer = &mut *self.layer;
        layer.draws += 1;

        let view = layer.view;
        let tile_size = opts.tile_size.unwrap_or(layer.tile_size_default);
        let tile = layer
            .sheets
            .region(opts.sheet, opts.tile_index, tile_size, layer.bleed);

        let mut size = view.size_to_pixels(opts.size);
        if opts.mirror {
            size.x = -size.x;
        }

        let quad = QuadDraw {
            center: view.world_to_raster(pos),
            size,
            angle: -opts.angle,
            tile,
            color: opts.color,
            additive: opts.additive_color,
        };

        let (backend, sheets) = layer.route(opts.accelerated);
        backend.draw_quad(&quad, sheets);
    }

    /// Untextured rect.
    pub fn draw_rect(&mut self, pos: Vec2, size: Vec2, color: Color, angle: f32, accelerated: bool) {
        let opts = TileDraw::rect(size, color)
            .angle(angle)
            .accelerated(accelerated);
        self.draw_tile(pos, &opts);
    }

    /// Rect from `a` to `b`, `thickness` world units thick.
    pub fn draw_line(&mut self, a: Vec2, b: Vec2, thickness: f32, color: Color, accelerated: bool) {
        let (center, size, angle) = line_rect(a, b, thickness);
        self.draw_rect(center, size, color, angle, accelerated);
    }

    /// Draws text on the overlay canvas, vertically centered on `pos`.
    ///
    /// Glyph height is `opts.size` world units. No-op when no font is loaded.
    pub fn draw_text(&mut self, text: &str, pos: Vec2, opts: &TextDraw) {
        let layer = &mut *self.layer;
        let view = layer.view;
        let px = opts.size * view.camera.scale;
        let at = view.world_to_raster(pos);

        let c = &mut layer.overlay;
        c.save();
        c.set_text_align(opts.align);
        if opts.line_width > 0.0 {
            c.set_stroke_color(opts.line_color);
            c.set_line_width(opts.line_width * view.camera.scale);
            c.stroke_text(&layer.fonts, opts.font, text, at.x, at.y, px);
        }
        c.set_fill_color(opts.color);
        c.fill_text(&layer.fonts, opts.font, text, at.x, at.y, px);
        c.restore();

        layer.texts += 1;
    }

    /// Blend mode for later draws on the selected backend.
    pub fn set_blend_mode(&mut self, mode: BlendMode, accelerated: bool) {
        let (backend, _) = self.layer.route(accelerated);
        backend.set_blend_mode(mode);
    }

    /// [`draw_tile`](Self::draw_tile) with `pos` in screen pixels and
    /// `opts.size` in pixels.
    pub fn draw_tile_screen_space(&mut self, pos: Vec2, opts: &TileDraw) {
        let view = self.layer.view;
        let world = TileDraw {
            size: opts.size.scale(1.0 / view.camera.scale),
            ..*opts
        };
        self.draw_tile(view.screen_to_world(pos), &world);
    }

    /// [`draw_rect`](Self::draw_rect) with `pos` and `size` in screen pixels.
    pub fn draw_rect_screen_space(
        &mut self,
        pos: Vec2,
        size: Vec2,
        color: Color,
        angle: f32,
        accelerated: bool,
    ) {
        let opts = TileDraw::rect(size, color)
            .angle(angle)
            .accelerated(accelerated);
        self.draw_tile_screen_space(pos, &opts);
    }
}

#[cfg(test)]
mod tests {
    use core::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    use image::{Rgba, RgbaImage};

    use super::*;
    use crate::coords::{Rect, Viewport};
    use crate::draw::params::TextAlign;
    use crate::draw::tile::SheetId;
    use crate::draw::view::Camera;

    fn layer(accelerated: bool) -> DrawLayer {
        let mut l = DrawLayer::new(DrawLayerConfig {
            accelerated,
            tile_size_default: Vec2::splat(2.0),
            tile_bleed_scale: 0.0,
        });
        l.begin_frame(View::new(
            Camera::new(Vec2::ZERO, 16.0),
            Viewport::new(64.0, 64.0),
        ));
        l
    }

    fn red_sheet(l: &mut DrawLayer) {
        let mut img = RgbaImage::new(4, 4);
        for p in img.pixels_mut() {
            *p = Rgba([255, 0, 0, 255]);
        }
        l.sheets_mut().set_image(SheetId::MAIN, img);
    }

    /// Tile 0 is red in its left column and blue in its right.
    fn two_tone_sheet(l: &mut DrawLayer) {
        let img = RgbaImage::from_fn(4, 4, |x, _| {
            if x % 2 == 0 { Rgba([255, 0, 0, 255]) } else { Rgba([0, 0, 255, 255]) }
        });
        l.sheets_mut().set_image(SheetId::MAIN, img);
    }

    fn vertex_bounds(l: &DrawLayer) -> Rect {
        let frame = l.batch().unwrap().frame();
        Rect::bounding(frame.vertices.iter().map(|v| Vec2::new(v.pos[0], v.pos[1]))).unwrap()
    }

    // ── line ──────────────────────────────────────────────────────────────

    #[test]
    fn line_rect_length_and_angle() {
        let cases = [
            (Vec2::ZERO, Vec2::new(2.0, 0.0), 2.0, 0.0),
            (Vec2::ZERO, Vec2::new(0.0, 3.0), 3.0, FRAC_PI_2),
            (Vec2::new(1.0, 1.0), Vec2::new(2.0, 2.0), 2.0f32.sqrt(), FRAC_PI_4),
            (Vec2::new(2.0, 0.0), Vec2::ZERO, 2.0, PI),
        ];
        for (a, b, len, angle) in cases {
            let (center, size, got) = line_rect(a, b, 0.1);
            assert!((size.x - len).abs() < 1e-6, "{a:?}->{b:?}");
            assert_eq!(size.y, 0.1);
            assert!((got - angle).abs() < 1e-6, "{a:?}->{b:?}: {got}");
            assert!(center.approx_eq((a + b).scale(0.5), 1e-6));
        }
    }

    #[test]
    fn vertical_line_spans_endpoints_on_screen() {
        let mut l = layer(true);
        l.painter()
            .draw_line(Vec2::new(0.0, -1.0), Vec2::new(0.0, 1.0), 0.25, Color::WHITE, true);
        l.end_frame();
        let b = vertex_bounds(&l);
        // 2 world units tall, 0.25 wide, at 16 px per unit around (32, 32).
        assert!(b.min.approx_eq(Vec2::new(30.0, 16.0), 1e-4), "{b:?}");
        assert!(b.max.approx_eq(Vec2::new(34.0, 48.0), 1e-4), "{b:?}");
    }

    // ── backend agreement ─────────────────────────────────────────────────

    #[test]
    fn rect_bounds_match_across_backends() {
        let pos = Vec2::new(0.5, -0.25);
        let size = Vec2::new(2.0, 1.0);

        let mut gpu = layer(true);
        gpu.painter().draw_rect(pos, size, Color::WHITE, 0.0, true);
        gpu.end_frame();

        let mut cpu = layer(false);
        cpu.painter().draw_rect(pos, size, Color::WHITE, 0.0, true);
        cpu.end_frame();

        let expected = Rect::new(24.0, 28.0, 32.0, 16.0);
        assert_eq!(vertex_bounds(&gpu), expected);
        assert_eq!(cpu.main_canvas().painted_bounds(), Some(expected));
    }

    #[test]
    fn mirrored_tile_swaps_texels_and_keeps_bounds() {
        const RED: [u8; 4] = [255, 0, 0, 255];
        const BLUE: [u8; 4] = [0, 0, 255, 255];
        let opts = TileDraw::tile(Vec2::new(2.0, 1.0), 0);

        let mut plain = layer(false);
        two_tone_sheet(&mut plain);
        plain.painter().draw_tile(Vec2::ZERO, &opts);
        assert_eq!(plain.main_canvas().pixel(17, 32), Some(RED));
        assert_eq!(plain.main_canvas().pixel(46, 32), Some(BLUE));

        let mut mirrored = layer(false);
        two_tone_sheet(&mut mirrored);
        mirrored.painter().draw_tile(Vec2::ZERO, &opts.mirror(true));
        assert_eq!(mirrored.main_canvas().pixel(17, 32), Some(BLUE));
        assert_eq!(mirrored.main_canvas().pixel(46, 32), Some(RED));

        let bounds = Some(Rect::new(16.0, 24.0, 32.0, 16.0));
        assert_eq!(plain.main_canvas().painted_bounds(), bounds);
        assert_eq!(mirrored.main_canvas().painted_bounds(), bounds);
    }

    // ── untextured ────────────────────────────────────────────────────────

    #[test]
    fn untextured_draw_never_samples_sheet() {
        let green = Color::rgb(0.0, 1.0, 0.0);
        let opts = TileDraw::rect(Vec2::ONE, green).additive(Color::new(0.0, 0.0, 1.0, 0.0));

        let mut cpu = layer(false);
        red_sheet(&mut cpu);
        cpu.painter().draw_tile(Vec2::ZERO, &opts);
        assert_eq!(cpu.main_canvas().pixel(32, 32), Some([0, 255, 0, 255]));

        let mut gpu = layer(true);
        red_sheet(&mut gpu);
        gpu.painter().draw_tile(Vec2::ZERO, &opts);
        gpu.end_frame();
        let frame = gpu.batch().unwrap().frame();
        assert!(frame.vertices.iter().all(|v| v.textured == 0));
        assert_eq!(frame.batches[0].texture, None);
    }

    #[test]
    fn out_of_range_index_degrades_to_untextured() {
        let mut l = layer(true);
        red_sheet(&mut l);
        // 4x4 sheet of 2x2 tiles: 4 cells.
        l.painter().draw_tile(Vec2::ZERO, &TileDraw::tile(Vec2::ONE, 4));
        l.painter().draw_tile(Vec2::ZERO, &TileDraw::tile(Vec2::ONE, 3));
        l.end_frame();
        let v = l.batch().unwrap().frame().vertices;
        assert_eq!(v[0].textured, 0);
        assert_eq!(v[6].textured, 1);
    }

    #[test]
    fn tiny_tile_size_draws_without_overflow() {
        let mut l = layer(true);
        red_sheet(&mut l);
        let opts = TileDraw::tile(Vec2::ONE, 0).tile_size(Vec2::splat(1e-10));
        l.painter().draw_tile(Vec2::ZERO, &opts);
        l.painter().draw_tile(Vec2::ZERO, &opts.tile_size(Vec2::splat(1e-30)));
        assert_eq!(l.end_frame().batch.quads, 2);
    }

    #[test]
    fn unloaded_sheet_draws_untextured() {
        let mut l = layer(true);
        l.painter().draw_tile(Vec2::ZERO, &TileDraw::tile(Vec2::ONE, 0));
        l.end_frame();
        assert!(l.batch().unwrap().frame().vertices.iter().all(|v| v.textured == 0));
    }

    // ── routing ───────────────────────────────────────────────────────────

    #[test]
    fn accelerated_flag_routes_per_call() {
        let mut l = layer(true);
        {
            let mut p = l.painter();
            p.draw_rect(Vec2::ZERO, Vec2::ONE, Color::WHITE, 0.0, true);
            p.draw_rect(Vec2::ZERO, Vec2::ONE, Color::WHITE, 0.0, false);
            p.draw_rect(Vec2::ZERO, Vec2::ONE, Color::WHITE, 0.0, true);
            assert_eq!(p.draw_count(), 3);
        }
        let stats = l.end_frame();
        assert_eq!(stats.draws, 3);
        assert_eq!(stats.batch, BackendStats { quads: 2, flushes: 1 });
        assert_eq!(stats.immediate.quads, 1);
        assert!(l.main_canvas_used());
    }

    #[test]
    fn fallback_routes_everything_to_canvas() {
        let mut l = layer(true);
        l.fall_back_to_immediate();
        assert_eq!(l.backend_kind(), BackendKind::Immediate);
        l.begin_frame(*l.view());
        l.painter().draw_rect(Vec2::ZERO, Vec2::ONE, Color::WHITE, 0.0, true);
        let stats = l.end_frame();
        assert_eq!(stats.batch, BackendStats::default());
        assert_eq!(stats.immediate.quads, 1);
    }

    #[test]
    fn blend_mode_is_per_backend() {
        let mut l = layer(true);
        l.painter().set_blend_mode(BlendMode::Additive, false);
        assert_eq!(l.immediate.blend_mode(), BlendMode::Additive);
        assert_eq!(l.batch().unwrap().blend_mode(), BlendMode::Normal);
    }

    // ── screen space ──────────────────────────────────────────────────────

    #[test]
    fn screen_space_rect_lands_on_given_pixels() {
        let mut l = layer(false);
        // Screen (19.5, 9.5) is the center of the 8x4 block at (16..24, 8..12).
        l.painter().draw_rect_screen_space(
            Vec2::new(19.5, 9.5),
            Vec2::new(8.0, 4.0),
            Color::WHITE,
            0.0,
            true,
        );
        assert_eq!(
            l.main_canvas().painted_bounds(),
            Some(Rect::new(16.0, 8.0, 8.0, 4.0))
        );
    }

    #[test]
    fn overlay_text_is_anchored_at_position() {
        let center = {
            let mut l = layer(false);
            *l.fonts_mut() = crate::text::sans();
            l.painter().draw_text("H", Vec2::ZERO, &TextDraw::new(1.0));
            assert_eq!(l.main_canvas().painted_bounds(), None);
            l.overlay().painted_bounds().unwrap()
        };
        // World origin lands on raster (32, 32).
        assert!((center.center().x - 32.0).abs() <= 1.5, "{center:?}");
        assert!((center.center().y - 32.0).abs() <= 2.0, "{center:?}");

        let left = {
            let mut l = layer(false);
            *l.fonts_mut() = crate::text::sans();
            let opts = TextDraw::new(1.0).align(TextAlign::Left);
            l.painter().draw_text("H", Vec2::ZERO, &opts);
            l.overlay().painted_bounds().unwrap()
        };
        assert!((32.0..=35.0).contains(&left.min.x), "{left:?}");
    }

    #[test]
    fn outlined_text_paints_fill_over_stroke() {
        const RED: [u8; 4] = [255, 0, 0, 255];
        const BLUE: [u8; 4] = [0, 0, 255, 255];
        let mut l = layer(false);
        *l.fonts_mut() = crate::text::sans();
        let opts = TextDraw::new(2.0)
            .color(Color::rgb(1.0, 0.0, 0.0))
            .outline(0.25, Color::rgb(0.0, 0.0, 1.0));
        l.painter().draw_text("H", Vec2::ZERO, &opts);

        let overlay = l.overlay().image();
        let fill = overlay.pixels().filter(|p| p.0 == RED).count();
        let stroke = overlay.pixels().filter(|p| p.0 == BLUE).count();
        assert!(fill > 0 && stroke > 0, "fill {fill}, stroke {stroke}");
        // Across the stems the outline frames the fill on both sides.
        let row: Vec<[u8; 4]> = (0..64).filter_map(|x| l.overlay().pixel(x, 32)).collect();
        let first_red = row.iter().position(|p| *p == RED).unwrap();
        let first_blue = row.iter().position(|p| *p == BLUE).unwrap();
        let last_red = row.iter().rposition(|p| *p == RED).unwrap();
        let last_blue = row.iter().rposition(|p| *p == BLUE).unwrap();
        assert!(first_blue < first_red && last_red < last_blue, "{row:?}");
    }

    #[test]
    fn text_without_font_counts_but_draws_nothing() {
        let mut l = layer(false);
        l.painter().draw_text("Score: 0", Vec2::ZERO, &TextDraw::new(1.0));
        assert!(l.overlay_used());
        assert_eq!(l.overlay().painted_bounds(), None);
        assert_eq!(l.end_frame().texts, 1);
    }
}
