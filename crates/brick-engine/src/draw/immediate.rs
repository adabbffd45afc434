//! Immediate backend: every quad is rasterized straight into a software canvas.

use crate::coords::{Rect, Viewport};
use crate::paint::BlendMode;

use super::backend::{BackendKind, BackendStats, DrawBackend, QuadDraw};
use super::canvas::Canvas2d;
use super::tile::TileSheets;

/// Canvas-2D [`DrawBackend`].
///
/// Each quad is a `save / translate / rotate / scale / draw / restore`
/// sequence over the unit square centered on the origin.
pub struct ImmediateRenderer {
    canvas: Canvas2d,
    quads: usize,
}

impl Default for ImmediateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ImmediateRenderer {
    pub fn new() -> Self {
        Self {
            canvas: Canvas2d::new(1, 1),
            quads: 0,
        }
    }

    #[inline]
    pub fn canvas(&self) -> &Canvas2d {
        &self.canvas
    }

    /// `true` when at least one quad was drawn this frame.
    #[inline]
    pub fn has_output(&self) -> bool {
        self.quads > 0
    }
}

impl DrawBackend for ImmediateRenderer {
    fn kind(&self) -> BackendKind {
        BackendKind::Immediate
    }

    fn begin_frame(&mut self, canvas: Viewport) {
        let (w, h) = canvas.pixel_size();
        self.canvas.reset(w, h);
        self.quads = 0;
    }

    fn draw_quad(&mut self, quad: &QuadDraw, sheets: &TileSheets) {
        let unit = Rect::new(-0.5, -0.5, 1.0, 1.0);
        let c = &mut self.canvas;

        c.save();
        c.translate(quad.center.x, quad.center.y);
        c.rotate(quad.angle);
        c.scale(quad.size.x, quad.size.y);

        let image = quad
            .tile
            .and_then(|t| sheets.get(t.sheet).and_then(|s| s.image()).map(|img| (t, img)));
        match image {
            Some((region, img)) => {
                c.draw_image(img, region.src, unit, quad.color, quad.additive);
            }
            None => {
                c.set_fill_color(quad.color);
                c.fill_rect(unit.min.x, unit.min.y, unit.width(), unit.height());
            }
        }

        c.restore();
        self.quads += 1;
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.canvas.set_composite(mode);
    }

    fn blend_mode(&self) -> BlendMode {
        self.canvas.composite()
    }

    fn end_frame(&mut self) -> BackendStats {
        BackendStats {
            quads: self.quads,
            flushes: 0,
        }
    }
}
