use crate::coords::{Affine, Rect, Vec2, Viewport};
use crate::paint::{BlendMode, Color};

use super::tile::{TileRegion, TileSheets};

/// Which implementation a [`DrawBackend`] is.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BackendKind {
    /// GPU batching (`BatchRenderer`).
    Batch,
    /// Per-call software canvas (`ImmediateRenderer`).
    Immediate,
}

/// One centered quad, already in raster space.
///
/// Built by the draw layer from a world-space call; both backends consume the
/// same value, which keeps their output in agreement.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct QuadDraw {
    /// Center in raster pixels.
    pub center: Vec2,
    /// Width/height in pixels. Negative `x` mirrors horizontally.
    pub size: Vec2,
    /// Screen-space rotation in radians, clockwise (Y-down).
    pub angle: f32,
    /// `None` draws a flat `color` rect.
    pub tile: Option<TileRegion>,
    pub color: Color,
    /// Ignored when `tile` is `None`.
    pub additive: Color,
}

impl QuadDraw {
    /// Unit-square local space (`[-0.5, 0.5]²`) to raster space.
    #[inline]
    pub fn transform(&self) -> Affine {
        Affine::IDENTITY
            .translate(self.center.x, self.center.y)
            .rotate(self.angle)
            .scale(self.size.x, self.size.y)
    }

    /// Corners in raster space: top-left, top-right, bottom-right, bottom-left
    /// of the unrotated, unmirrored quad.
    pub fn corners(&self) -> [Vec2; 4] {
        let m = self.transform();
        [
            m.apply(Vec2::new(-0.5, -0.5)),
            m.apply(Vec2::new(0.5, -0.5)),
            m.apply(Vec2::new(0.5, 0.5)),
            m.apply(Vec2::new(-0.5, 0.5)),
        ]
    }

    /// Axis-aligned raster bounds of the quad.
    pub fn bounds(&self) -> Rect {
        Rect::bounding(self.corners()).unwrap_or_default()
    }
}

/// Per-frame counters reported by [`DrawBackend::end_frame`].
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct BackendStats {
    pub quads: usize,
    /// Batches submitted (always `0` for the immediate backend).
    pub flushes: usize,
}

/// Rendering backend behind the draw primitives.
///
/// Implementations keep their own blend state; it resets to
/// [`BlendMode::Normal`] at [`begin_frame`](Self::begin_frame).
pub trait DrawBackend {
    fn kind(&self) -> BackendKind;

    /// Starts a frame on a canvas of `canvas` pixels, dropping last frame's output.
    fn begin_frame(&mut self, canvas: Viewport);

    fn draw_quad(&mut self, quad: &QuadDraw, sheets: &TileSheets);

    /// Applies to every following `draw_quad` until changed.
    fn set_blend_mode(&mut self, mode: BlendMode);

    fn blend_mode(&self) -> BlendMode;

    /// Finishes the frame (the batch backend flushes its last batch here).
    fn end_frame(&mut self) -> BackendStats;
}
