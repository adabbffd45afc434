//! CPU side of the accelerated backend: quad batching.
//!
//! Quads accumulate into a vertex list. A batch closes ("flushes") when the
//! next quad needs a different tile sheet, when the blend mode changes, or at
//! the end of the frame. The GPU renderer later uploads the whole vertex list
//! once and issues one draw per batch.

use std::ops::Range;

use bytemuck::{Pod, Zeroable};

use crate::coords::{Vec2, Viewport};
use crate::paint::{BlendMode, Color};

use super::backend::{BackendKind, BackendStats, DrawBackend, QuadDraw};
use super::tile::{SheetId, TileSheets};

/// Vertex consumed by the batch shader.
///
/// `pos` is in raster pixels; the vertex shader converts to NDC.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct BatchVertex {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
    /// Straight-alpha RGBA8.
    pub color: [u8; 4],
    pub additive: [u8; 4],
    /// `1` samples the bound sheet, `0` draws flat `color`.
    pub textured: u32,
}

/// A run of vertices drawn with one texture and blend mode.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// `None` when every quad in the run is untextured.
    pub texture: Option<SheetId>,
    pub blend: BlendMode,
    pub vertices: Range<u32>,
}

/// Read-only view of a finished frame.
#[derive(Debug, Copy, Clone)]
pub struct BatchFrame<'a> {
    pub canvas: Viewport,
    pub vertices: &'a [BatchVertex],
    pub batches: &'a [Batch],
}

impl BatchFrame<'_> {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

/// Batching [`DrawBackend`].
#[derive(Debug, Default)]
pub struct BatchRenderer {
    vertices: Vec<BatchVertex>,
    batches: Vec<Batch>,

    pending_start: usize,
    pending_texture: Option<SheetId>,
    blend: BlendMode,

    canvas: Viewport,
    quads: usize,
}

const VERTICES_PER_QUAD: usize = 6;

impl BatchRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The frame built since the last [`begin_frame`](DrawBackend::begin_frame).
    ///
    /// Complete only after [`end_frame`](DrawBackend::end_frame).
    pub fn frame(&self) -> BatchFrame<'_> {
        BatchFrame {
            canvas: self.canvas,
            vertices: &self.vertices,
            batches: &self.batches,
        }
    }

    /// Quads recorded so far this frame.
    #[inline]
    pub fn quad_count(&self) -> usize {
        self.vertices.len() / VERTICES_PER_QUAD
    }

    #[inline]
    fn has_pending(&self) -> bool {
        self.vertices.len() > self.pending_start
    }

    fn flush(&mut self) {
        if !self.has_pending() {
            return;
        }
        self.batches.push(Batch {
            texture: self.pending_texture,
            blend: self.blend,
            vertices: self.pending_start as u32..self.vertices.len() as u32,
        });
        self.pending_start = self.vertices.len();
        self.pending_texture = None;
    }

    fn push_quad(&mut self, quad: &QuadDraw) {
        let [tl, tr, br, bl] = quad.corners();
        let color = quad.color.to_u8();

        let (uv, additive, textured) = match quad.tile {
            Some(region) => {
                let (min, max) = (region.uv.min, region.uv.max);
                (
                    [min, Vec2::new(max.x, min.y), max, Vec2::new(min.x, max.y)],
                    quad.additive.to_u8(),
                    1,
                )
            }
            None => ([Vec2::ZERO; 4], Color::TRANSPARENT.to_u8(), 0),
        };

        let v = |p: Vec2, uv: Vec2| BatchVertex {
            pos: [p.x, p.y],
            uv: [uv.x, uv.y],
            color,
            additive,
            textured,
        };

        self.vertices.extend_from_slice(&[
            v(tl, uv[0]),
            v(tr, uv[1]),
            v(br, uv[2]),
            v(tl, uv[0]),
            v(br, uv[2]),
            v(bl, uv[3]),
        ]);
    }
}

impl DrawBackend for BatchRenderer {
    fn kind(&self) -> BackendKind {
        BackendKind::Batch
    }

    fn begin_frame(&mut self, canvas: Viewport) {
        self.vertices.clear();
        self.batches.clear();
        self.pending_start = 0;
        self.pending_texture = None;
        self.blend = BlendMode::Normal;
        self.canvas = canvas;
        self.quads = 0;
    }

    fn draw_quad(&mut self, quad: &QuadDraw, _sheets: &TileSheets) {
        if let Some(region) = quad.tile {
            match self.pending_texture {
                Some(bound) if bound != region.sheet => {
                    self.flush();
                }
                _ => {}
            }
            self.pending_texture = Some(region.sheet);
        }

        self.push_quad(quad);
        self.quads += 1;
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        if mode == self.blend {
            return;
        }
        self.flush();
        self.blend = mode;
    }

    fn blend_mode(&self) -> BlendMode {
        self.blend
    }

    fn end_frame(&mut self) -> BackendStats {
        self.flush();
        log::trace!(
            "batch frame: {} quads, {} batches, {} vertices",
            self.quads,
            self.batches.len(),
            self.vertices.len()
        );
        BackendStats {
            quads: self.quads,
            flushes: self.batches.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Rect;
    use crate::draw::tile::TileRegion;

    fn region(sheet: SheetId) -> TileRegion {
        TileRegion {
            sheet,
            uv: Rect::new(0.25, 0.5, 0.25, 0.5),
            src: Rect::new(16.0, 16.0, 16.0, 16.0),
        }
    }

    fn quad(tile: Option<TileRegion>) -> QuadDraw {
        QuadDraw {
            center: Vec2::new(50.0, 40.0),
            size: Vec2::new(20.0, 10.0),
            angle: 0.0,
            tile,
            color: Color::WHITE,
            additive: Color::new(0.5, 0.0, 0.0, 0.0),
        }
    }

    fn renderer() -> (BatchRenderer, TileSheets) {
        let mut r = BatchRenderer::new();
        r.begin_frame(Viewport::new(100.0, 80.0));
        (r, TileSheets::new())
    }

    // ── flush counting ────────────────────────────────────────────────────

    #[test]
    fn same_state_draws_flush_once() {
        let (mut r, sheets) = renderer();
        for _ in 0..50 {
            r.draw_quad(&quad(Some(region(SheetId::MAIN))), &sheets);
        }
        let stats = r.end_frame();
        assert_eq!(stats, BackendStats { quads: 50, flushes: 1 });
        assert_eq!(r.frame().batches[0].vertices, 0..300);
        assert_eq!(r.quad_count(), 50);
    }

    #[test]
    fn alternating_sheets_flush_every_draw() {
        let (mut r, mut sheets) = renderer();
        let other = sheets.create();
        for i in 0..10 {
            let sheet = if i % 2 == 0 { SheetId::MAIN } else { other };
            r.draw_quad(&quad(Some(region(sheet))), &sheets);
        }
        assert_eq!(r.end_frame().flushes, 10);
        let textures: Vec<_> = r.frame().batches.iter().map(|b| b.texture).collect();
        assert_eq!(textures[0], Some(SheetId::MAIN));
        assert_eq!(textures[1], Some(other));
    }

    #[test]
    fn untextured_quads_join_any_batch() {
        let (mut r, sheets) = renderer();
        r.draw_quad(&quad(None), &sheets);
        r.draw_quad(&quad(Some(region(SheetId::MAIN))), &sheets);
        r.draw_quad(&quad(None), &sheets);
        assert_eq!(r.end_frame().flushes, 1);
        assert_eq!(r.frame().batches[0].texture, Some(SheetId::MAIN));
    }

    #[test]
    fn untextured_only_frame_has_no_texture() {
        let (mut r, sheets) = renderer();
        r.draw_quad(&quad(None), &sheets);
        r.end_frame();
        assert_eq!(r.frame().batches[0].texture, None);
    }

    #[test]
    fn blend_change_flushes_pending_batch() {
        let (mut r, sheets) = renderer();
        // Nothing pending yet: no empty batch.
        r.set_blend_mode(BlendMode::Additive);
        r.draw_quad(&quad(None), &sheets);
        r.set_blend_mode(BlendMode::Additive);
        r.draw_quad(&quad(None), &sheets);
        r.set_blend_mode(BlendMode::Normal);
        r.draw_quad(&quad(None), &sheets);
        r.end_frame();

        let batches = r.frame().batches;
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].blend, BlendMode::Additive);
        assert_eq!(batches[0].vertices, 0..12);
        assert_eq!(batches[1].blend, BlendMode::Normal);
    }

    #[test]
    fn begin_frame_resets_state() {
        let (mut r, sheets) = renderer();
        r.set_blend_mode(BlendMode::Additive);
        r.draw_quad(&quad(None), &sheets);
        r.end_frame();

        r.begin_frame(Viewport::new(10.0, 10.0));
        assert_eq!(r.blend_mode(), BlendMode::Normal);
        assert!(r.frame().is_empty());
        assert_eq!(r.end_frame(), BackendStats::default());
    }

    #[test]
    fn non_finite_quads_pass_through() {
        let (mut r, sheets) = renderer();
        let mut q = quad(None);
        q.center.x = f32::NAN;
        r.draw_quad(&q, &sheets);
        assert_eq!(r.end_frame().quads, 1);
        assert!(r.frame().vertices[0].pos[0].is_nan());
    }

    // ── vertices ──────────────────────────────────────────────────────────

    #[test]
    fn untextured_vertices_ignore_additive() {
        let (mut r, sheets) = renderer();
        r.draw_quad(&quad(None), &sheets);
        r.end_frame();
        for v in r.frame().vertices {
            assert_eq!(v.textured, 0);
            assert_eq!(v.additive, [0, 0, 0, 0]);
            assert_eq!(v.color, [255, 255, 255, 255]);
        }
    }

    #[test]
    fn textured_corners_map_uv_rect() {
        let (mut r, sheets) = renderer();
        r.draw_quad(&quad(Some(region(SheetId::MAIN))), &sheets);
        r.end_frame();
        let v = r.frame().vertices;
        // TL, TR, BR, TL, BR, BL
        assert_eq!(v[0].pos, [40.0, 35.0]);
        assert_eq!(v[0].uv, [0.25, 0.5]);
        assert_eq!(v[1].uv, [0.5, 0.5]);
        assert_eq!(v[2].pos, [60.0, 45.0]);
        assert_eq!(v[2].uv, [0.5, 1.0]);
        assert_eq!(v[5].uv, [0.25, 1.0]);
        assert_eq!(v[0].additive, [128, 0, 0, 0]);
        assert!(v.iter().all(|v| v.textured == 1));
    }

    #[test]
    fn mirror_swaps_positions_but_not_uvs() {
        let (mut r, sheets) = renderer();
        let plain = quad(Some(region(SheetId::MAIN)));
        let mirrored = QuadDraw {
            size: Vec2::new(-20.0, 10.0),
            ..plain
        };
        r.draw_quad(&plain, &sheets);
        r.draw_quad(&mirrored, &sheets);
        r.end_frame();

        let v = r.frame().vertices;
        let (a, b) = (&v[..6], &v[6..]);
        for i in 0..6 {
            assert_eq!(a[i].uv, b[i].uv);
            assert_eq!(a[i].pos[1], b[i].pos[1]);
            // x reflected about the center.
            assert_eq!(a[i].pos[0] - 50.0, 50.0 - b[i].pos[0]);
        }
    }
}
