use crate::coords::{Vec2, Viewport};

/// Camera placement in world space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    /// World position shown at the canvas center.
    pub pos: Vec2,
    /// Pixels per world unit.
    pub scale: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self { pos: Vec2::ZERO, scale: 32.0 }
    }
}

impl Camera {
    #[inline]
    pub const fn new(pos: Vec2, scale: f32) -> Self {
        Self { pos, scale }
    }
}

/// Render context for one frame: camera plus canvas size.
///
/// Owned by the frame loop and borrowed read-only by every draw call. Both
/// conversions are pure; non-finite input propagates to the output.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct View {
    pub camera: Camera,
    pub canvas: Viewport,
}

impl View {
    #[inline]
    pub const fn new(camera: Camera, canvas: Viewport) -> Self {
        Self { camera, canvas }
    }

    /// World position to screen pixel.
    ///
    /// Screen coordinates name pixel centers, hence the half-pixel offset.
    #[inline]
    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        let s = self.camera.scale;
        (world - self.camera.pos).multiply(Vec2::new(s, -s)) + self.canvas.center()
            - Vec2::splat(0.5)
    }

    /// Screen pixel to world position; exact inverse of [`world_to_screen`](Self::world_to_screen).
    #[inline]
    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        let inv = 1.0 / self.camera.scale;
        (screen + Vec2::splat(0.5) - self.canvas.center()).multiply(Vec2::new(inv, -inv))
            + self.camera.pos
    }

    /// World position to continuous raster space (pixel `i` covers `[i, i + 1)`).
    ///
    /// This is where both backends place geometry.
    #[inline]
    pub fn world_to_raster(&self, world: Vec2) -> Vec2 {
        self.world_to_screen(world) + Vec2::splat(0.5)
    }

    /// World-space size to pixels.
    #[inline]
    pub fn size_to_pixels(&self, size: Vec2) -> Vec2 {
        size.scale(self.camera.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(pos: Vec2, scale: f32) -> View {
        View::new(Camera::new(pos, scale), Viewport::new(1280.0, 720.0))
    }

    /// 1e-6 relative to the largest magnitude the f32 arithmetic passes through.
    fn close(a: Vec2, b: Vec2, v: &View) -> bool {
        let mag = b.x.abs().max(b.y.abs()).max(v.canvas.width).max(v.canvas.height)
            + v.camera.scale * v.camera.pos.length();
        a.approx_eq(b, 1e-6 * mag)
    }

    // ── round trip ────────────────────────────────────────────────────────

    #[test]
    fn screen_world_screen_round_trips() {
        let cameras = [
            (Vec2::ZERO, 1.0),
            (Vec2::new(36.0, 20.0), 16.0),
            (Vec2::new(-120.5, 7.25), 0.5),
            (Vec2::new(1000.0, -3000.0), 64.0),
        ];
        let points = [
            Vec2::ZERO,
            Vec2::new(639.5, 359.5),
            Vec2::new(1279.0, 719.0),
            Vec2::new(-50.0, 2000.0),
            Vec2::new(12.25, 3.75),
        ];
        for (pos, scale) in cameras {
            let v = view(pos, scale);
            for p in points {
                let back = v.world_to_screen(v.screen_to_world(p));
                assert!(close(back, p, &v), "camera {pos:?}@{scale}: {p:?} -> {back:?}");
            }
        }
    }

    // ── conventions ───────────────────────────────────────────────────────

    #[test]
    fn camera_position_maps_to_center_pixel() {
        let v = view(Vec2::new(36.0, 20.0), 16.0);
        assert_eq!(v.world_to_screen(Vec2::new(36.0, 20.0)), Vec2::new(639.5, 359.5));
        assert_eq!(v.world_to_raster(Vec2::new(36.0, 20.0)), Vec2::new(640.0, 360.0));
    }

    #[test]
    fn world_y_up_is_screen_y_down() {
        let v = view(Vec2::ZERO, 10.0);
        let up = v.world_to_screen(Vec2::new(0.0, 1.0));
        let origin = v.world_to_screen(Vec2::ZERO);
        assert_eq!(up.y, origin.y - 10.0);
        assert_eq!(v.world_to_screen(Vec2::new(1.0, 0.0)).x, origin.x + 10.0);
    }

    #[test]
    fn non_finite_input_propagates() {
        let v = view(Vec2::ZERO, 10.0);
        assert!(v.world_to_screen(Vec2::new(f32::NAN, 0.0)).x.is_nan());
        assert!(v.screen_to_world(Vec2::new(0.0, f32::INFINITY)).y.is_infinite());
    }
}
