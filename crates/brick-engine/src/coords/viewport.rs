use super::Vec2;

/// Canvas size in pixels.
///
/// The GPU batch shader uses this as the basis for converting raster pixel
/// positions to NDC; the CPU canvases are allocated at this size.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn from_size(size: Vec2) -> Self {
        Self::new(size.x, size.y)
    }

    #[inline]
    pub fn size(self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    #[inline]
    pub fn center(self) -> Vec2 {
        self.size().scale(0.5)
    }

    /// Pixel dimensions rounded down, at least 1×1.
    #[inline]
    pub fn pixel_size(self) -> (u32, u32) {
        (self.width.max(1.0) as u32, self.height.max(1.0) as u32)
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }
}
