use super::Vec2;

/// Axis-aligned rectangle stored as min/max corners.
///
/// Used for screen-space bounds (raster pixels, top-left origin) and for tile
/// source regions in sheet pixels.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            min: Vec2::new(x, y),
            max: Vec2::new(x + w, y + h),
        }
    }

    #[inline]
    pub const fn from_min_max(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn from_center_size(center: Vec2, size: Vec2) -> Self {
        let half = size.abs().scale(0.5);
        Self::from_min_max(center - half, center + half)
    }

    /// Smallest rectangle containing every point, `None` for an empty iterator.
    pub fn bounding(points: impl IntoIterator<Item = Vec2>) -> Option<Self> {
        let mut it = points.into_iter();
        let first = it.next()?;
        Some(it.fold(Self::from_min_max(first, first), |r, p| r.include(p)))
    }

    #[inline]
    pub fn width(self) -> f32 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(self) -> f32 {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn size(self) -> Vec2 {
        self.max - self.min
    }

    #[inline]
    pub fn center(self) -> Vec2 {
        (self.min + self.max).scale(0.5)
    }

    #[inline]
    pub fn area(self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Grows the rectangle to contain `p`.
    #[inline]
    pub fn include(self, p: Vec2) -> Self {
        Self::from_min_max(
            Vec2::new(self.min.x.min(p.x), self.min.y.min(p.y)),
            Vec2::new(self.max.x.max(p.x), self.max.y.max(p.y)),
        )
    }

    /// Shrinks each side by `by` (negative values grow the rectangle).
    #[inline]
    pub fn inset(self, by: Vec2) -> Self {
        Self::from_min_max(self.min + by, self.max - by)
    }

    /// Half-open containment: `[min, max)`.
    #[inline]
    pub fn contains(self, p: Vec2) -> bool {
        p.x >= self.min.x && p.y >= self.min.y && p.x < self.max.x && p.y < self.max.y
    }

    /// `true` if `self` lies inside `outer` (edges inclusive).
    #[inline]
    pub fn is_within(self, outer: Rect) -> bool {
        self.min.x >= outer.min.x
            && self.min.y >= outer.min.y
            && self.max.x <= outer.max.x
            && self.max.y <= outer.max.y
    }

    #[inline]
    pub fn intersect(self, other: Rect) -> Option<Rect> {
        let r = Self::from_min_max(
            Vec2::new(self.min.x.max(other.min.x), self.min.y.max(other.min.y)),
            Vec2::new(self.max.x.min(other.max.x), self.max.y.min(other.max.y)),
        );
        if r.is_empty() { None } else { Some(r) }
    }
}
