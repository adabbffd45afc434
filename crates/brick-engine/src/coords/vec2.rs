use core::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// 2D vector.
///
/// Used for both world space (Y-up, world units) and screen space (Y-down,
/// pixels). The type does not track which space a value lives in; the draw
/// layer converts between them through [`View`](crate::draw::View).
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2::new(0.0, 0.0);
    pub const ONE: Vec2 = Vec2::new(1.0, 1.0);

    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn splat(v: f32) -> Self {
        Self { x: v, y: v }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self::ZERO
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Uniform scale.
    #[inline]
    pub fn scale(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s)
    }

    /// Component-wise product.
    #[inline]
    pub fn multiply(self, rhs: Vec2) -> Self {
        Self::new(self.x * rhs.x, self.y * rhs.y)
    }

    /// Component-wise quotient.
    #[inline]
    pub fn divide(self, rhs: Vec2) -> Self {
        Self::new(self.x / rhs.x, self.y / rhs.y)
    }

    #[inline]
    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    #[inline]
    pub fn distance(self, other: Vec2) -> f32 {
        (self - other).length()
    }

    /// Direction angle in radians, `atan2(y, x)`.
    ///
    /// `+X` is `0`, `+Y` is `π/2`.
    #[inline]
    pub fn angle(self) -> f32 {
        self.y.atan2(self.x)
    }

    /// Rotates counter-clockwise (in a Y-up frame) by `radians`.
    #[inline]
    pub fn rotate(self, radians: f32) -> Self {
        let (s, c) = radians.sin_cos();
        Self::new(self.x * c - self.y * s, self.x * s + self.y * c)
    }

    /// Returns a vector of `len` in the same direction, or zero for a zero vector.
    #[inline]
    pub fn normalize(self, len: f32) -> Self {
        let l = self.length();
        if l > 0.0 { self.scale(len / l) } else { Self::ZERO }
    }

    #[inline]
    pub fn lerp(self, to: Vec2, t: f32) -> Self {
        self + (to - self).scale(t.clamp(0.0, 1.0))
    }

    #[inline]
    pub fn abs(self) -> Self {
        Self::new(self.x.abs(), self.y.abs())
    }

    #[inline]
    pub fn floor(self) -> Self {
        Self::new(self.x.floor(), self.y.floor())
    }

    /// Returns `true` if the components differ from `other` by at most `eps`.
    #[inline]
    pub fn approx_eq(self, other: Vec2, eps: f32) -> bool {
        (self.x - other.x).abs() <= eps && (self.y - other.y).abs() <= eps
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    #[inline]
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    #[inline]
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    #[inline]
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    #[inline]
    fn sub_assign(&mut self, rhs: Vec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    #[inline]
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Mul<Vec2> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn mul(self, rhs: Vec2) -> Vec2 {
        self.multiply(rhs)
    }
}

impl Div<f32> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn div(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x / rhs, self.y / rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    const EPS: f32 = 1e-6;

    #[test]
    fn angle_of_axes() {
        assert!((Vec2::new(1.0, 0.0).angle() - 0.0).abs() < EPS);
        assert!((Vec2::new(0.0, 1.0).angle() - FRAC_PI_2).abs() < EPS);
        assert!((Vec2::new(-1.0, 0.0).angle() - PI).abs() < EPS);
        assert!((Vec2::new(1.0, 1.0).angle() - FRAC_PI_4).abs() < EPS);
    }

    #[test]
    fn rotate_quarter_turn_is_counter_clockwise() {
        let v = Vec2::new(1.0, 0.0).rotate(FRAC_PI_2);
        assert!(v.approx_eq(Vec2::new(0.0, 1.0), EPS));
    }

    #[test]
    fn normalize_zero_stays_zero() {
        assert_eq!(Vec2::ZERO.normalize(1.0), Vec2::ZERO);
        let n = Vec2::new(3.0, 4.0).normalize(10.0);
        assert!(n.approx_eq(Vec2::new(6.0, 8.0), 1e-5));
    }

    #[test]
    fn nan_propagates() {
        let v = Vec2::new(f32::NAN, 1.0) + Vec2::ONE;
        assert!(v.x.is_nan());
        assert!(!v.is_finite());
    }
}
