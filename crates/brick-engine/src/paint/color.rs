/// Straight-alpha RGBA color.
///
/// Channels are nominally in `[0, 1]`. Out-of-range values are allowed while
/// composing colors and are clamped by [`rgba_int`](Self::rgba_int) and
/// [`clamped`](Self::clamped) before reaching a backend.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Color {
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);
    pub const TRANSPARENT: Color = Color::new(0.0, 0.0, 0.0, 0.0);

    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color.
    #[inline]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Creates a color from straight sRGB bytes (`0`–`255`).
    #[inline]
    pub fn from_u8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, a as f32 / 255.0)
    }

    /// HSL constructor; `h` wraps, `s`/`l`/`a` are clamped.
    pub fn hsl(h: f32, s: f32, l: f32, a: f32) -> Self {
        let s = s.clamp(0.0, 1.0);
        let l = l.clamp(0.0, 1.0);
        let h = h.rem_euclid(1.0);
        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        let f = |t: f32| {
            let t = t.rem_euclid(1.0);
            if t < 1.0 / 6.0 {
                p + (q - p) * 6.0 * t
            } else if t < 0.5 {
                q
            } else if t < 2.0 / 3.0 {
                p + (q - p) * (2.0 / 3.0 - t) * 6.0
            } else {
                p
            }
        };
        Self::new(f(h + 1.0 / 3.0), f(h), f(h - 1.0 / 3.0), a.clamp(0.0, 1.0))
    }

    #[inline]
    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Component-wise product (tinting).
    #[inline]
    pub fn multiply(self, rhs: Color) -> Self {
        Self::new(self.r * rhs.r, self.g * rhs.g, self.b * rhs.b, self.a * rhs.a)
    }

    #[inline]
    pub fn lerp(self, to: Color, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self::new(
            self.r + (to.r - self.r) * t,
            self.g + (to.g - self.g) * t,
            self.b + (to.b - self.b) * t,
            self.a + (to.a - self.a) * t,
        )
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite() && self.a.is_finite()
    }

    /// Clamps every channel to `[0, 1]`. NaN channels become `0`.
    #[inline]
    pub fn clamped(self) -> Self {
        let c = |v: f32| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        Self::new(c(self.r), c(self.g), c(self.b), c(self.a))
    }

    /// Clamped channels as bytes, `[r, g, b, a]`.
    #[inline]
    pub fn to_u8(self) -> [u8; 4] {
        let c = self.clamped();
        let q = |v: f32| (v * 255.0).round() as u8;
        [q(c.r), q(c.g), q(c.b), q(c.a)]
    }

    /// Packs into `r | g << 8 | b << 16 | a << 24` after clamping.
    ///
    /// Little-endian byte order of the result is `[r, g, b, a]`, which is what
    /// the batch vertex layout reads as `Unorm8x4`.
    #[inline]
    pub fn rgba_int(self) -> u32 {
        u32::from_le_bytes(self.to_u8())
    }

    /// CSS `rgba(r,g,b,a)` string with 0–255 channels and a unit alpha.
    pub fn rgba(self) -> String {
        let c = self.clamped();
        let [r, g, b, _] = self.to_u8();
        format!("rgba({r},{g},{b},{})", c.a)
    }
}
