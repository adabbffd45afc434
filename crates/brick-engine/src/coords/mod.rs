//! Coordinate and geometry types shared by the draw layer and GPU renderers.
//!
//! Two spaces are in play:
//! - world space: camera-relative units, +Y up
//! - screen space: canvas pixels, origin top-left, +Y down
//!
//! Conversion between them lives in `draw::View`.

mod affine;
mod rect;
mod vec2;
mod viewport;

pub use affine::Affine;
pub use rect::Rect;
pub use vec2::Vec2;
pub use viewport::Viewport;
