//! Paint state shared by both draw backends.
//!
//! Scope:
//! - color representation (straight alpha, `[0, 1]` channels)
//! - compositing mode (normal / additive)

mod blend;
mod color;

pub use blend::BlendMode;
pub use color::Color;
