//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and Window, and drives the game, the draw layer
//! and the GPU compositors once per redraw.

mod runtime;

pub use runtime::Runtime;
