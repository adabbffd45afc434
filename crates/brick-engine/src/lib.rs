//! Brick engine crate.
//!
//! A small 2D engine built around a hybrid draw layer: world-space tile,
//! rect, line and text primitives are routed either to a batched GPU backend
//! or to a software canvas, with identical coordinate and blend semantics.
//! The runtime drives a fixed-step [`core::Game`] inside a single window.

pub mod device;
pub mod window;
pub mod input;
pub mod time;
pub mod core;

pub mod logging;
pub mod coords;
pub mod draw;
pub mod render;
pub mod paint;
pub mod text;

mod engine;

pub use engine::{Engine, EngineConfig, NO_GL_ENV};
