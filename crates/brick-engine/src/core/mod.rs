//! Core engine-facing contracts.
//!
//! This module defines the interface between the runtime (platform loop) and
//! game code: the [`Game`] lifecycle callbacks and the per-callback
//! [`EngineCtx`].

mod ctx;
mod game;

pub use ctx::{EngineCommand, EngineCtx};
pub use game::Game;
