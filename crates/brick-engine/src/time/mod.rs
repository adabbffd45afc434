//! Time subsystem.
//!
//! - `FrameClock`: clamped wall-clock delta between presented frames
//! - `FixedStep`: turns frame deltas into a whole number of fixed updates

mod fixed_step;
mod frame_clock;

pub use fixed_step::FixedStep;
pub use frame_clock::FrameClock;
