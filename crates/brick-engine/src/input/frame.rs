use std::collections::HashSet;

use super::types::{Key, MouseButton};

/// Input transitions since the last fixed update.
///
/// Cleared by the runtime only after an update consumed it, so presses that
/// arrive during a frame without an update are not lost.
#[derive(Debug, Default)]
pub struct InputFrame {
    pub keys_pressed: HashSet<Key>,
    pub keys_released: HashSet<Key>,
    pub buttons_pressed: HashSet<MouseButton>,
    pub buttons_released: HashSet<MouseButton>,
    /// Accumulated wheel lines.
    pub wheel: f32,
}

impl InputFrame {
    pub fn clear(&mut self) {
        self.keys_pressed.clear();
        self.keys_released.clear();
        self.buttons_pressed.clear();
        self.buttons_released.clear();
        self.wheel = 0.0;
    }
}
