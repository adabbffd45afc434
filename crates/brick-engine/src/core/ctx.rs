use crate::coords::{Vec2, Viewport};
use crate::draw::{Camera, View};
use crate::input::{InputFrame, InputState, Key, MouseButton};

/// Requests buffered by [`EngineCtx`] and applied by the runtime after the
/// current callback returns.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum EngineCommand {
    ToggleFullscreen,
    Exit,
}

/// Per-callback context passed to [`Game`](super::Game) methods.
pub struct EngineCtx<'a> {
    /// Mutated by game code in `update`; read by every draw of the frame.
    pub camera: &'a mut Camera,
    pub canvas: Viewport,
    pub(crate) input: &'a InputState,
    pub(crate) input_frame: &'a InputFrame,
    pub(crate) fullscreen: bool,
    pub(crate) step: f32,
    pub(crate) time: f64,
    pub(crate) frame: u64,
    pub(crate) commands: &'a mut Vec<EngineCommand>,
}

impl EngineCtx<'_> {
    /// Camera plus canvas: the transform every draw of this frame uses.
    #[inline]
    pub fn view(&self) -> View {
        View::new(*self.camera, self.canvas)
    }

    /// Seconds per fixed update.
    #[inline]
    pub fn time_delta(&self) -> f32 {
        self.step
    }

    /// Simulated seconds since start.
    #[inline]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Fixed updates run so far.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    // ── pointer ───────────────────────────────────────────────────────────

    /// Pointer in canvas pixels; `None` while outside the window.
    #[inline]
    pub fn mouse_pos_screen(&self) -> Option<Vec2> {
        self.input.pointer
    }

    /// Pointer in world units.
    pub fn mouse_pos(&self) -> Option<Vec2> {
        let view = self.view();
        self.input.pointer.map(|p| view.screen_to_world(p))
    }

    #[inline]
    pub fn mouse_is_down(&self, button: MouseButton) -> bool {
        self.input.button_down(button)
    }

    #[inline]
    pub fn mouse_was_pressed(&self, button: MouseButton) -> bool {
        self.input_frame.buttons_pressed.contains(&button)
    }

    #[inline]
    pub fn mouse_was_released(&self, button: MouseButton) -> bool {
        self.input_frame.buttons_released.contains(&button)
    }

    /// Wheel lines since the last update.
    #[inline]
    pub fn mouse_wheel(&self) -> f32 {
        self.input_frame.wheel
    }

    // ── keyboard ──────────────────────────────────────────────────────────

    #[inline]
    pub fn key_is_down(&self, key: Key) -> bool {
        self.input.key_down(key)
    }

    #[inline]
    pub fn key_was_pressed(&self, key: Key) -> bool {
        self.input_frame.keys_pressed.contains(&key)
    }

    #[inline]
    pub fn key_was_released(&self, key: Key) -> bool {
        self.input_frame.keys_released.contains(&key)
    }

    // ── window ────────────────────────────────────────────────────────────

    /// Window state at the start of this callback.
    #[inline]
    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Switches between windowed and borderless fullscreen after this callback.
    pub fn toggle_fullscreen(&mut self) {
        self.commands.push(EngineCommand::ToggleFullscreen);
    }

    pub fn exit(&mut self) {
        self.commands.push(EngineCommand::Exit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{ButtonState, InputEvent};

    #[test]
    fn mouse_pos_uses_camera() {
        let mut camera = Camera::new(Vec2::new(10.0, 5.0), 2.0);
        let mut input = InputState::default();
        let mut frame = InputFrame::default();
        input.apply_event(&mut frame, &InputEvent::PointerMoved(Vec2::new(49.5, 49.5)));
        input.apply_event(
            &mut frame,
            &InputEvent::PointerButton { button: MouseButton::Left, state: ButtonState::Pressed },
        );
        let mut commands = Vec::new();

        let mut ctx = EngineCtx {
            camera: &mut camera,
            canvas: Viewport::new(100.0, 100.0),
            input: &input,
            input_frame: &frame,
            fullscreen: false,
            step: 1.0 / 60.0,
            time: 0.0,
            frame: 0,
            commands: &mut commands,
        };

        assert_eq!(ctx.mouse_pos(), Some(Vec2::new(10.0, 5.0)));
        assert!(ctx.mouse_was_pressed(MouseButton::Left));
        assert!(ctx.mouse_is_down(MouseButton::Left));
        assert!(!ctx.mouse_was_pressed(MouseButton::Right));

        ctx.toggle_fullscreen();
        ctx.exit();
        assert_eq!(commands, [EngineCommand::ToggleFullscreen, EngineCommand::Exit]);
    }
}
