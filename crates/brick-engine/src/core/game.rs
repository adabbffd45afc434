use crate::draw::Painter;

use super::ctx::EngineCtx;

/// Game contract driven by the runtime.
///
/// Per presented frame the runtime calls, in order: `update` and
/// `update_post` once per due fixed step (possibly zero times), then `render`
/// and `render_post` once. `init` runs once before the first frame.
pub trait Game {
    /// Called once after the window and draw layer exist.
    fn init(&mut self, ctx: &mut EngineCtx<'_>) {
        let _ = ctx;
    }

    /// Fixed-rate simulation step.
    fn update(&mut self, ctx: &mut EngineCtx<'_>);

    /// Runs after `update`, e.g. to move the camera after objects moved.
    fn update_post(&mut self, ctx: &mut EngineCtx<'_>) {
        let _ = ctx;
    }

    /// Draws the world.
    fn render(&mut self, ctx: &EngineCtx<'_>, painter: &mut Painter<'_>);

    /// Draws on top of `render`, e.g. HUD text.
    fn render_post(&mut self, ctx: &EngineCtx<'_>, painter: &mut Painter<'_>) {
        let _ = (ctx, painter);
    }
}
