use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, MouseButton as WinitMouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Fullscreen, Window};

use crate::coords::{Rect, Vec2, Viewport};
use crate::core::{EngineCommand, EngineCtx, Game};
use crate::device::{Gpu, GpuInit, SurfaceErrorAction};
use crate::draw::{Camera, DrawLayer, View};
use crate::engine::EngineConfig;
use crate::input::{ButtonState, InputEvent, InputFrame, InputState, Key, MouseButton};
use crate::paint::Color;
use crate::render::{fit_canvas, CanvasCompositor, GpuBatchRenderer, RenderCtx, RenderTarget};
use crate::time::{FixedStep, FrameClock};

/// Pixel scroll distance treated as one wheel line.
const PIXELS_PER_LINE: f64 = 40.0;

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Runs `game` in a single window until it closes or the game exits.
    pub fn run<G>(config: EngineConfig, game: G) -> Result<()>
    where
        G: Game + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, game);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.fatal.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    input_state: InputState,
    input_frame: InputFrame,
    clock: FrameClock,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

impl WindowEntry {
    fn create(
        window: Window,
        gpu_init: GpuInit,
        input_state: InputState,
        input_frame: InputFrame,
        clock: FrameClock,
    ) -> Result<Self> {
        WindowEntryTryBuilder {
            input_state,
            input_frame,
            clock,
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
    }
}

/// GPU-side renderers; rebuilt together when the device changes.
struct Compositors {
    main: CanvasCompositor,
    batch: GpuBatchRenderer,
    overlay: CanvasCompositor,
}

impl Compositors {
    fn new() -> Self {
        Self {
            main: CanvasCompositor::new("brick main canvas"),
            batch: GpuBatchRenderer::new(),
            overlay: CanvasCompositor::new("brick overlay canvas"),
        }
    }
}

/// Simulation state shared by every game callback.
struct Sim {
    camera: Camera,
    step: FixedStep,
    commands: Vec<EngineCommand>,
}

impl Sim {
    fn ctx<'a>(
        &'a mut self,
        canvas: Viewport,
        input: &'a InputState,
        input_frame: &'a InputFrame,
        fullscreen: bool,
        frame: u64,
    ) -> EngineCtx<'a> {
        let step = self.step.step();
        EngineCtx {
            camera: &mut self.camera,
            canvas,
            input,
            input_frame,
            fullscreen,
            step,
            time: frame as f64 * f64::from(step),
            frame,
            commands: &mut self.commands,
        }
    }
}

/// What the redraw handler asks the event loop to do afterwards.
#[derive(Debug, Default)]
struct FrameOutcome {
    device_lost: bool,
    batch_failed: bool,
    fatal: Option<anyhow::Error>,
}

struct AppState<G>
where
    G: Game + 'static,
{
    config: EngineConfig,
    game: G,
    initialized: bool,

    layer: DrawLayer,
    compositors: Compositors,
    sim: Sim,

    window: Option<WindowEntry>,
    exit_requested: bool,
    fatal: Option<anyhow::Error>,
}

impl<G> AppState<G>
where
    G: Game + 'static,
{
    fn new(config: EngineConfig, game: G) -> Self {
        let mut layer = DrawLayer::new(config.draw_layer_config());

        for (name, data) in &config.fonts {
            if data.is_empty() {
                log::warn!("font '{name}' has no data, skipping");
                continue;
            }
            match layer.fonts_mut().load_font(name, data) {
                Ok(_) => log::debug!("font '{name}' loaded"),
                Err(e) => log::warn!("font '{name}' failed to load: {e}"),
            }
        }

        if let Some(path) = &config.tile_sheet {
            layer.sheets_mut().load(crate::draw::SheetId::MAIN, path);
        }

        let sim = Sim {
            camera: Camera::new(Vec2::ZERO, config.camera_scale),
            step: FixedStep::new(config.frame_rate),
            commands: Vec::new(),
        };

        Self {
            config,
            game,
            initialized: false,
            layer,
            compositors: Compositors::new(),
            sim,
            window: None,
            exit_requested: false,
            fatal: None,
        }
    }

    fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    fn fail(&mut self, err: anyhow::Error) {
        log::error!("{err:#}");
        self.fatal = Some(err);
        self.request_exit();
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let (w, h) = self.config.window_size;
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(LogicalSize::new(w, h));

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let entry = WindowEntry::create(
            window,
            self.config.gpu.clone(),
            InputState::default(),
            InputFrame::default(),
            FrameClock::default(),
        )?;
        log::info!("surface format: {:?}", entry.borrow_gpu().surface_format());

        self.window = Some(entry);
        Ok(())
    }

    /// Replaces the lost device with a new one on the same window.
    fn rebuild_gpu(&mut self) -> Result<()> {
        let Some(entry) = self.window.take() else {
            return Ok(());
        };
        let heads = entry.into_heads();

        self.compositors = Compositors::new();
        let entry = WindowEntry::create(
            heads.window,
            self.config.gpu.clone(),
            heads.input_state,
            heads.input_frame,
            heads.clock,
        )
        .context("failed to recreate GPU device")?;
        log::info!("GPU device recreated");

        self.window = Some(entry);
        Ok(())
    }

    fn apply_commands(&mut self, event_loop: &ActiveEventLoop) {
        for cmd in std::mem::take(&mut self.sim.commands) {
            match cmd {
                EngineCommand::ToggleFullscreen => {
                    if let Some(entry) = self.window.as_ref() {
                        entry.with_window(|w| {
                            let next = match w.fullscreen() {
                                Some(_) => None,
                                None => Some(Fullscreen::Borderless(None)),
                            };
                            w.set_fullscreen(next);
                        });
                    }
                }
                EngineCommand::Exit => self.request_exit(),
            }
        }

        if self.exit_requested {
            event_loop.exit();
        }
    }

    fn redraw(&mut self) -> FrameOutcome {
        let Some(entry) = self.window.as_mut() else {
            return FrameOutcome::default();
        };

        // Split borrows to avoid `self` capture inside `ouroboros` closures.
        let (game, initialized, layer, compositors, sim) = (
            &mut self.game,
            &mut self.initialized,
            &mut self.layer,
            &mut self.compositors,
            &mut self.sim,
        );
        let fixed_canvas = self.config.canvas_fixed_size;
        let clear_color = self.config.clear_color;

        entry.with_mut(|fields| {
            let mut outcome = FrameOutcome::default();
            let surface = fields.gpu.size();
            let canvas = canvas_viewport(fixed_canvas, surface);
            let fullscreen = fields.window.fullscreen().is_some();

            if !*initialized {
                let frame = sim.step.updates();
                let mut ctx = sim.ctx(canvas, fields.input_state, fields.input_frame, fullscreen, frame);
                game.init(&mut ctx);
                *initialized = true;
                fields.clock.reset();
            }

            // ── simulation ────────────────────────────────────────────────
            let steps = sim.step.advance(fields.clock.tick());
            let first = sim.step.updates() - u64::from(steps);
            for i in 1..=u64::from(steps) {
                let mut ctx =
                    sim.ctx(canvas, fields.input_state, fields.input_frame, fullscreen, first + i);
                game.update(&mut ctx);
                game.update_post(&mut ctx);
            }
            // Presses stay visible until an update has seen them.
            if steps > 0 {
                fields.input_frame.clear();
            }

            // ── draw ──────────────────────────────────────────────────────
            layer.begin_frame(View::new(sim.camera, canvas));
            {
                let frame = sim.step.updates();
                let ctx = sim.ctx(canvas, fields.input_state, fields.input_frame, fullscreen, frame);
                let mut painter = layer.painter();
                game.render(&ctx, &mut painter);
                game.render_post(&ctx, &mut painter);
            }
            layer.end_frame();

            // ── present ───────────────────────────────────────────────────
            let gpu = fields.gpu;
            if gpu.is_lost() {
                outcome.device_lost = true;
                return outcome;
            }

            let mut frame = match gpu.begin_frame() {
                Ok(frame) => frame,
                Err(err) => {
                    match gpu.handle_surface_error(err) {
                        SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => {}
                        SurfaceErrorAction::DeviceLost => outcome.device_lost = true,
                        SurfaceErrorAction::Fatal => {
                            outcome.fatal = Some(anyhow::anyhow!("surface is unusable"));
                        }
                    }
                    return outcome;
                }
            };

            let surface_view = Viewport::new(surface.width as f32, surface.height as f32);
            let present = fit_canvas(canvas, surface_view);
            let ctx = RenderCtx::new(gpu.device(), gpu.queue(), gpu.surface_format(), canvas, present);

            clear_surface(&mut frame.encoder, &frame.view, clear_color);
            {
                let mut target = RenderTarget::new(&mut frame.encoder, &frame.view);

                if layer.main_canvas_used() {
                    compositors.main.render(&ctx, &mut target, layer.main_canvas().image());
                }
                if let Some(batch) = layer.batch() {
                    if let Err(e) =
                        compositors
                            .batch
                            .render(&ctx, &mut target, batch.frame(), layer.sheets())
                    {
                        log::warn!("batch render failed: {e}");
                        outcome.batch_failed = true;
                    }
                }
                if layer.overlay_used() {
                    compositors.overlay.render(&ctx, &mut target, layer.overlay().image());
                }
            }

            fields.window.pre_present_notify();
            gpu.submit(frame);
            outcome
        })
    }
}

impl<G> ApplicationHandler for AppState<G>
where
    G: Game + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(e) = self.create_window_entry(event_loop) {
            self.fail(e.context("failed to create initial window"));
            event_loop.exit();
            return;
        }

        if let Some(entry) = self.window.as_ref() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw; frame pacing comes from the present mode.
        if let Some(entry) = self.window.as_ref() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        let fixed_canvas = self.config.canvas_fixed_size;
        let Some(entry) = self.window.as_mut() else {
            return;
        };

        entry.with_mut(|fields| {
            let surface = fields.gpu.size();
            let canvas = canvas_viewport(fixed_canvas, surface);
            let present = fit_canvas(
                canvas,
                Viewport::new(surface.width as f32, surface.height as f32),
            );
            if let Some(ev) = translate_input_event(&event, canvas, present) {
                fields.input_state.apply_event(fields.input_frame, &ev);
            }
        });

        match &event {
            WindowEvent::CloseRequested => {
                self.window = None;
                self.request_exit();
                event_loop.exit();
            }

            WindowEvent::Resized(new_size) => {
                entry.with_gpu_mut(|gpu| gpu.resize(*new_size));
                entry.with_window(|w| w.request_redraw());
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                let new_size = entry.with_window(|w| w.inner_size());
                entry.with_gpu_mut(|gpu| gpu.resize(new_size));
                entry.with_window(|w| w.request_redraw());
            }

            WindowEvent::RedrawRequested => {
                let outcome = self.redraw();

                if let Some(e) = outcome.fatal {
                    self.fail(e);
                }
                if outcome.batch_failed || outcome.device_lost {
                    self.layer.fall_back_to_immediate();
                }
                if outcome.device_lost {
                    if let Err(e) = self.rebuild_gpu() {
                        self.fail(e);
                    }
                }

                self.apply_commands(event_loop);
            }

            _ => {}
        }

        if self.exit_requested {
            event_loop.exit();
        }
    }
}

/// Canvas size for a surface: the fixed size if configured, else the surface.
fn canvas_viewport(fixed: Option<Vec2>, surface: PhysicalSize<u32>) -> Viewport {
    match fixed {
        Some(size) if size.x > 0.0 && size.y > 0.0 => Viewport::from_size(size),
        _ => Viewport::new(surface.width.max(1) as f32, surface.height.max(1) as f32),
    }
}

/// Maps a surface position (physical pixels) into canvas pixels.
fn surface_to_canvas(pos: Vec2, canvas: Viewport, present: Rect) -> Vec2 {
    let size = present.size();
    if size.x <= 0.0 || size.y <= 0.0 {
        return pos;
    }
    (pos - present.min).multiply(canvas.size()).divide(size)
}

fn clear_surface(encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView, color: Color) {
    let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("brick clear pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color {
                    r: f64::from(color.r),
                    g: f64::from(color.g),
                    b: f64::from(color.b),
                    a: f64::from(color.a),
                }),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });
}

fn translate_input_event(event: &WindowEvent, canvas: Viewport, present: Rect) -> Option<InputEvent> {
    match event {
        WindowEvent::Focused(f) => Some(InputEvent::Focused(*f)),

        WindowEvent::CursorLeft { .. } => Some(InputEvent::PointerLeft),

        WindowEvent::CursorMoved { position, .. } => {
            let pos = Vec2::new(position.x as f32, position.y as f32);
            Some(InputEvent::PointerMoved(surface_to_canvas(pos, canvas, present)))
        }

        WindowEvent::MouseInput { state, button, .. } => Some(InputEvent::PointerButton {
            button: map_mouse_button(*button),
            state: map_state(*state),
        }),

        WindowEvent::MouseWheel { delta, .. } => Some(InputEvent::MouseWheel(wheel_lines(delta))),

        WindowEvent::KeyboardInput { event, .. } => Some(InputEvent::Key {
            key: map_key(event.physical_key),
            state: map_state(event.state),
            repeat: event.repeat,
        }),

        _ => None,
    }
}

fn wheel_lines(delta: &MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => *y,
        MouseScrollDelta::PixelDelta(p) => (p.y / PIXELS_PER_LINE) as f32,
    }
}

fn map_state(state: ElementState) -> ButtonState {
    match state {
        ElementState::Pressed => ButtonState::Pressed,
        ElementState::Released => ButtonState::Released,
    }
}

fn map_mouse_button(b: WinitMouseButton) -> MouseButton {
    match b {
        WinitMouseButton::Left => MouseButton::Left,
        WinitMouseButton::Right => MouseButton::Right,
        WinitMouseButton::Middle => MouseButton::Middle,
        WinitMouseButton::Back => MouseButton::Other(3),
        WinitMouseButton::Forward => MouseButton::Other(4),
        WinitMouseButton::Other(v) => MouseButton::Other(v),
    }
}

fn map_key(pk: PhysicalKey) -> Key {
    let PhysicalKey::Code(code) = pk else {
        return Key::Unknown(0);
    };
    match code {
        KeyCode::Escape => Key::Escape,
        KeyCode::Enter => Key::Enter,
        KeyCode::Tab => Key::Tab,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Space => Key::Space,

        KeyCode::ArrowUp => Key::ArrowUp,
        KeyCode::ArrowDown => Key::ArrowDown,
        KeyCode::ArrowLeft => Key::ArrowLeft,
        KeyCode::ArrowRight => Key::ArrowRight,

        KeyCode::ShiftLeft | KeyCode::ShiftRight => Key::Shift,
        KeyCode::ControlLeft | KeyCode::ControlRight => Key::Control,
        KeyCode::AltLeft | KeyCode::AltRight => Key::Alt,

        KeyCode::KeyA => Key::A,
        KeyCode::KeyB => Key::B,
        KeyCode::KeyC => Key::C,
        KeyCode::KeyD => Key::D,
        KeyCode::KeyE => Key::E,
        KeyCode::KeyF => Key::F,
        KeyCode::KeyG => Key::G,
        KeyCode::KeyH => Key::H,
        KeyCode::KeyI => Key::I,
        KeyCode::KeyJ => Key::J,
        KeyCode::KeyK => Key::K,
        KeyCode::KeyL => Key::L,
        KeyCode::KeyM => Key::M,
        KeyCode::KeyN => Key::N,
        KeyCode::KeyO => Key::O,
        KeyCode::KeyP => Key::P,
        KeyCode::KeyQ => Key::Q,
        KeyCode::KeyR => Key::R,
        KeyCode::KeyS => Key::S,
        KeyCode::KeyT => Key::T,
        KeyCode::KeyU => Key::U,
        KeyCode::KeyV => Key::V,
        KeyCode::KeyW => Key::W,
        KeyCode::KeyX => Key::X,
        KeyCode::KeyY => Key::Y,
        KeyCode::KeyZ => Key::Z,

        KeyCode::Digit0 => Key::Digit0,
        KeyCode::Digit1 => Key::Digit1,
        KeyCode::Digit2 => Key::Digit2,
        KeyCode::Digit3 => Key::Digit3,
        KeyCode::Digit4 => Key::Digit4,
        KeyCode::Digit5 => Key::Digit5,
        KeyCode::Digit6 => Key::Digit6,
        KeyCode::Digit7 => Key::Digit7,
        KeyCode::Digit8 => Key::Digit8,
        KeyCode::Digit9 => Key::Digit9,

        KeyCode::F1 => Key::F1,
        KeyCode::F2 => Key::F2,
        KeyCode::F3 => Key::F3,
        KeyCode::F4 => Key::F4,
        KeyCode::F5 => Key::F5,
        KeyCode::F6 => Key::F6,
        KeyCode::F7 => Key::F7,
        KeyCode::F8 => Key::F8,
        KeyCode::F9 => Key::F9,
        KeyCode::F10 => Key::F10,
        KeyCode::F11 => Key::F11,
        KeyCode::F12 => Key::F12,

        other => Key::Unknown(other as u32),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canvas_follows_surface_unless_fixed() {
        let surface = PhysicalSize::new(800, 600);
        assert_eq!(canvas_viewport(None, surface), Viewport::new(800.0, 600.0));
        assert_eq!(
            canvas_viewport(Some(Vec2::new(1280.0, 720.0)), surface),
            Viewport::new(1280.0, 720.0)
        );
        // Degenerate sizes fall back to the surface.
        assert_eq!(canvas_viewport(Some(Vec2::ZERO), surface), Viewport::new(800.0, 600.0));
        assert_eq!(canvas_viewport(None, PhysicalSize::new(0, 0)), Viewport::new(1.0, 1.0));
    }

    #[test]
    fn pointer_maps_through_letterbox() {
        let canvas = Viewport::new(1280.0, 720.0);
        // 1280x720 in a 1280x1000 surface: bars above and below.
        let present = fit_canvas(canvas, Viewport::new(1280.0, 1000.0));
        assert_eq!(present.min, Vec2::new(0.0, 140.0));

        let p = surface_to_canvas(Vec2::new(640.0, 500.0), canvas, present);
        assert!(p.approx_eq(Vec2::new(640.0, 360.0), 1e-3));

        let half = fit_canvas(canvas, Viewport::new(640.0, 360.0));
        let p = surface_to_canvas(Vec2::new(320.0, 180.0), canvas, half);
        assert!(p.approx_eq(Vec2::new(640.0, 360.0), 1e-3));
    }

    #[test]
    fn wheel_and_keys_translate() {
        assert_eq!(wheel_lines(&MouseScrollDelta::LineDelta(0.0, 2.0)), 2.0);
        let pixels = winit::dpi::PhysicalPosition::new(0.0, -80.0);
        assert_eq!(wheel_lines(&MouseScrollDelta::PixelDelta(pixels)), -2.0);

        assert_eq!(map_key(PhysicalKey::Code(KeyCode::Space)), Key::Space);
        assert_eq!(map_key(PhysicalKey::Code(KeyCode::KeyF)), Key::F);
        assert!(matches!(map_key(PhysicalKey::Code(KeyCode::NumLock)), Key::Unknown(_)));
        assert_eq!(map_mouse_button(WinitMouseButton::Left), MouseButton::Left);
    }

    #[test]
    fn focus_loss_translates() {
        let canvas = Viewport::new(100.0, 100.0);
        let present = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert_eq!(
            translate_input_event(&WindowEvent::Focused(false), canvas, present),
            Some(InputEvent::Focused(false))
        );
        assert_eq!(translate_input_event(&WindowEvent::Destroyed, canvas, present), None);
    }
}
