use std::path::PathBuf;

use anyhow::Result;

use crate::coords::Vec2;
use crate::core::Game;
use crate::device::GpuInit;
use crate::draw::DrawLayerConfig;
use crate::logging::{init_logging, LoggingConfig};
use crate::paint::Color;
use crate::window::Runtime;

/// Environment variable that forces the canvas backend when set to `1`.
pub const NO_GL_ENV: &str = "BRICK_NO_GL";

/// Engine configuration. Build through [`Engine`] or set fields directly.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub title: String,
    /// Initial window size in logical pixels.
    pub window_size: (f64, f64),
    /// Fixed canvas resolution. `None` makes the canvas follow the window.
    pub canvas_fixed_size: Option<Vec2>,
    /// Use the GPU batch backend for accelerated draws.
    pub gl_enable: bool,
    /// Cell size for draws that don't name one, in sheet pixels.
    pub tile_size_default: Vec2,
    /// UV inset per tile side, in sheet pixels.
    pub tile_bleed_scale: f32,
    /// Image loaded into the main sheet at startup.
    pub tile_sheet: Option<PathBuf>,
    /// `(name, bytes)`; the first font that loads is the default.
    pub fonts: Vec<(String, Vec<u8>)>,
    /// Fixed update rate in Hz.
    pub frame_rate: f32,
    pub clear_color: Color,
    /// Initial camera scale in pixels per world unit.
    pub camera_scale: f32,
    pub logging: LoggingConfig,
    pub gpu: GpuInit,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: "brick".to_string(),
            window_size: (1280.0, 720.0),
            canvas_fixed_size: None,
            gl_enable: true,
            tile_size_default: Vec2::splat(16.0),
            tile_bleed_scale: 0.3,
            tile_sheet: None,
            fonts: Vec::new(),
            frame_rate: 60.0,
            clear_color: Color::BLACK,
            camera_scale: 32.0,
            logging: LoggingConfig::default(),
            gpu: GpuInit::default(),
        }
    }
}

impl EngineConfig {
    /// Applies `BRICK_NO_GL`. `value` is the variable's content, if set.
    pub fn apply_no_gl(&mut self, value: Option<&str>) {
        if value.is_some_and(|v| v.trim() == "1") && self.gl_enable {
            log::info!("{NO_GL_ENV}=1: accelerated backend disabled");
            self.gl_enable = false;
        }
    }

    pub(crate) fn draw_layer_config(&self) -> DrawLayerConfig {
        DrawLayerConfig {
            accelerated: self.gl_enable,
            tile_size_default: self.tile_size_default,
            tile_bleed_scale: self.tile_bleed_scale,
        }
    }
}

/// Entry point: configure, then [`run`](Self::run) a [`Game`].
pub struct Engine {
    config: EngineConfig,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = title.into();
        self
    }

    /// Initial window size in logical pixels.
    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.config.window_size = (width, height);
        self
    }

    pub fn canvas_fixed_size(mut self, size: Vec2) -> Self {
        self.config.canvas_fixed_size = Some(size);
        self
    }

    pub fn gl_enable(mut self, enable: bool) -> Self {
        self.config.gl_enable = enable;
        self
    }

    pub fn tile_size_default(mut self, size: Vec2) -> Self {
        self.config.tile_size_default = size;
        self
    }

    pub fn tile_bleed_scale(mut self, bleed: f32) -> Self {
        self.config.tile_bleed_scale = bleed;
        self
    }

    pub fn tile_sheet(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tile_sheet = Some(path.into());
        self
    }

    /// Registers a font. Empty `data` is skipped with a warning at startup.
    pub fn font(mut self, name: impl Into<String>, data: Vec<u8>) -> Self {
        self.config.fonts.push((name.into(), data));
        self
    }

    pub fn frame_rate(mut self, hz: f32) -> Self {
        self.config.frame_rate = hz;
        self
    }

    pub fn clear_color(mut self, color: Color) -> Self {
        self.config.clear_color = color;
        self
    }

    pub fn camera_scale(mut self, scale: f32) -> Self {
        self.config.camera_scale = scale;
        self
    }

    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.config.logging = logging;
        self
    }

    pub fn gpu(mut self, gpu: GpuInit) -> Self {
        self.config.gpu = gpu;
        self
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Opens the window and runs `game` until the window closes.
    pub fn run<G>(self, game: G) -> Result<()>
    where
        G: Game + 'static,
    {
        let mut config = self.config;
        init_logging(config.logging.clone());
        config.apply_no_gl(std::env::var(NO_GL_ENV).ok().as_deref());

        log::info!(
            "starting '{}' ({} backend, {} Hz)",
            config.title,
            if config.gl_enable { "batch" } else { "canvas" },
            config.frame_rate
        );
        Runtime::run(config, game)
    }
}
