use crate::coords::Vec2;
use crate::paint::Color;
use crate::text::FontId;

use super::tile::SheetId;

/// Options for [`Painter::draw_tile`](super::Painter::draw_tile).
///
/// Construct with [`TileDraw::new`] (or `Default`) and override fields with the
/// builder methods. `tile_size: None` means the engine's default tile size.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TileDraw {
    /// World-space width and height. Default `(1, 1)`.
    pub size: Vec2,
    /// Cell index on the sheet; negative draws an untextured rect. Default `-1`.
    pub tile_index: i32,
    /// Cell size in sheet pixels. Default: `EngineConfig::tile_size_default`.
    pub tile_size: Option<Vec2>,
    /// Sheet to sample. Default [`SheetId::MAIN`].
    pub sheet: SheetId,
    /// Multiplied with the texture (or used as the fill). Default white.
    pub color: Color,
    /// World-space rotation in radians, counter-clockwise. Default `0`.
    pub angle: f32,
    /// Flip horizontally. Default `false`.
    pub mirror: bool,
    /// Added to the sampled texture color. Ignored for untextured draws.
    pub additive_color: Color,
    /// Route through the accelerated backend when it is available. Default `true`.
    pub accelerated: bool,
}

impl Default for TileDraw {
    fn default() -> Self {
        Self {
            size: Vec2::ONE,
            tile_index: -1,
            tile_size: None,
            sheet: SheetId::MAIN,
            color: Color::WHITE,
            angle: 0.0,
            mirror: false,
            additive_color: Color::TRANSPARENT,
            accelerated: true,
        }
    }
}

impl TileDraw {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Untextured rect of `size`.
    #[inline]
    pub fn rect(size: Vec2, color: Color) -> Self {
        Self { size, color, ..Self::default() }
    }

    /// Textured tile `tile_index` of `size`.
    #[inline]
    pub fn tile(size: Vec2, tile_index: i32) -> Self {
        Self { size, tile_index, ..Self::default() }
    }

    pub fn size(mut self, size: Vec2) -> Self {
        self.size = size;
        self
    }

    pub fn tile_index(mut self, tile_index: i32) -> Self {
        self.tile_index = tile_index;
        self
    }

    pub fn tile_size(mut self, tile_size: Vec2) -> Self {
        self.tile_size = Some(tile_size);
        self
    }

    pub fn sheet(mut self, sheet: SheetId) -> Self {
        self.sheet = sheet;
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    pub fn mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn additive(mut self, additive_color: Color) -> Self {
        self.additive_color = additive_color;
        self
    }

    pub fn accelerated(mut self, accelerated: bool) -> Self {
        self.accelerated = accelerated;
        self
    }
}

/// Horizontal text anchoring relative to the draw position.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Options for [`Painter::draw_text`](super::Painter::draw_text).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TextDraw {
    /// Glyph height in world units. Default `1`.
    pub size: f32,
    pub color: Color,
    /// Outline width in world units; `0` disables the outline.
    pub line_width: f32,
    /// Outline color. Default black.
    pub line_color: Color,
    pub align: TextAlign,
    /// `None` uses the default font.
    pub font: Option<FontId>,
}

impl Default for TextDraw {
    fn default() -> Self {
        Self {
            size: 1.0,
            color: Color::WHITE,
            line_width: 0.0,
            line_color: Color::BLACK,
            align: TextAlign::Center,
            font: None,
        }
    }
}

impl TextDraw {
    #[inline]
    pub fn new(size: f32) -> Self {
        Self { size, ..Self::default() }
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn outline(mut self, line_width: f32, line_color: Color) -> Self {
        self.line_width = line_width;
        self.line_color = line_color;
        self
    }

    pub fn align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    pub fn font(mut self, font: FontId) -> Self {
        self.font = Some(font);
        self
    }
}
