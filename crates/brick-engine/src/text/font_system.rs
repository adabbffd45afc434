use std::collections::HashMap;
use std::fmt;

use fontdue::layout::{CoordinateSystem, GlyphRasterConfig, Layout, LayoutSettings, TextStyle};

use crate::coords::Vec2;

/// Error returned by [`FontSystem::load_font`].
#[derive(Debug, Clone)]
pub struct FontLoadError(pub String);

impl fmt::Display for FontLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "font load error: {}", self.0)
    }
}

impl std::error::Error for FontLoadError {}

/// Opaque handle to a font loaded into a [`FontSystem`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FontId(pub(crate) usize);

/// A glyph bitmap placed by [`FontSystem::layout_line`], relative to the line
/// origin (top-left of the line box, +Y down).
#[derive(Debug, Copy, Clone)]
pub(crate) struct PlacedGlyph {
    pub key: GlyphRasterConfig,
    pub x: f32,
    pub y: f32,
}

/// Loaded fonts, addressable by [`FontId`] or by the name they were registered under.
///
/// The first font that loads becomes the default used by text draws that do
/// not name a font.
pub struct FontSystem {
    fonts: Vec<fontdue::Font>,
    names: HashMap<String, FontId>,
}

impl FontSystem {
    pub fn new() -> Self {
        Self {
            fonts: Vec::new(),
            names: HashMap::new(),
        }
    }

    /// Parses a TrueType/OpenType font and registers it under `name`.
    pub fn load_font(&mut self, name: &str, bytes: &[u8]) -> Result<FontId, FontLoadError> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| FontLoadError(format!("{name}: {e}")))?;
        let id = FontId(self.fonts.len());
        self.fonts.push(font);
        self.names.insert(name.to_string(), id);
        log::debug!("font '{name}' loaded as {id:?}");
        Ok(id)
    }

    /// Returns the font registered under `name`.
    pub fn by_name(&self, name: &str) -> Option<FontId> {
        self.names.get(name).copied()
    }

    /// The first loaded font, if any.
    pub fn default_font(&self) -> Option<FontId> {
        if self.fonts.is_empty() { None } else { Some(FontId(0)) }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    pub(crate) fn get(&self, id: FontId) -> Option<&fontdue::Font> {
        self.fonts.get(id.0)
    }

    /// Resolves `id` (or the default font) to a loaded font.
    pub(crate) fn resolve(&self, id: Option<FontId>) -> Option<&fontdue::Font> {
        self.get(id.or_else(|| self.default_font())?)
    }

    /// Lays out a single line at `px` and returns the glyphs plus the line's
    /// `(advance width, ascent, descent)`. Descent is negative.
    pub(crate) fn layout_line(
        font: &fontdue::Font,
        text: &str,
        px: f32,
    ) -> (Vec<PlacedGlyph>, f32, f32, f32) {
        let mut layout: Layout<()> = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings::default());
        layout.append(&[font], &TextStyle::new(text, px, 0));

        let (ascent, descent) = font
            .horizontal_line_metrics(px)
            .map_or((px * 0.8, -px * 0.2), |m| (m.ascent, m.descent));

        let mut width = 0.0f32;
        let glyphs = layout
            .glyphs()
            .iter()
            .map(|g| {
                let m = font.metrics_indexed(g.key.glyph_index, px);
                width = width.max(g.x - m.xmin as f32 + m.advance_width);
                PlacedGlyph { key: g.key, x: g.x, y: g.y }
            })
            .collect();

        (glyphs, width.max(0.0), ascent, descent)
    }

    /// Size of `text` laid out on one line at `px` pixels: `(advance width, line height)`.
    #[must_use]
    pub fn measure_text(&self, text: &str, id: Option<FontId>, px: f32) -> Vec2 {
        let Some(font) = self.resolve(id) else {
            return Vec2::new(0.0, px * 1.2);
        };
        let (_, width, ascent, descent) = Self::layout_line(font, text, px);
        Vec2::new(width, ascent - descent)
    }
}

#[cfg(test)]
pub(crate) const SANS_TTF: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

/// A font system with DejaVu Sans loaded as the default.
#[cfg(test)]
pub(crate) fn sans() -> FontSystem {
    let mut fonts = FontSystem::new();
    fonts.load_font("sans", SANS_TTF).unwrap();
    fonts
}

impl Default for FontSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_system_has_no_default() {
        let fonts = FontSystem::new();
        assert!(fonts.default_font().is_none());
        assert!(fonts.resolve(None).is_none());
        assert!(fonts.measure_text("abc", None, 10.0).approx_eq(Vec2::new(0.0, 12.0), 1e-5));
    }

    #[test]
    fn first_font_becomes_default() {
        let fonts = sans();
        let id = fonts.by_name("sans").unwrap();
        assert_eq!(fonts.default_font(), Some(id));

        let one = fonts.measure_text("H", None, 20.0);
        let two = fonts.measure_text("HH", Some(id), 20.0);
        assert!(one.x > 0.0);
        assert!((two.x - 2.0 * one.x).abs() < 1.0, "{one:?} {two:?}");
        // Line height is ascent minus descent, a bit above the pixel size.
        assert!(one.y > 20.0 && one.y < 26.0, "{one:?}");
    }

    #[test]
    fn garbage_bytes_fail_to_load() {
        let mut fonts = FontSystem::new();
        let err = fonts.load_font("broken", b"not a font").unwrap_err();
        assert!(err.to_string().contains("broken"));
        assert!(fonts.by_name("broken").is_none());
    }
}
