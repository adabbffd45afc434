/// Compositing mode for subsequent draws.
///
/// Canvas equivalents: `Normal` is `source-over`, `Additive` is `lighter`.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum BlendMode {
    #[default]
    Normal,
    Additive,
}

impl BlendMode {
    #[inline]
    pub fn from_additive(additive: bool) -> Self {
        if additive { BlendMode::Additive } else { BlendMode::Normal }
    }

    /// Name of the matching canvas `globalCompositeOperation`.
    #[inline]
    pub fn composite_operation(self) -> &'static str {
        match self {
            BlendMode::Normal => "source-over",
            BlendMode::Additive => "lighter",
        }
    }
}
