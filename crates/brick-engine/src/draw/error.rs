use std::fmt;

/// Failure reported by a draw backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The accelerated backend cannot render anymore (device lost, pipeline
    /// creation failed). Callers switch to the immediate backend.
    BackendUnavailable(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::BackendUnavailable(reason) => {
                write!(f, "accelerated renderer unavailable: {reason}")
            }
        }
    }
}

impl std::error::Error for RenderError {}
