//! GPU rendering subsystem.
//!
//! Renderers consume CPU-side frame output from `draw` and issue GPU commands
//! via wgpu. Each renderer is responsible for its own GPU resources
//! (pipelines, buffers, textures), created lazily on first use.
//!
//! Convention:
//! - CPU geometry is in canvas raster pixels (top-left origin, +Y down).
//! - Vertex shaders convert to NDC using a viewport uniform.
//! - Passes draw into the canvas placement rect (`RenderCtx::present`).

mod batch;
mod canvas;
mod common;
mod ctx;

pub use batch::GpuBatchRenderer;
pub use canvas::CanvasCompositor;
pub use ctx::{fit_canvas, RenderCtx, RenderTarget};
