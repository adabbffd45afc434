//! Hybrid draw layer.
//!
//! World-space primitives (`draw_tile`, `draw_rect`, `draw_line`,
//! `draw_text`) are converted to raster-space quads and handed to one of two
//! backends:
//! - `BatchRenderer`: accumulates vertices for the GPU, one batch per
//!   texture/blend run
//! - `ImmediateRenderer`: rasterizes each quad into a software canvas
//!
//! Text always goes to the overlay canvas.

mod backend;
mod batch;
mod canvas;
mod error;
mod immediate;
mod layer;
mod params;
mod tile;
mod view;

pub use backend::{BackendKind, BackendStats, DrawBackend, QuadDraw};
pub use batch::{Batch, BatchFrame, BatchRenderer, BatchVertex};
pub use canvas::Canvas2d;
pub use error::RenderError;
pub use immediate::ImmediateRenderer;
pub use layer::{line_rect, DrawLayer, DrawLayerConfig, FrameStats, Painter};
pub use params::{TextAlign, TextDraw, TileDraw};
pub use tile::{tile_region, SheetId, TileRegion, TileSheet, TileSheets};
pub use view::{Camera, View};
