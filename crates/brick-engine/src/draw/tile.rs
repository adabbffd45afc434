//! Tile sheets and tile-index → texture-region mapping.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};

use anyhow::Context;
use image::RgbaImage;

use crate::coords::{Rect, Vec2};

/// Handle to a tile sheet registered in [`TileSheets`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct SheetId(pub(crate) u32);

impl SheetId {
    /// The sheet passed to the engine at startup.
    pub const MAIN: SheetId = SheetId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A tile sheet image: a uniform grid of cells, row-major from index 0.
///
/// `image` is `None` until loading finishes (or forever if it failed).
#[derive(Debug, Default)]
pub struct TileSheet {
    image: Option<RgbaImage>,
    /// Bumped on every successful load so GPU copies can be refreshed.
    generation: u64,
}

impl TileSheet {
    #[inline]
    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.image.is_some()
    }

    /// Sheet size in pixels, or zero while unloaded.
    #[inline]
    pub fn size(&self) -> Vec2 {
        self.image
            .as_ref()
            .map_or(Vec2::ZERO, |img| Vec2::new(img.width() as f32, img.height() as f32))
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Texture region of one tile, in both normalized and pixel units.
///
/// `uv` and `src` describe the same bleed-inset area, so the batch backend
/// (which samples by UV) and the canvas backend (which copies a pixel
/// sub-rectangle) read identical texels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TileRegion {
    pub sheet: SheetId,
    pub uv: Rect,
    pub src: Rect,
}

/// Computes the texture region for `tile_index` on a sheet of `sheet_size` pixels.
///
/// Returns `None` (draw untextured) when the index is negative, the sheet is
/// empty, the tile is wider than the sheet, or the index lies past the last cell.
pub fn tile_region(
    sheet: SheetId,
    sheet_size: Vec2,
    tile_index: i32,
    tile_size: Vec2,
    bleed_px: f32,
) -> Option<TileRegion> {
    if tile_index < 0 || sheet_size.x <= 0.0 || sheet_size.y <= 0.0 {
        return None;
    }
    if !(tile_size.x > 0.0 && tile_size.y > 0.0) {
        return None;
    }

    // Casts saturate, so tiny cells give huge counts; avoid `cols * rows`.
    let cols = (sheet_size.x / tile_size.x).floor() as i64;
    let rows = (sheet_size.y / tile_size.y).floor() as i64;
    let index = i64::from(tile_index);
    if cols <= 0 || rows <= 0 || index / cols >= rows {
        return None;
    }

    let cell = Vec2::new((index % cols) as f32, (index / cols) as f32);

    let uv_size = tile_size.divide(sheet_size);
    let uv_min = cell.multiply(uv_size);
    let bleed_uv = Vec2::splat(bleed_px).divide(sheet_size);

    let src_min = cell.multiply(tile_size);

    Some(TileRegion {
        sheet,
        uv: Rect::from_min_max(uv_min, uv_min + uv_size).inset(bleed_uv),
        src: Rect::from_min_max(src_min, src_min + tile_size).inset(Vec2::splat(bleed_px)),
    })
}

enum LoadResult {
    Loaded(SheetId, RgbaImage),
    Failed(SheetId, anyhow::Error),
}

/// Registry of tile sheets.
///
/// Sheets load on a background thread; [`poll`](Self::poll) moves finished
/// images in. Until then a sheet reports zero size and textured draws that
/// reference it degrade to untextured.
pub struct TileSheets {
    sheets: Vec<TileSheet>,
    tx: mpsc::Sender<LoadResult>,
    rx: Receiver<LoadResult>,
    pending: usize,
}

impl Default for TileSheets {
    fn default() -> Self {
        Self::new()
    }
}

impl TileSheets {
    /// Creates a registry holding only the (unloaded) main sheet.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            sheets: vec![TileSheet::default()],
            tx,
            rx,
            pending: 0,
        }
    }

    /// Registers a new, empty sheet.
    pub fn create(&mut self) -> SheetId {
        let id = SheetId(self.sheets.len() as u32);
        self.sheets.push(TileSheet::default());
        id
    }

    #[inline]
    pub fn get(&self, id: SheetId) -> Option<&TileSheet> {
        self.sheets.get(id.index())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SheetId, &TileSheet)> {
        self.sheets
            .iter()
            .enumerate()
            .map(|(i, s)| (SheetId(i as u32), s))
    }

    /// Number of loads started but not yet collected by [`poll`](Self::poll).
    #[inline]
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Installs an already-decoded image synchronously.
    pub fn set_image(&mut self, id: SheetId, image: RgbaImage) {
        if let Some(sheet) = self.sheets.get_mut(id.index()) {
            sheet.image = Some(image);
            sheet.generation = sheet.generation.wrapping_add(1);
        } else {
            log::warn!("set_image: unknown sheet {id:?}");
        }
    }

    /// Starts decoding `path` on a background thread.
    pub fn load(&mut self, id: SheetId, path: impl AsRef<Path>) {
        let path: PathBuf = path.as_ref().to_path_buf();
        let tx = self.tx.clone();
        self.pending += 1;

        let spawned = std::thread::Builder::new()
            .name("brick-sheet-load".into())
            .spawn(move || {
                let result = image::open(&path)
                    .with_context(|| format!("failed to decode tile sheet {}", path.display()))
                    .map(|img| img.to_rgba8());
                let msg = match result {
                    Ok(img) => LoadResult::Loaded(id, img),
                    Err(e) => LoadResult::Failed(id, e),
                };
                // Receiver gone means the registry was dropped; nothing to report to.
                let _ = tx.send(msg);
            });

        if let Err(e) = spawned {
            self.pending -= 1;
            log::warn!("failed to spawn tile sheet loader: {e}");
        }
    }

    /// Collects finished loads. Returns the number of sheets that became ready.
    pub fn poll(&mut self) -> usize {
        let mut ready = 0;
        loop {
            match self.rx.try_recv() {
                Ok(LoadResult::Loaded(id, img)) => {
                    self.pending = self.pending.saturating_sub(1);
                    log::info!("tile sheet {:?} loaded ({}x{})", id, img.width(), img.height());
                    self.set_image(id, img);
                    ready += 1;
                }
                Ok(LoadResult::Failed(id, e)) => {
                    self.pending = self.pending.saturating_sub(1);
                    log::warn!("tile sheet {id:?} unavailable, drawing untextured: {e:#}");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        ready
    }

    /// Region for `tile_index` on sheet `id`, `None` if it must draw untextured.
    pub fn region(
        &self,
        id: SheetId,
        tile_index: i32,
        tile_size: Vec2,
        bleed_px: f32,
    ) -> Option<TileRegion> {
        if tile_index < 0 {
            return None;
        }
        let sheet = self.get(id)?;
        if !sheet.is_loaded() {
            return None;
        }
        tile_region(id, sheet.size(), tile_index, tile_size, bleed_px)
    }
}
