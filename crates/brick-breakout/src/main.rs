mod game;

use brick_engine::coords::Vec2;
use brick_engine::Engine;

use game::Breakout;

fn main() -> anyhow::Result<()> {
    Engine::new()
        .title("Breakout")
        .size(1280.0, 720.0)
        .canvas_fixed_size(Vec2::new(1280.0, 720.0))
        // 72x40 level on a 1280x720 canvas.
        .camera_scale(16.0)
        .tile_sheet(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/tiles.png"))
        .font("body", load_font())
        .run(Breakout::default())
}

/// First system font found; empty if none, in which case text is skipped.
fn load_font() -> Vec<u8> {
    [
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/noto/NotoSans-Regular.ttf",
        "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    ]
    .iter()
    .find_map(|p| std::fs::read(p).ok())
    .unwrap_or_default()
}
