//! Breakout rules: a paddle, one ball, a wall of blocks.
//!
//! Velocities are in world units per fixed update.

use brick_engine::coords::{Rect, Vec2};
use brick_engine::core::{EngineCtx, Game};
use brick_engine::draw::{Painter, TextDraw, TileDraw};
use brick_engine::input::{Key, MouseButton};
use brick_engine::paint::Color;

pub const LEVEL_SIZE: Vec2 = Vec2::new(72.0, 40.0);

const BLOCK_SIZE: Vec2 = Vec2::new(4.0, 2.0);
const PADDLE_SIZE: Vec2 = Vec2::new(6.0, 0.5);
const BALL_SIZE: f32 = 0.5;
const BALL_MAX_SPEED: f32 = 0.5;
const BALL_SPEEDUP: f32 = 1.04;

const TILE_BLOCK: i32 = 0;
const TILE_BALL: i32 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub pos: Vec2,
    pub color: Color,
}

impl Block {
    fn bounds(&self) -> Rect {
        Rect::from_center_size(self.pos, BLOCK_SIZE)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ball {
    pub pos: Vec2,
    pub vel: Vec2,
}

impl Ball {
    fn bounds(&self) -> Rect {
        Rect::from_center_size(self.pos, Vec2::splat(BALL_SIZE))
    }
}

/// Game state without any engine dependency besides math types.
#[derive(Debug, Clone)]
pub struct Level {
    pub paddle: Vec2,
    pub ball: Option<Ball>,
    pub blocks: Vec<Block>,
    pub score: u32,
}

impl Default for Level {
    fn default() -> Self {
        Self::new()
    }
}

impl Level {
    pub fn new() -> Self {
        let mut blocks = Vec::new();
        let mut x = 6.0;
        while x <= LEVEL_SIZE.x - 6.0 {
            let mut y = LEVEL_SIZE.y / 2.0;
            while y <= LEVEL_SIZE.y - 4.0 {
                let hue = x / LEVEL_SIZE.x + y / (LEVEL_SIZE.y * 4.0);
                blocks.push(Block {
                    pos: Vec2::new(x, y),
                    color: Color::hsl(hue, 0.7, 0.55, 1.0),
                });
                y += 2.0;
            }
            x += 4.0;
        }

        Self {
            paddle: Vec2::new(LEVEL_SIZE.x / 2.0 - 12.0, 2.0),
            ball: None,
            blocks,
            score: 0,
        }
    }

    #[inline]
    pub fn is_won(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Spawns a ball if none is in play.
    pub fn serve(&mut self) -> bool {
        if self.ball.is_some() || self.is_won() {
            return false;
        }
        self.ball = Some(Ball {
            pos: Vec2::new(LEVEL_SIZE.x / 2.0, LEVEL_SIZE.y / 2.0 - 6.0),
            vel: Vec2::new(-0.1, -0.1),
        });
        true
    }

    /// Moves the paddle toward `target_x` (clamped to the level).
    pub fn move_paddle(&mut self, target_x: f32) {
        if !target_x.is_finite() {
            return;
        }
        let half = PADDLE_SIZE.x / 2.0;
        self.paddle.x = target_x.clamp(half, LEVEL_SIZE.x - half);
    }

    /// One fixed update of the ball.
    pub fn step(&mut self) {
        let Some(mut ball) = self.ball else { return };
        ball.pos += ball.vel;

        // Side and top walls.
        let r = BALL_SIZE / 2.0;
        let hit_left = ball.pos.x - r < 0.0 && ball.vel.x < 0.0;
        let hit_right = ball.pos.x + r > LEVEL_SIZE.x && ball.vel.x > 0.0;
        if hit_left || hit_right {
            ball.vel.x = -ball.vel.x;
        }
        if ball.pos.y + r > LEVEL_SIZE.y && ball.vel.y > 0.0 {
            ball.vel.y = -ball.vel.y;
        }

        // Fell out of the bottom.
        if ball.pos.y < -1.0 {
            log::debug!("ball lost");
            self.ball = None;
            return;
        }

        let paddle = Rect::from_center_size(self.paddle, PADDLE_SIZE);
        if ball.vel.y < 0.0 && ball.bounds().intersect(paddle).is_some() {
            // English: where the ball hits the paddle sets the outgoing angle.
            let offset = (ball.pos.x - self.paddle.x) / PADDLE_SIZE.x;
            let speed = (ball.vel.length() * BALL_SPEEDUP).min(BALL_MAX_SPEED);
            ball.vel = Vec2::new(offset, 0.5).normalize(speed);
        }

        if let Some(i) = self
            .blocks
            .iter()
            .position(|b| b.bounds().intersect(ball.bounds()).is_some())
        {
            let block = self.blocks.swap_remove(i);
            bounce_off(&mut ball, block.bounds());
            self.score += 1;
        }

        self.ball = Some(ball);
    }
}

/// Reflects `ball` off `rect` along the axis of least penetration.
fn bounce_off(ball: &mut Ball, rect: Rect) {
    let Some(overlap) = ball.bounds().intersect(rect) else { return };
    let toward = rect.center() - ball.pos;
    if overlap.width() < overlap.height() {
        if toward.x * ball.vel.x > 0.0 {
            ball.vel.x = -ball.vel.x;
        }
    } else if toward.y * ball.vel.y > 0.0 {
        ball.vel.y = -ball.vel.y;
    }
}

/// Engine-facing wrapper around [`Level`].
#[derive(Debug, Default)]
pub struct Breakout {
    level: Level,
}

impl Game for Breakout {
    fn init(&mut self, ctx: &mut EngineCtx<'_>) {
        ctx.camera.pos = LEVEL_SIZE.scale(0.5);
        self.level = Level::new();
        log::info!("level ready: {} blocks", self.level.blocks.len());
    }

    fn update(&mut self, ctx: &mut EngineCtx<'_>) {
        if ctx.key_was_pressed(Key::F) {
            ctx.toggle_fullscreen();
        }
        if ctx.key_was_pressed(Key::Escape) {
            ctx.exit();
        }
        if ctx.mouse_was_pressed(MouseButton::Left) && self.level.serve() {
            log::debug!("ball served");
        }
        if let Some(mouse) = ctx.mouse_pos() {
            self.level.move_paddle(mouse.x);
        }
        self.level.step();
    }

    fn render(&mut self, ctx: &EngineCtx<'_>, painter: &mut Painter<'_>) {
        let camera = ctx.camera.pos;
        painter.draw_rect(camera, LEVEL_SIZE, Color::rgb(0.2, 0.2, 0.2), 0.0, true);

        for block in &self.level.blocks {
            painter.draw_tile(block.pos, &TileDraw::tile(BLOCK_SIZE, TILE_BLOCK).color(block.color));
        }
        painter.draw_tile(self.level.paddle, &TileDraw::tile(PADDLE_SIZE, TILE_BLOCK));
        if let Some(ball) = self.level.ball {
            painter.draw_tile(ball.pos, &TileDraw::tile(Vec2::splat(BALL_SIZE), TILE_BALL));
        }
    }

    fn render_post(&mut self, ctx: &EngineCtx<'_>, painter: &mut Painter<'_>) {
        let camera = ctx.camera.pos;
        let text = TextDraw::new(2.0).outline(0.2, Color::BLACK);

        painter.draw_text(&format!("Score: {}", self.level.score), camera + Vec2::new(0.0, 21.0), &text);
        let banner = if self.level.is_won() {
            Some("You Win!")
        } else if self.level.ball.is_none() {
            Some("Click to Play")
        } else {
            None
        };
        if let Some(banner) = banner {
            painter.draw_text(banner, camera + Vec2::new(0.0, -5.0), &text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── setup ─────────────────────────────────────────────────────────────

    #[test]
    fn level_spawns_block_grid() {
        let level = Level::new();
        // 16 columns (x = 6..=66 step 4) by 9 rows (y = 20..=36 step 2).
        assert_eq!(level.blocks.len(), 16 * 9);
        assert!(level.ball.is_none());
        assert_eq!(level.score, 0);
        assert!(!level.is_won());
    }

    #[test]
    fn serve_only_once() {
        let mut level = Level::new();
        assert!(level.serve());
        assert!(!level.serve());
    }

    // ── movement ──────────────────────────────────────────────────────────

    #[test]
    fn paddle_is_clamped_to_level() {
        let mut level = Level::new();
        level.move_paddle(-100.0);
        assert_eq!(level.paddle.x, PADDLE_SIZE.x / 2.0);
        level.move_paddle(1000.0);
        assert_eq!(level.paddle.x, LEVEL_SIZE.x - PADDLE_SIZE.x / 2.0);
        level.move_paddle(f32::NAN);
        assert_eq!(level.paddle.x, LEVEL_SIZE.x - PADDLE_SIZE.x / 2.0);
    }

    #[test]
    fn ball_bounces_off_left_wall() {
        let mut level = Level::new();
        level.blocks.clear();
        level.ball = Some(Ball { pos: Vec2::new(0.2, 10.0), vel: Vec2::new(-0.1, 0.0) });
        level.step();
        let ball = level.ball.unwrap();
        assert!(ball.vel.x > 0.0);
    }

    #[test]
    fn ball_lost_below_level() {
        let mut level = Level::new();
        level.ball = Some(Ball { pos: Vec2::new(30.0, -0.95), vel: Vec2::new(0.0, -0.1) });
        level.step();
        assert!(level.ball.is_none());
        assert!(level.serve());
    }

    #[test]
    fn paddle_sends_ball_up() {
        let mut level = Level::new();
        level.paddle = Vec2::new(30.0, 2.0);
        level.ball = Some(Ball { pos: Vec2::new(31.0, 2.6), vel: Vec2::new(0.0, -0.2) });
        level.step();
        let ball = level.ball.unwrap();
        assert!(ball.vel.y > 0.0);
        assert!(ball.vel.x > 0.0, "right half of the paddle deflects right");
        assert!(ball.vel.length() <= BALL_MAX_SPEED + 1e-6);
    }

    // ── scoring ───────────────────────────────────────────────────────────

    #[test]
    fn hitting_a_block_scores_and_removes_it() {
        let mut level = Level::new();
        let target = level.blocks[0].pos;
        let before = level.blocks.len();
        level.ball = Some(Ball {
            pos: target - Vec2::new(0.0, 1.3),
            vel: Vec2::new(0.0, 0.1),
        });
        level.step();
        assert_eq!(level.score, 1);
        assert_eq!(level.blocks.len(), before - 1);
        assert!(level.ball.unwrap().vel.y < 0.0);
    }

    #[test]
    fn clearing_all_blocks_wins() {
        let mut level = Level::new();
        level.blocks.truncate(1);
        let target = level.blocks[0].pos;
        level.ball = Some(Ball { pos: target - Vec2::new(0.0, 1.3), vel: Vec2::new(0.0, 0.1) });
        level.step();
        assert!(level.is_won());
        level.ball = None;
        assert!(!level.serve());
    }
}
