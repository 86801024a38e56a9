#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Flat-block renderer for gridvault observations.
//!
//! [`BlockRenderer`] paints a [`Scene`] into the `64x64` RGB surface the
//! lifecycle publishes through the `rgb` channel: one solid block per
//! terrain cell, one solid rectangle per sprite. Keys, doors, and ring
//! icons take their color from the theme palette so matching pairs read
//! as matching on screen.

use gridvault_core::{
    scene::{RenderBackend, RenderError, Scene, SceneSprite, Surface, RENDER_HEIGHT, RENDER_WIDTH},
    ObjectKind, Theme, MAX_THEMES,
};

const SPACE_COLOR: [u8; 3] = [233, 233, 225];
const WALL_COLOR: [u8; 3] = [59, 59, 64];
const DOOR_CELL_COLOR: [u8; 3] = [121, 85, 46];
const PLAYER_COLOR: [u8; 3] = [64, 104, 222];
const EXIT_COLOR: [u8; 3] = [46, 178, 92];
const WATER_COLOR: [u8; 3] = [72, 132, 202];
const FIRE_COLOR: [u8; 3] = [228, 108, 42];

/// One entry per theme; keys, doors, and ring icons share it.
const THEME_COLORS: [[u8; 3]; MAX_THEMES] = [[204, 62, 62], [62, 172, 62], [76, 92, 204]];

/// Paints scenes as flat color blocks.
#[derive(Clone, Copy, Debug, Default)]
pub struct BlockRenderer;

impl BlockRenderer {
    /// Creates the renderer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl RenderBackend for BlockRenderer {
    fn render(&mut self, scene: &Scene, surface: &mut Surface) -> Result<(), RenderError> {
        let width = surface.width();
        let height = surface.height();
        if !surface_supported(width, height) {
            return Err(RenderError::UnsupportedSurface { width, height });
        }

        paint_terrain(scene, surface);
        for sprite in &scene.sprites {
            paint_sprite(sprite, scene.grid_dim, surface);
        }
        Ok(())
    }
}

fn surface_supported(width: usize, height: usize) -> bool {
    width == RENDER_WIDTH && height == RENDER_HEIGHT
}

/// Every pixel maps to exactly one cell, so scaling leaves no seams.
fn paint_terrain(scene: &Scene, surface: &mut Surface) {
    let dim = scene.grid_dim as usize;
    let width = surface.width();
    let height = surface.height();
    for py in 0..height {
        let cy = py * dim / height;
        for px in 0..width {
            let cx = px * dim / width;
            let color = cell_color(scene.cells[cy * dim + cx]);
            surface.set_pixel(px, py, color);
        }
    }
}

fn paint_sprite(sprite: &SceneSprite, grid_dim: u32, surface: &mut Surface) {
    // Screen-anchored sprites use unit screen fractions; everything else
    // is in grid units.
    let (scale_x, scale_y) = if sprite.screen_anchored {
        (surface.width() as f32, surface.height() as f32)
    } else {
        (
            surface.width() as f32 / grid_dim as f32,
            surface.height() as f32 / grid_dim as f32,
        )
    };

    let x0 = ((sprite.x - sprite.rx) * scale_x).floor() as i32;
    let x1 = ((sprite.x + sprite.rx) * scale_x).ceil() as i32;
    let y0 = ((sprite.y - sprite.ry) * scale_y).floor() as i32;
    let y1 = ((sprite.y + sprite.ry) * scale_y).ceil() as i32;

    let color = sprite_color(sprite);
    for py in y0.max(0)..y1 {
        for px in x0.max(0)..x1 {
            surface.set_pixel(px as usize, py as usize, color);
        }
    }
}

fn cell_color(kind: ObjectKind) -> [u8; 3] {
    match kind {
        ObjectKind::Wall => WALL_COLOR,
        ObjectKind::LockedDoor => DOOR_CELL_COLOR,
        _ => SPACE_COLOR,
    }
}

fn sprite_color(sprite: &SceneSprite) -> [u8; 3] {
    match sprite.kind {
        ObjectKind::Key | ObjectKind::LockedDoor | ObjectKind::RingIcon => {
            theme_color(sprite.theme)
        }
        ObjectKind::Player => PLAYER_COLOR,
        ObjectKind::Exit => EXIT_COLOR,
        ObjectKind::Water => WATER_COLOR,
        ObjectKind::Fire => FIRE_COLOR,
        ObjectKind::Space => SPACE_COLOR,
        ObjectKind::Wall => WALL_COLOR,
    }
}

fn theme_color(theme: Theme) -> [u8; 3] {
    THEME_COLORS[theme.index() % MAX_THEMES]
}
