//! Scene and surface contracts consumed by render backends.
//!
//! The episode lifecycle owns *when* a frame is rendered (once per step,
//! only while the `rgb` channel is connected); backends own *how*. A
//! [`Scene`] is a flat description of the visible world assembled from core
//! vocabulary only, so backends never reach into simulation state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ObjectKind, Theme};

/// Width of the rendered observation surface in pixels.
pub const RENDER_WIDTH: usize = 64;

/// Height of the rendered observation surface in pixels.
pub const RENDER_HEIGHT: usize = 64;

/// A single visible entity within a scene.
///
/// Positions and half-extents are expressed in grid cells unless
/// `screen_anchored` is set, in which case they are fractions of the surface
/// along each axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneSprite {
    /// Semantic kind of the entity, used for color selection.
    pub kind: ObjectKind,
    /// Theme tint applied to keys, doors, and ring icons.
    pub theme: Theme,
    /// Horizontal center of the sprite.
    pub x: f32,
    /// Vertical center of the sprite.
    pub y: f32,
    /// Horizontal half-extent of the sprite.
    pub rx: f32,
    /// Vertical half-extent of the sprite.
    pub ry: f32,
    /// Draw-order hint; higher values draw later.
    pub render_z: i32,
    /// Anchors the sprite to the surface instead of the grid.
    pub screen_anchored: bool,
}

/// Flat description of one rendered frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Interior dimension of the square grid.
    pub grid_dim: u32,
    /// Row-major cell kinds, `grid_dim * grid_dim` entries.
    pub cells: Vec<ObjectKind>,
    /// Visible entities ordered by `render_z`, then insertion.
    pub sprites: Vec<SceneSprite>,
}

impl Scene {
    /// Creates a scene, ordering sprites by their draw-order hint.
    ///
    /// The sort is stable so sprites sharing a `render_z` keep their
    /// insertion order.
    ///
    /// # Panics
    ///
    /// Panics unless `cells` holds exactly `grid_dim * grid_dim` entries.
    #[must_use]
    pub fn new(grid_dim: u32, cells: Vec<ObjectKind>, mut sprites: Vec<SceneSprite>) -> Self {
        assert_eq!(
            cells.len(),
            (grid_dim as usize).pow(2),
            "scene cells must cover the square grid"
        );
        sprites.sort_by_key(|sprite| sprite.render_z);
        Self {
            grid_dim,
            cells,
            sprites,
        }
    }
}

/// Fixed-size RGB8 pixel surface filled by render backends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Surface {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Surface {
    /// Creates a zeroed surface with the provided pixel dimensions.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height * 3],
        }
    }

    /// Width of the surface in pixels.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Height of the surface in pixels.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Raw row-major RGB8 bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.pixels
    }

    /// Overwrites one pixel; coordinates outside the surface are ignored.
    pub fn set_pixel(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        if x < self.width && y < self.height {
            let offset = (y * self.width + x) * 3;
            self.pixels[offset..offset + 3].copy_from_slice(&rgb);
        }
    }

    /// Fills the whole surface with one color.
    pub fn fill(&mut self, rgb: [u8; 3]) {
        for pixel in self.pixels.chunks_exact_mut(3) {
            pixel.copy_from_slice(&rgb);
        }
    }
}

/// Render backend capable of painting scenes into a surface.
pub trait RenderBackend {
    /// Paints the provided scene into the surface.
    fn render(&mut self, scene: &Scene, surface: &mut Surface) -> Result<(), RenderError>;
}

/// Errors a render backend may report for a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The backend cannot paint into a surface with these dimensions.
    #[error("unsupported surface dimensions {width}x{height}")]
    UnsupportedSurface {
        /// Width of the rejected surface.
        width: usize,
        /// Height of the rejected surface.
        height: usize,
    },
}
