use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Saturates at the `i32` range; cells that far out are never in a room.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }

    pub fn checked_offset(self, dx: i32, dy: i32) -> Option<Self> {
        Some(Self::new(self.x.checked_add(dx)?, self.y.checked_add(dy)?))
    }
}

/// Isometric projection convention:
/// - `grid_to_screen` returns the top vertex of the cell's diamond.
/// - The diamond spans one tile width horizontally and one tile height vertically below it.
/// - `screen_to_grid` floors, so every pixel belongs to exactly one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsoTransform {
    tile_width: u32,
    tile_height: u32,
    offset: Vec2,
}

impl IsoTransform {
    pub fn new(tile_width: u32, tile_height: u32, offset: Vec2) -> Self {
        Self {
            tile_width: tile_width.max(2),
            tile_height: tile_height.max(2),
            offset,
        }
    }

    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    pub fn tile_height(&self) -> u32 {
        self.tile_height
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn half_width(&self) -> f32 {
        self.tile_width as f32 / 2.0
    }

    pub fn half_height(&self) -> f32 {
        self.tile_height as f32 / 2.0
    }

    pub fn grid_to_screen(&self, cell: GridPos) -> Vec2 {
        Vec2 {
            x: (cell.x as f32 - cell.y as f32) * self.half_width() + self.offset.x,
            y: (cell.x as f32 + cell.y as f32) * self.half_height() + self.offset.y,
        }
    }

    pub fn screen_to_grid(&self, screen: Vec2) -> GridPos {
        let half_w = self.tile_width as f64 / 2.0;
        let half_h = self.tile_height as f64 / 2.0;
        let dx = screen.x as f64 - self.offset.x as f64;
        let dy = screen.y as f64 - self.offset.y as f64;
        // One division per axis keeps exact multiples exact.
        let denom = 2.0 * half_w * half_h;
        let gx = ((dx * half_h + dy * half_w) / denom).floor();
        let gy = ((dy * half_w - dx * half_h) / denom).floor();
        GridPos {
            x: saturating_cast(gx),
            y: saturating_cast(gy),
        }
    }

    /// Top-left corner of the cell's bounding rectangle, where tile-sized sprites are drawn.
    pub fn tile_origin(&self, cell: GridPos) -> Vec2 {
        self.grid_to_screen(cell) - Vec2::new(self.half_width(), 0.0)
    }
}

fn saturating_cast(value: f64) -> i32 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(i32::MIN as f64, i32::MAX as f64) as i32
}
