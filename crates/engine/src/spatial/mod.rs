mod grid;
mod transform;

pub use grid::{Footprint, GridError, Layer, OccupancyGrid};
pub use transform::{GridPos, IsoTransform, Vec2};
