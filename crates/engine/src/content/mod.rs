mod database;
mod types;

pub use database::{Catalog, CatalogError, NameProblem};
pub use types::{
    BackgroundSize, FurnitureDefinition, PosterDefinition, RoomDefinition, RoomExit,
    RugDefinition, WallOrientation, WallSegment,
};
