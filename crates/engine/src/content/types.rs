use serde::{Deserialize, Serialize};

use crate::room::Orientation;
use crate::spatial::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WallOrientation {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WallSegment {
    pub orientation: WallOrientation,
    pub offset_x: f32,
    pub offset_y: f32,
    pub width: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomExit {
    pub x: i32,
    pub y: i32,
    /// `[segment index, tile index within the segment]` of the doorway cut.
    pub wall: [usize; 2],
    #[serde(default)]
    pub clip: Vec<Vec2>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BackgroundSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDefinition {
    pub map: Vec<Vec<u8>>,
    #[serde(default)]
    pub walls: Vec<WallSegment>,
    pub exit: RoomExit,
    /// Doorway overlay polygon drawn over entities on the exit cell.
    #[serde(default)]
    pub foreground: Vec<Vec2>,
    #[serde(default)]
    pub offset_x: f32,
    #[serde(default)]
    pub offset_y: f32,
    #[serde(default)]
    pub background: BackgroundSize,
}

impl RoomDefinition {
    pub fn width(&self) -> usize {
        self.map.first().map(Vec::len).unwrap_or(0)
    }

    pub fn height(&self) -> usize {
        self.map.len()
    }
}

fn default_orientations() -> Vec<Orientation> {
    vec![
        Orientation::NorthEast,
        Orientation::SouthWest,
        Orientation::NorthWest,
        Orientation::SouthEast,
    ]
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FurnitureDefinition {
    #[serde(default)]
    pub title: String,
    #[serde(default = "one")]
    pub tile_width: u32,
    #[serde(default = "one")]
    pub tile_height: u32,
    /// Sprite size in pixels, used to lift the sprite above its anchor tile.
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default = "default_orientations")]
    pub orientations: Vec<Orientation>,
    #[serde(default)]
    pub sit: bool,
    /// Seats with a back draw a foreground sprite over their sitters.
    #[serde(default)]
    pub foreground: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RugDefinition {
    #[serde(default)]
    pub title: String,
    #[serde(default = "one")]
    pub tile_width: u32,
    #[serde(default = "one")]
    pub tile_height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosterDefinition {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub height: u32,
}
