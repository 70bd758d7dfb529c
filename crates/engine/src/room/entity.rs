use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::movement::MotionState;
use crate::content::{FurnitureDefinition, RugDefinition};
use crate::spatial::{Footprint, GridPos, Layer};

/// Client-local entity handle, never sent over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

/// Server-assigned character id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterId(pub u64);

/// Eight-way facing. The discriminant is the sprite sheet index; the last three
/// indices are mirrored copies of the first three columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facing {
    NorthEast = 0,
    East = 1,
    SouthEast = 2,
    South = 3,
    North = 4,
    NorthWest = 5,
    West = 6,
    SouthWest = 7,
}

impl Facing {
    /// Facing for a step of `(dx, dy)` grid cells; only the signs matter.
    pub fn from_step(dx: i32, dy: i32) -> Self {
        match (dx.signum(), dy.signum()) {
            (1, -1) => Facing::East,
            (1, 0) => Facing::SouthEast,
            (1, 1) => Facing::South,
            (-1, -1) => Facing::North,
            (-1, 0) => Facing::NorthWest,
            (-1, 1) => Facing::West,
            (0, -1) => Facing::NorthEast,
            (0, 1) => Facing::SouthWest,
            _ => Facing::South,
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    /// Source column in the five-column sheet and whether it is drawn mirrored.
    pub fn sprite_column(self) -> (u8, bool) {
        let index = self.index();
        if index >= 5 {
            (index - 5, true)
        } else {
            (index, false)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    #[serde(rename = "ne")]
    NorthEast,
    #[serde(rename = "sw")]
    SouthWest,
    #[serde(rename = "nw")]
    NorthWest,
    #[serde(rename = "se")]
    SouthEast,
}

impl Orientation {
    /// NW and SE are the quarter-turned orientations whose footprint swaps width and height.
    pub fn is_rotated(self) -> bool {
        matches!(self, Orientation::NorthWest | Orientation::SouthEast)
    }

    pub fn sitter_facing(self) -> Facing {
        match self {
            Orientation::NorthEast => Facing::NorthEast,
            Orientation::SouthWest => Facing::SouthWest,
            Orientation::NorthWest => Facing::NorthWest,
            Orientation::SouthEast => Facing::SouthEast,
        }
    }
}

/// Cosmetic descriptor carried verbatim for the renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Appearance {
    pub is_female: bool,
    pub skin_tone: u32,
    pub hair_index: i32,
    pub hair_colour: u32,
    pub shirt_index: i32,
    pub shirt_colour: u32,
    pub pants_index: i32,
    pub pants_colour: u32,
    pub shoes_index: i32,
    pub shoes_colour: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Character {
    pub character_id: CharacterId,
    pub username: String,
    pub appearance: Appearance,
    pub facing: Facing,
    pub motion: MotionState,
}

impl Character {
    pub fn new(
        character_id: CharacterId,
        username: impl Into<String>,
        appearance: Appearance,
    ) -> Self {
        Self {
            character_id,
            username: username.into(),
            appearance,
            facing: Facing::South,
            motion: MotionState::Idle,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FurnitureObject {
    pub name: String,
    pub tile_width: u32,
    pub tile_height: u32,
    pub sprite_height: u32,
    pub orientations: Vec<Orientation>,
    pub angle: usize,
    pub sittable: bool,
    pub foreground: bool,
    pub sitters: BTreeSet<EntityId>,
}

impl FurnitureObject {
    pub fn from_definition(
        name: impl Into<String>,
        def: &FurnitureDefinition,
        angle: usize,
    ) -> Self {
        let orientations = if def.orientations.is_empty() {
            vec![Orientation::NorthEast]
        } else {
            def.orientations.clone()
        };
        let angle = angle % orientations.len();
        Self {
            name: name.into(),
            tile_width: def.tile_width.max(1),
            tile_height: def.tile_height.max(1),
            sprite_height: def.height,
            orientations,
            angle,
            sittable: def.sit,
            foreground: def.foreground,
            sitters: BTreeSet::new(),
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation_at(self.angle)
    }

    pub fn orientation_at(&self, angle: usize) -> Orientation {
        self.orientations
            .get(angle)
            .copied()
            .unwrap_or(Orientation::NorthEast)
    }

    pub fn next_angle(&self) -> usize {
        (self.angle + 1) % self.orientations.len().max(1)
    }

    pub fn size_at(&self, angle: usize) -> (u32, u32) {
        if self.orientation_at(angle).is_rotated() {
            (self.tile_height, self.tile_width)
        } else {
            (self.tile_width, self.tile_height)
        }
    }

    pub fn effective_size(&self) -> (u32, u32) {
        self.size_at(self.angle)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rug {
    pub name: String,
    pub tile_width: u32,
    pub tile_height: u32,
}

impl Rug {
    pub fn from_definition(name: impl Into<String>, def: &RugDefinition) -> Self {
        Self {
            name: name.into(),
            tile_width: def.tile_width.max(1),
            tile_height: def.tile_height.max(1),
        }
    }
}

/// Posters hang on a wall segment and never enter the occupancy grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Poster {
    pub name: String,
    pub wall: usize,
    pub offset: i32,
    pub sprite_height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    Character(Character),
    Furniture(FurnitureObject),
    Rug(Rug),
    Poster(Poster),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub position: Option<GridPos>,
    /// Set while the entity is a ghost being placed; ghosts stay out of the grid.
    pub edit: bool,
    /// Created locally for placement and not yet acknowledged by the server.
    pub provisional: bool,
    pub kind: EntityKind,
}

impl Entity {
    pub fn layer(&self) -> Option<Layer> {
        match self.kind {
            EntityKind::Character(_) | EntityKind::Furniture(_) => Some(Layer::Solid),
            EntityKind::Rug(_) => Some(Layer::Floor),
            EntityKind::Poster(_) => None,
        }
    }

    pub fn footprint_at(&self, anchor: GridPos) -> Footprint {
        match &self.kind {
            EntityKind::Furniture(furniture) => {
                let (width, height) = furniture.effective_size();
                Footprint::new(anchor, width, height)
            }
            EntityKind::Rug(rug) => Footprint::new(anchor, rug.tile_width, rug.tile_height),
            EntityKind::Character(_) | EntityKind::Poster(_) => Footprint::single(anchor),
        }
    }

    pub fn footprint(&self) -> Option<Footprint> {
        self.position.map(|anchor| self.footprint_at(anchor))
    }

    /// Whether this entity stops characters from walking onto its cells.
    pub fn blocks_walking(&self) -> bool {
        match &self.kind {
            EntityKind::Character(_) => true,
            EntityKind::Furniture(furniture) => !furniture.sittable,
            EntityKind::Rug(_) | EntityKind::Poster(_) => false,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            EntityKind::Furniture(furniture) => Some(&furniture.name),
            EntityKind::Rug(rug) => Some(&rug.name),
            EntityKind::Poster(poster) => Some(&poster.name),
            EntityKind::Character(_) => None,
        }
    }

    pub fn as_character(&self) -> Option<&Character> {
        match &self.kind {
            EntityKind::Character(character) => Some(character),
            _ => None,
        }
    }

    pub fn as_character_mut(&mut self) -> Option<&mut Character> {
        match &mut self.kind {
            EntityKind::Character(character) => Some(character),
            _ => None,
        }
    }

    pub fn as_furniture(&self) -> Option<&FurnitureObject> {
        match &self.kind {
            EntityKind::Furniture(furniture) => Some(furniture),
            _ => None,
        }
    }

    pub fn as_furniture_mut(&mut self) -> Option<&mut FurnitureObject> {
        match &mut self.kind {
            EntityKind::Furniture(furniture) => Some(furniture),
            _ => None,
        }
    }

    pub fn is_placeable(&self) -> bool {
        matches!(self.kind, EntityKind::Furniture(_) | EntityKind::Rug(_))
    }
}
