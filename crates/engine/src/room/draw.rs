use super::depth::DrawSlot;
use super::entity::{Entity, EntityId, EntityKind, Facing, Orientation};
use super::movement::{MotionState, MovementController};
use super::registry::EntityRegistry;
use crate::content::{WallOrientation, WallSegment};
use crate::spatial::{GridPos, Vec2};

/// Wall strip height the poster is centred on.
pub const WALL_HEIGHT_PX: f32 = 130.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharacterPose {
    Idle,
    Sit,
    Walk(u8),
}

impl CharacterPose {
    fn key(self) -> String {
        match self {
            CharacterPose::Idle => "idle".to_string(),
            CharacterPose::Sit => "sit".to_string(),
            CharacterPose::Walk(frame) => format!("walk{frame}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpriteRef {
    Character {
        pose: CharacterPose,
        facing: Facing,
    },
    Furniture {
        name: String,
        orientation: Orientation,
    },
    SeatForeground {
        name: String,
        orientation: Orientation,
    },
    Rug {
        name: String,
    },
    Poster {
        name: String,
        flipped: bool,
    },
}

impl SpriteRef {
    /// Asset key for the renderer's sprite cache, plus whether to mirror it.
    pub fn key(&self) -> (String, bool) {
        match self {
            SpriteRef::Character { pose, facing } => {
                let (column, mirrored) = facing.sprite_column();
                (format!("character/{}/{column}", pose.key()), mirrored)
            }
            SpriteRef::Furniture { name, orientation } => {
                (format!("furniture/{name}/{}", orientation_key(*orientation)), false)
            }
            SpriteRef::SeatForeground { name, orientation } => (
                format!("furniture/{name}/{}_foreground", orientation_key(*orientation)),
                false,
            ),
            SpriteRef::Rug { name } => (format!("rugs/{name}"), false),
            SpriteRef::Poster { name, flipped } => (format!("posters/{name}"), *flipped),
        }
    }
}

fn orientation_key(orientation: Orientation) -> &'static str {
    match orientation {
        Orientation::NorthEast => "ne",
        Orientation::SouthWest => "sw",
        Orientation::NorthWest => "nw",
        Orientation::SouthEast => "se",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawEntry {
    Entity {
        id: EntityId,
        /// Top-left corner of the sprite in viewport pixels.
        anchor: Vec2,
        sprite: SpriteRef,
        translucent: bool,
    },
    SeatForeground {
        host: EntityId,
        anchor: Vec2,
        sprite: SpriteRef,
    },
    /// Doorway overlay drawn over whoever stands on the exit cell.
    ExitForeground {
        /// Overlay outline in viewport pixels.
        clip: Vec<Vec2>,
    },
}

/// Fixed inputs for turning sorted slots into positioned sprites.
#[derive(Debug, Clone, Copy)]
pub struct DrawContext<'a> {
    pub movement: &'a MovementController,
    pub walls: &'a [WallSegment],
    /// Room foreground polygon, relative to the background.
    pub foreground_clip: &'a [Vec2],
    pub background_offset: Vec2,
    pub character_lift: f32,
}

impl DrawContext<'_> {
    fn tile_origin(&self, cell: GridPos) -> Vec2 {
        self.movement.transform().tile_origin(cell)
    }

    fn character_anchor(&self, entity: &Entity) -> Option<Vec2> {
        let top = self.movement.rendered_position(entity)?;
        let half_width = self.movement.transform().half_width();
        Some(top - Vec2::new(half_width, self.character_lift))
    }

    fn furniture_anchor(&self, cell: GridPos, rotated: bool, sprite_height: u32) -> Vec2 {
        let cell = if rotated { cell.offset(0, 1) } else { cell };
        self.tile_origin(cell) - Vec2::new(0.0, sprite_height as f32 / 2.0)
    }

    fn poster_anchor(&self, wall: usize, offset: i32, sprite_height: u32) -> Option<(Vec2, bool)> {
        let segment = self.walls.get(wall)?;
        let left = segment.orientation == WallOrientation::Left;
        let along = offset as f32;
        let rise = if left { -along / 2.0 } else { along / 2.0 };
        let anchor = Vec2::new(
            segment.offset_x + self.background_offset.x + along,
            segment.offset_y + (WALL_HEIGHT_PX / 2.0 - sprite_height as f32 / 2.0)
                + self.background_offset.y
                + rise,
        );
        Some((anchor, !left))
    }

    fn entity_entry(&self, entity: &Entity) -> Option<DrawEntry> {
        let (anchor, sprite) = match &entity.kind {
            EntityKind::Character(character) => {
                let pose = match &character.motion {
                    MotionState::Idle => CharacterPose::Idle,
                    MotionState::Sitting { .. } => CharacterPose::Sit,
                    MotionState::Walking(walk) => CharacterPose::Walk(walk.frame),
                };
                (
                    self.character_anchor(entity)?,
                    SpriteRef::Character {
                        pose,
                        facing: character.facing,
                    },
                )
            }
            EntityKind::Furniture(furniture) => {
                let orientation = furniture.orientation();
                (
                    self.furniture_anchor(
                        entity.position?,
                        orientation.is_rotated(),
                        furniture.sprite_height,
                    ),
                    SpriteRef::Furniture {
                        name: furniture.name.clone(),
                        orientation,
                    },
                )
            }
            EntityKind::Rug(rug) => (
                self.tile_origin(entity.position?.offset(-1, 1)),
                SpriteRef::Rug {
                    name: rug.name.clone(),
                },
            ),
            EntityKind::Poster(poster) => {
                let (anchor, flipped) =
                    self.poster_anchor(poster.wall, poster.offset, poster.sprite_height)?;
                (
                    anchor,
                    SpriteRef::Poster {
                        name: poster.name.clone(),
                        flipped,
                    },
                )
            }
        };
        Some(DrawEntry::Entity {
            id: entity.id,
            anchor,
            sprite,
            translucent: entity.edit,
        })
    }

    fn seat_foreground_entry(&self, host: &Entity) -> Option<DrawEntry> {
        let furniture = host.as_furniture()?;
        let orientation = furniture.orientation();
        Some(DrawEntry::SeatForeground {
            host: host.id,
            anchor: self.furniture_anchor(
                host.position?,
                orientation.is_rotated(),
                furniture.sprite_height,
            ),
            sprite: SpriteRef::SeatForeground {
                name: furniture.name.clone(),
                orientation,
            },
        })
    }

    fn exit_foreground_entry(&self) -> DrawEntry {
        DrawEntry::ExitForeground {
            clip: self
                .foreground_clip
                .iter()
                .map(|point| *point + self.background_offset)
                .collect(),
        }
    }

    pub fn build(&self, registry: &EntityRegistry, slots: &[DrawSlot]) -> Vec<DrawEntry> {
        slots
            .iter()
            .filter_map(|slot| match slot {
                DrawSlot::Entity(id) => self.entity_entry(registry.get(*id)?),
                DrawSlot::SeatForeground { host } => {
                    self.seat_foreground_entry(registry.get(*host)?)
                }
                DrawSlot::ExitForeground => Some(self.exit_foreground_entry()),
            })
            .collect()
    }
}
