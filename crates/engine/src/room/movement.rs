use tracing::debug;

use super::entity::{Entity, EntityId, Facing};
use super::registry::EntityRegistry;
use crate::config::CoreConfig;
use crate::spatial::{GridPos, IsoTransform, Layer, Vec2};

pub const WALK_FRAME_COUNT: u8 = 4;

#[derive(Debug, Clone, PartialEq)]
pub enum MotionState {
    Idle,
    Walking(WalkState),
    Sitting { seat: EntityId },
}

/// Screen-space interpolation towards `destination`. Positions are tile anchors
/// (`IsoTransform::grid_to_screen`), not sprite corners.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkState {
    pub origin: GridPos,
    pub destination: GridPos,
    pub position: Vec2,
    pub target: Vec2,
    pub direction: Vec2,
    /// Pixels per tick.
    pub speed: f32,
    pub started_tick: u64,
    pub deadline_tick: u64,
    pub frame: u8,
    pub frame_ticks: u32,
    pub ticks_per_frame: u32,
}

impl WalkState {
    /// Rendered position relative to the destination anchor.
    pub fn offset(&self) -> Vec2 {
        self.position - self.target
    }

    fn step(&mut self) -> bool {
        self.frame_ticks += 1;
        if self.frame_ticks >= self.ticks_per_frame {
            self.frame_ticks = 0;
            self.frame = (self.frame + 1) % WALK_FRAME_COUNT;
        }

        let mut next = self.position + self.direction * self.speed;
        if overshoots(self.direction.x, next.x, self.target.x) {
            next.x = self.target.x;
        }
        if overshoots(self.direction.y, next.y, self.target.y) {
            next.y = self.target.y;
        }
        self.position = next;

        (self.target - self.position).length().floor() == 0.0
    }
}

fn overshoots(direction: f32, next: f32, target: f32) -> bool {
    (direction > 0.0 && next > target) || (direction < 0.0 && next < target)
}

/// Drives walk interpolation and seat attachment for every character. The
/// controller is stateless apart from timing parameters; per-character state
/// lives in `MotionState` on the entity.
#[derive(Debug, Clone)]
pub struct MovementController {
    transform: IsoTransform,
    orthogonal_ticks: u32,
    diagonal_ticks: u32,
}

impl MovementController {
    pub fn new(transform: IsoTransform, config: &CoreConfig) -> Self {
        Self {
            transform,
            orthogonal_ticks: config.walk_ticks(false),
            diagonal_ticks: config.walk_ticks(true),
        }
    }

    pub fn transform(&self) -> &IsoTransform {
        &self.transform
    }

    /// Anchor the character is currently drawn at.
    pub fn rendered_position(&self, entity: &Entity) -> Option<Vec2> {
        match entity.as_character().map(|character| &character.motion) {
            Some(MotionState::Walking(walk)) => Some(walk.position),
            _ => entity
                .position
                .map(|cell| self.transform.grid_to_screen(cell)),
        }
    }

    /// Starts a walk to `destination`. The logical cell (and grid occupancy) moves
    /// immediately; the drawn position catches up over the walk duration. Never
    /// refuses a known character: the server is authoritative.
    pub fn command_walk(
        &self,
        registry: &mut EntityRegistry,
        id: EntityId,
        destination: GridPos,
        now: u64,
    ) -> bool {
        let Some(entity) = registry.get(id) else {
            return false;
        };
        let Some(character) = entity.as_character() else {
            return false;
        };
        let start = self.rendered_position(entity);
        let seat = match character.motion {
            MotionState::Sitting { seat } => Some(seat),
            _ => None,
        };
        let Some((from, start)) = entity.position.zip(start) else {
            registry.set_position(id, Some(destination));
            registry.set_motion(id, MotionState::Idle);
            return true;
        };

        if let Some(seat) = seat {
            registry.detach_sitter(seat, id);
            registry.set_motion(id, MotionState::Idle);
        }

        let (dx, dy) = (destination.x - from.x, destination.y - from.y);
        let facing = Facing::from_step(dx, dy);
        if let Some(character) = registry.get_mut(id).and_then(Entity::as_character_mut) {
            character.facing = facing;
        }

        let target = self.transform.grid_to_screen(destination);
        let travel = target - start;
        let distance = travel.length();
        registry.set_position(id, Some(destination));
        if distance < 1.0 {
            registry.set_motion(id, MotionState::Idle);
            return true;
        }

        let total_ticks = if dx != 0 && dy != 0 {
            self.diagonal_ticks
        } else {
            self.orthogonal_ticks
        };
        let walk = WalkState {
            origin: from,
            destination,
            position: start,
            target,
            direction: travel * (1.0 / distance),
            speed: distance / total_ticks as f32,
            started_tick: now,
            deadline_tick: now + u64::from(total_ticks) + 1,
            frame: 0,
            frame_ticks: 0,
            ticks_per_frame: total_ticks.div_ceil(u32::from(WALK_FRAME_COUNT)).max(1),
        };
        registry.set_motion(id, MotionState::Walking(walk));
        true
    }

    /// Seats the character on the sittable furniture covering `cell`.
    pub fn command_sit(&self, registry: &mut EntityRegistry, id: EntityId, cell: GridPos) -> bool {
        let Some(seat) = registry.entity_at_layer(cell, Layer::Solid) else {
            debug!(entity = id.0, x = cell.x, y = cell.y, "sit_without_seat");
            return false;
        };
        let facing = match registry.get(seat).and_then(Entity::as_furniture) {
            Some(furniture) if furniture.sittable => furniture.orientation().sitter_facing(),
            _ => {
                debug!(entity = id.0, x = cell.x, y = cell.y, "sit_without_seat");
                return false;
            }
        };
        let previous = match registry.get(id).and_then(Entity::as_character) {
            Some(character) => match character.motion {
                MotionState::Sitting { seat } => Some(seat),
                _ => None,
            },
            None => return false,
        };
        if let Some(previous) = previous {
            registry.detach_sitter(previous, id);
        }

        registry.set_motion(id, MotionState::Sitting { seat });
        registry.set_position(id, Some(cell));
        registry.attach_sitter(seat, id);
        if let Some(character) = registry.get_mut(id).and_then(Entity::as_character_mut) {
            character.facing = facing;
        }
        true
    }

    /// Advances every walking character by one tick.
    pub fn advance(&self, registry: &mut EntityRegistry, now: u64) {
        let walkers = registry
            .iter()
            .filter(|entity| {
                matches!(
                    entity.as_character().map(|character| &character.motion),
                    Some(MotionState::Walking(_))
                )
            })
            .map(|entity| entity.id)
            .collect::<Vec<_>>();

        for id in walkers {
            let arrived = match registry
                .get_mut(id)
                .and_then(Entity::as_character_mut)
                .map(|character| &mut character.motion)
            {
                Some(MotionState::Walking(walk)) => walk.step() || now >= walk.deadline_tick,
                _ => false,
            };
            if arrived {
                // Re-settles occupancy at the destination in case the cell was
                // vacated by someone else while this walk was in flight.
                registry.set_motion(id, MotionState::Idle);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::FurnitureDefinition;
    use crate::room::{Appearance, Character, CharacterId, EntityKind, FurnitureObject, Orientation};
    use crate::spatial::OccupancyGrid;

    fn controller() -> MovementController {
        let config = CoreConfig::default();
        MovementController::new(IsoTransform::new(70, 36, Vec2::new(300.0, 40.0)), &config)
    }

    fn spawn_character(registry: &mut EntityRegistry, cell: GridPos) -> EntityId {
        registry.spawn(
            Some(cell),
            EntityKind::Character(Character::new(CharacterId(1), "walker", Appearance::default())),
        )
    }

    fn spawn_seat(
        registry: &mut EntityRegistry,
        cell: GridPos,
        orientation: Orientation,
    ) -> EntityId {
        registry.spawn(
            Some(cell),
            EntityKind::Furniture(FurnitureObject::from_definition(
                "chair",
                &FurnitureDefinition {
                    title: String::new(),
                    tile_width: 1,
                    tile_height: 1,
                    width: 40,
                    height: 60,
                    orientations: vec![orientation],
                    sit: true,
                    foreground: false,
                },
                0,
            )),
        )
    }

    fn motion(registry: &EntityRegistry, id: EntityId) -> MotionState {
        registry
            .get(id)
            .and_then(Entity::as_character)
            .map(|character| character.motion.clone())
            .expect("character")
    }

    #[test]
    fn orthogonal_walk_arrives_at_destination() {
        let controller = controller();
        let mut registry = EntityRegistry::new(OccupancyGrid::new(8, 8));
        let id = spawn_character(&mut registry, GridPos::new(2, 2));

        assert!(controller.command_walk(&mut registry, id, GridPos::new(2, 5), 0));
        assert_eq!(registry.entity_at(GridPos::new(2, 2)), None);
        assert_eq!(registry.entity_at(GridPos::new(2, 5)), Some(id));
        match motion(&registry, id) {
            MotionState::Walking(walk) => {
                assert_eq!(walk.ticks_per_frame, 4);
                assert_eq!(walk.deadline_tick, 17);
            }
            other => panic!("expected walking, got {other:?}"),
        }

        for tick in 1..=20 {
            controller.advance(&mut registry, tick);
        }

        let entity = registry.get(id).expect("entity");
        assert_eq!(entity.position, Some(GridPos::new(2, 5)));
        assert_eq!(motion(&registry, id), MotionState::Idle);
        assert_eq!(
            controller.rendered_position(entity),
            Some(controller.transform().grid_to_screen(GridPos::new(2, 5)))
        );
        assert_eq!(registry.entity_at(GridPos::new(2, 2)), None);
        assert_eq!(
            registry.get(id).and_then(Entity::as_character).map(|c| c.facing),
            Some(Facing::SouthWest)
        );
    }

    #[test]
    fn walk_takes_the_configured_number_of_ticks() {
        let controller = controller();
        let mut registry = EntityRegistry::new(OccupancyGrid::new(8, 8));
        let id = spawn_character(&mut registry, GridPos::new(2, 2));
        controller.command_walk(&mut registry, id, GridPos::new(3, 3), 0);

        for tick in 1..23 {
            controller.advance(&mut registry, tick);
            assert!(
                matches!(motion(&registry, id), MotionState::Walking(_)),
                "arrived early at tick {tick}"
            );
        }
        controller.advance(&mut registry, 23);
        assert_eq!(motion(&registry, id), MotionState::Idle);
    }

    #[test]
    fn walk_frames_cycle_through_four_sprites() {
        let controller = controller();
        let mut registry = EntityRegistry::new(OccupancyGrid::new(8, 8));
        let id = spawn_character(&mut registry, GridPos::new(1, 1));
        controller.command_walk(&mut registry, id, GridPos::new(1, 2), 0);

        let mut frames = Vec::new();
        for tick in 1..=12 {
            controller.advance(&mut registry, tick);
            if let MotionState::Walking(walk) = motion(&registry, id) {
                frames.push(walk.frame);
            }
        }
        assert_eq!(frames, vec![0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3]);
    }

    #[test]
    fn new_walk_restarts_from_rendered_position() {
        let controller = controller();
        let mut registry = EntityRegistry::new(OccupancyGrid::new(8, 8));
        let id = spawn_character(&mut registry, GridPos::new(2, 2));
        controller.command_walk(&mut registry, id, GridPos::new(2, 3), 0);
        for tick in 1..=5 {
            controller.advance(&mut registry, tick);
        }
        let midway = controller
            .rendered_position(registry.get(id).expect("entity"))
            .expect("rendered");

        controller.command_walk(&mut registry, id, GridPos::new(3, 3), 5);
        match motion(&registry, id) {
            MotionState::Walking(walk) => {
                assert_eq!(walk.position, midway);
                assert_eq!(walk.origin, GridPos::new(2, 3));
                assert_eq!(walk.frame, 0);
            }
            other => panic!("expected walking, got {other:?}"),
        }
        assert_eq!(registry.entity_at(GridPos::new(2, 3)), None);
        assert_eq!(registry.entity_at(GridPos::new(3, 3)), Some(id));
    }

    #[test]
    fn sitting_attaches_to_seat_and_leaves_the_grid() {
        let controller = controller();
        let mut registry = EntityRegistry::new(OccupancyGrid::new(6, 6));
        let seat = spawn_seat(&mut registry, GridPos::new(3, 3), Orientation::SouthEast);
        let id = spawn_character(&mut registry, GridPos::new(1, 1));

        assert!(controller.command_sit(&mut registry, id, GridPos::new(3, 3)));
        assert_eq!(motion(&registry, id), MotionState::Sitting { seat });
        assert_eq!(registry.entity_at(GridPos::new(1, 1)), None);
        assert_eq!(registry.entity_at(GridPos::new(3, 3)), Some(seat));
        let character = registry.get(id).and_then(Entity::as_character).expect("character");
        assert_eq!(character.facing, Facing::SouthEast);
        let furniture = registry.get(seat).and_then(Entity::as_furniture).expect("seat");
        assert!(furniture.sitters.contains(&id));
    }

    #[test]
    fn walking_off_a_seat_detaches_the_sitter() {
        let controller = controller();
        let mut registry = EntityRegistry::new(OccupancyGrid::new(6, 6));
        let seat = spawn_seat(&mut registry, GridPos::new(3, 3), Orientation::NorthEast);
        let id = spawn_character(&mut registry, GridPos::new(1, 1));
        controller.command_sit(&mut registry, id, GridPos::new(3, 3));

        assert!(controller.command_walk(&mut registry, id, GridPos::new(3, 4), 10));
        let furniture = registry.get(seat).and_then(Entity::as_furniture).expect("seat");
        assert!(furniture.sitters.is_empty());
        assert!(matches!(motion(&registry, id), MotionState::Walking(_)));
        assert_eq!(registry.entity_at(GridPos::new(3, 4)), Some(id));
    }

    #[test]
    fn sit_without_a_seat_is_ignored() {
        let controller = controller();
        let mut registry = EntityRegistry::new(OccupancyGrid::new(4, 4));
        let id = spawn_character(&mut registry, GridPos::new(1, 1));
        assert!(!controller.command_sit(&mut registry, id, GridPos::new(2, 2)));
        assert_eq!(motion(&registry, id), MotionState::Idle);
        assert_eq!(registry.entity_at(GridPos::new(1, 1)), Some(id));
    }

    #[test]
    fn walk_into_an_occupied_cell_is_tolerated() {
        let controller = controller();
        let mut registry = EntityRegistry::new(OccupancyGrid::new(4, 4));
        let first = spawn_character(&mut registry, GridPos::new(1, 1));
        let second = registry.spawn(
            Some(GridPos::new(2, 1)),
            EntityKind::Character(Character::new(CharacterId(2), "other", Appearance::default())),
        );
        assert!(controller.command_walk(&mut registry, first, GridPos::new(2, 1), 0));
        assert_eq!(registry.entity_at(GridPos::new(2, 1)), Some(second));

        registry.despawn(second);
        for tick in 1..=20 {
            controller.advance(&mut registry, tick);
        }
        assert_eq!(registry.entity_at(GridPos::new(2, 1)), Some(first));
    }
}
