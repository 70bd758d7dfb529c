use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use super::entity::{CharacterId, Entity, EntityId, EntityIdAllocator, EntityKind};
use super::movement::MotionState;
use crate::spatial::{Footprint, GridPos, Layer, OccupancyGrid};

/// Owns every entity of a room together with the occupancy grid. Grid cells only
/// ever hold handles into `entities`, and every position change goes through here.
#[derive(Debug)]
pub struct EntityRegistry {
    allocator: EntityIdAllocator,
    entities: BTreeMap<EntityId, Entity>,
    characters: HashMap<CharacterId, EntityId>,
    grid: OccupancyGrid,
}

impl EntityRegistry {
    pub fn new(grid: OccupancyGrid) -> Self {
        Self {
            allocator: EntityIdAllocator::default(),
            entities: BTreeMap::new(),
            characters: HashMap::new(),
            grid,
        }
    }

    pub fn grid(&self) -> &OccupancyGrid {
        &self.grid
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Mutable access for state that does not affect occupancy. Use `set_position`,
    /// `set_angle` and friends for anything that moves footprints.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn character_entity(&self, character_id: CharacterId) -> Option<EntityId> {
        self.characters.get(&character_id).copied()
    }

    pub fn spawn(&mut self, position: Option<GridPos>, kind: EntityKind) -> EntityId {
        self.spawn_with(position, kind, false)
    }

    /// Spawns a client-only ghost that is not yet known to the server.
    pub fn spawn_provisional(&mut self, kind: EntityKind) -> EntityId {
        self.spawn_with(None, kind, true)
    }

    fn spawn_with(
        &mut self,
        position: Option<GridPos>,
        kind: EntityKind,
        provisional: bool,
    ) -> EntityId {
        let id = self.allocator.allocate();
        if let EntityKind::Character(character) = &kind {
            if let Some(previous) = self.characters.insert(character.character_id, id) {
                debug!(
                    character = character.character_id.0,
                    previous = previous.0,
                    "character_respawned"
                );
                self.despawn_entity(previous);
            }
        }
        self.entities.insert(
            id,
            Entity {
                id,
                position,
                edit: false,
                provisional,
                kind,
            },
        );
        self.place(id);
        id
    }

    /// Removes an entity, its grid cells and any seat relation it takes part in.
    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.despawn_entity(id)?;
        if let EntityKind::Character(character) = &entity.kind {
            if self.characters.get(&character.character_id) == Some(&id) {
                self.characters.remove(&character.character_id);
            }
        }
        Some(entity)
    }

    fn despawn_entity(&mut self, id: EntityId) -> Option<Entity> {
        self.remove(id);
        let entity = self.entities.remove(&id)?;
        match &entity.kind {
            EntityKind::Character(character) => {
                if let MotionState::Sitting { seat } = character.motion {
                    self.detach_sitter(seat, id);
                }
            }
            EntityKind::Furniture(furniture) => {
                let sitters = furniture.sitters.iter().copied().collect::<Vec<_>>();
                for sitter in sitters {
                    self.stand_up_in_place(sitter);
                }
            }
            EntityKind::Rug(_) | EntityKind::Poster(_) => {}
        }
        Some(entity)
    }

    /// Registers the entity into every cell of its footprint. Ghosts, unplaced
    /// entities, sitters and posters contribute nothing.
    pub fn place(&mut self, id: EntityId) -> usize {
        let Some((layer, footprint)) = self.grid_slot(id) else {
            return 0;
        };
        self.grid.place(id, layer, footprint)
    }

    /// Clears the entity's current footprint from the grid. Must run before any
    /// change to position or angle so the identical footprint is cleared.
    pub fn remove(&mut self, id: EntityId) -> usize {
        let Some((layer, footprint)) = self.grid_slot(id) else {
            return 0;
        };
        self.grid.remove(id, layer, footprint)
    }

    fn grid_slot(&self, id: EntityId) -> Option<(Layer, Footprint)> {
        let entity = self.entities.get(&id)?;
        if entity.edit {
            return None;
        }
        if let Some(character) = entity.as_character() {
            if matches!(character.motion, MotionState::Sitting { .. }) {
                return None;
            }
        }
        Some((entity.layer()?, entity.footprint()?))
    }

    pub fn set_position(&mut self, id: EntityId, position: Option<GridPos>) -> bool {
        if !self.entities.contains_key(&id) {
            return false;
        }
        self.remove(id);
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.position = position;
        }
        self.place(id);
        true
    }

    pub fn set_edit(&mut self, id: EntityId, edit: bool) -> bool {
        if !self.entities.contains_key(&id) {
            return false;
        }
        self.remove(id);
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.edit = edit;
        }
        self.place(id);
        true
    }

    pub fn set_angle(&mut self, id: EntityId, angle: usize) -> bool {
        let is_furniture = self
            .entities
            .get(&id)
            .is_some_and(|entity| entity.as_furniture().is_some());
        if !is_furniture {
            return false;
        }
        self.remove(id);
        if let Some(furniture) = self.entities.get_mut(&id).and_then(Entity::as_furniture_mut) {
            furniture.angle = angle % furniture.orientations.len().max(1);
        }
        self.place(id);
        true
    }

    /// Sets motion state and keeps grid occupancy in step with it (sitters leave the grid).
    pub fn set_motion(&mut self, id: EntityId, motion: MotionState) -> bool {
        if self.get(id).and_then(Entity::as_character).is_none() {
            return false;
        }
        self.remove(id);
        if let Some(character) = self.entities.get_mut(&id).and_then(Entity::as_character_mut) {
            character.motion = motion;
        }
        self.place(id);
        true
    }

    pub fn attach_sitter(&mut self, seat: EntityId, sitter: EntityId) -> bool {
        match self.entities.get_mut(&seat).and_then(Entity::as_furniture_mut) {
            Some(furniture) => {
                furniture.sitters.insert(sitter);
                true
            }
            None => false,
        }
    }

    pub fn detach_sitter(&mut self, seat: EntityId, sitter: EntityId) {
        if let Some(furniture) = self.entities.get_mut(&seat).and_then(Entity::as_furniture_mut) {
            furniture.sitters.remove(&sitter);
        }
    }

    fn stand_up_in_place(&mut self, sitter: EntityId) {
        self.set_motion(sitter, MotionState::Idle);
    }

    /// Topmost entity at a cell: solid layer first, then rugs.
    pub fn entity_at(&self, cell: GridPos) -> Option<EntityId> {
        self.grid
            .occupant(cell, Layer::Solid)
            .or_else(|| self.grid.occupant(cell, Layer::Floor))
    }

    pub fn entity_at_layer(&self, cell: GridPos, layer: Layer) -> Option<EntityId> {
        self.grid.occupant(cell, layer)
    }

    /// Out of bounds, statically blocked, or held by a blocking entity other
    /// than `querying`.
    pub fn is_blocked(&self, cell: GridPos, querying: Option<EntityId>) -> bool {
        if self.grid.is_static_blocked(cell) {
            return true;
        }
        match self.grid.occupant(cell, Layer::Solid) {
            Some(holder) if Some(holder) != querying => self
                .entities
                .get(&holder)
                .is_some_and(Entity::blocks_walking),
            _ => false,
        }
    }

    /// Whether `id` could occupy `anchor` with the given furniture angle (current angle if `None`).
    pub fn can_occupy(&self, id: EntityId, anchor: GridPos, angle: Option<usize>) -> bool {
        let Some(entity) = self.entities.get(&id) else {
            return false;
        };
        let Some(layer) = entity.layer() else {
            return false;
        };
        let footprint = match (angle, entity.as_furniture()) {
            (Some(angle), Some(furniture)) => {
                let (width, height) = furniture.size_at(angle);
                Footprint::new(anchor, width, height)
            }
            _ => entity.footprint_at(anchor),
        };
        self.grid.is_area_clear(layer, footprint, Some(id))
    }

    /// Finds a committed furniture object or rug by wire identity.
    pub fn find_placed(&self, name: &str, cell: GridPos, layer: Layer) -> Option<EntityId> {
        let id = self.grid.occupant(cell, layer)?;
        let entity = self.entities.get(&id)?;
        (entity.name() == Some(name) && entity.position == Some(cell)).then_some(id)
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.characters.clear();
        self.grid.clear_occupants();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{FurnitureDefinition, RugDefinition};
    use crate::room::{Appearance, Character, FurnitureObject, Orientation, Rug};

    fn couch(sit: bool) -> EntityKind {
        EntityKind::Furniture(FurnitureObject::from_definition(
            "couch",
            &FurnitureDefinition {
                title: String::new(),
                tile_width: 2,
                tile_height: 1,
                width: 0,
                height: 0,
                orientations: vec![Orientation::NorthEast, Orientation::NorthWest],
                sit,
                foreground: false,
            },
            0,
        ))
    }

    fn rug() -> EntityKind {
        EntityKind::Rug(Rug::from_definition(
            "rug",
            &RugDefinition {
                title: String::new(),
                tile_width: 2,
                tile_height: 2,
            },
        ))
    }

    fn character(id: u64) -> EntityKind {
        EntityKind::Character(Character::new(CharacterId(id), "someone", Appearance::default()))
    }

    fn registry(width: u32, height: u32) -> EntityRegistry {
        EntityRegistry::new(OccupancyGrid::new(width, height))
    }

    #[test]
    fn spawn_places_full_footprint_and_despawn_clears_it() {
        let mut registry = registry(5, 5);
        let id = registry.spawn(Some(GridPos::new(1, 1)), couch(false));
        assert_eq!(registry.entity_at(GridPos::new(1, 1)), Some(id));
        assert_eq!(registry.entity_at(GridPos::new(2, 1)), Some(id));
        assert_eq!(registry.grid().occupied_count(Layer::Solid), 2);

        registry.despawn(id);
        assert_eq!(registry.grid().occupied_count(Layer::Solid), 0);
        assert!(registry.get(id).is_none());
    }

    #[test]
    fn unplaced_entities_are_indexed_but_not_on_grid() {
        let mut registry = registry(3, 3);
        let id = registry.spawn(None, couch(false));
        assert!(registry.get(id).is_some());
        assert_eq!(registry.grid().occupied_count(Layer::Solid), 0);
    }

    #[test]
    fn rugs_share_cells_with_solid_entities() {
        let mut registry = registry(4, 4);
        let rug_id = registry.spawn(Some(GridPos::new(0, 0)), rug());
        let person = registry.spawn(Some(GridPos::new(1, 1)), character(7));
        assert_eq!(registry.entity_at(GridPos::new(1, 1)), Some(person));
        assert_eq!(registry.entity_at(GridPos::new(0, 1)), Some(rug_id));
        assert_eq!(
            registry.entity_at_layer(GridPos::new(1, 1), Layer::Floor),
            Some(rug_id)
        );
        assert!(!registry.is_blocked(GridPos::new(0, 1), None));
    }

    #[test]
    fn blocked_query_ignores_self_and_sittable_furniture() {
        let mut registry = registry(4, 4);
        let person = registry.spawn(Some(GridPos::new(0, 0)), character(1));
        registry.spawn(Some(GridPos::new(1, 1)), couch(true));
        registry.spawn(Some(GridPos::new(1, 2)), couch(false));

        assert!(registry.is_blocked(GridPos::new(0, 0), None));
        assert!(!registry.is_blocked(GridPos::new(0, 0), Some(person)));
        assert!(!registry.is_blocked(GridPos::new(2, 1), None));
        assert!(registry.is_blocked(GridPos::new(2, 2), None));
        assert!(registry.is_blocked(GridPos::new(4, 0), None));
        assert!(registry.is_blocked(GridPos::new(-1, 0), None));
    }

    #[test]
    fn set_angle_moves_footprint_without_moving_anchor() {
        let mut registry = registry(4, 4);
        let id = registry.spawn(Some(GridPos::new(1, 1)), couch(false));
        assert!(registry.set_angle(id, 1));
        assert_eq!(registry.get(id).and_then(|e| e.position), Some(GridPos::new(1, 1)));
        assert_eq!(registry.entity_at(GridPos::new(2, 1)), None);
        assert_eq!(registry.entity_at(GridPos::new(1, 2)), Some(id));
    }

    #[test]
    fn can_occupy_checks_alternate_angles() {
        let mut registry = registry(4, 4);
        let id = registry.spawn(Some(GridPos::new(1, 1)), couch(false));
        registry.spawn(Some(GridPos::new(1, 2)), character(3));
        assert!(registry.can_occupy(id, GridPos::new(1, 1), None));
        assert!(!registry.can_occupy(id, GridPos::new(1, 1), Some(1)));
        assert!(!registry.can_occupy(id, GridPos::new(3, 0), None));
    }

    #[test]
    fn respawning_a_character_replaces_the_stale_entity() {
        let mut registry = registry(4, 4);
        let first = registry.spawn(Some(GridPos::new(0, 0)), character(9));
        let second = registry.spawn(Some(GridPos::new(2, 2)), character(9));
        assert!(registry.get(first).is_none());
        assert_eq!(registry.character_entity(CharacterId(9)), Some(second));
        assert_eq!(registry.entity_at(GridPos::new(0, 0)), None);
        assert_eq!(registry.entity_at(GridPos::new(2, 2)), Some(second));
    }

    #[test]
    fn removing_a_seat_stands_its_sitters_up() {
        let mut registry = registry(4, 4);
        let seat = registry.spawn(Some(GridPos::new(1, 1)), couch(true));
        let person = registry.spawn(Some(GridPos::new(3, 3)), character(4));
        registry.set_position(person, Some(GridPos::new(2, 1)));
        registry.set_motion(person, MotionState::Sitting { seat });
        registry.attach_sitter(seat, person);
        assert_eq!(registry.entity_at(GridPos::new(3, 3)), None);

        registry.despawn(seat);
        let character = registry.get(person).and_then(Entity::as_character).expect("character");
        assert_eq!(character.motion, MotionState::Idle);
        assert_eq!(registry.entity_at(GridPos::new(2, 1)), Some(person));
    }

    #[test]
    fn find_placed_matches_name_and_anchor() {
        let mut registry = registry(4, 4);
        let id = registry.spawn(Some(GridPos::new(1, 1)), couch(false));
        assert_eq!(registry.find_placed("couch", GridPos::new(1, 1), Layer::Solid), Some(id));
        assert_eq!(registry.find_placed("couch", GridPos::new(2, 1), Layer::Solid), None);
        assert_eq!(registry.find_placed("lamp", GridPos::new(1, 1), Layer::Solid), None);
    }
}
