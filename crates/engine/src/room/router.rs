use tracing::debug;

use super::entity::{Character, Entity, EntityId, EntityKind, FurnitureObject, Poster, Rug};
use super::placement::PlacementState;
use super::{Room, RoomEvent};
use crate::content::Catalog;
use crate::protocol::{
    CharacterSnapshot, ObjectPlacement, PosterPlacement, RoomMessage, RugPlacement,
};
use crate::spatial::{Footprint, GridPos, Layer, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Applied,
    /// Referenced an id, cell or definition this client does not know.
    Ignored,
    /// The local player left; the session should drop the room.
    Teardown,
}

/// Applies inbound room messages to the entity model. Every handler leaves the
/// grid consistent before returning.
#[derive(Debug, Clone, Copy)]
pub struct RoomEventRouter<'a> {
    catalog: &'a Catalog,
}

fn ignored(kind: &'static str) -> RouteOutcome {
    debug!(kind, "room_message_ignored");
    RouteOutcome::Ignored
}

impl<'a> RoomEventRouter<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    pub fn route(&self, room: &mut Room, message: RoomMessage) -> RouteOutcome {
        match message {
            RoomMessage::AddCharacter(snapshot) => self.add_character(room, snapshot),
            RoomMessage::RemoveCharacter(target) => {
                if room.local == Some(target.id) {
                    room.events.push(RoomEvent::Teardown);
                    return RouteOutcome::Teardown;
                }
                let Some(id) = room.registry.character_entity(target.id) else {
                    return ignored("remove-character");
                };
                room.registry.despawn(id);
                RouteOutcome::Applied
            }
            RoomMessage::MoveCharacter(step) => {
                let Some(id) = room.registry.character_entity(step.id) else {
                    return ignored("move-character");
                };
                let cell = GridPos::new(step.x, step.y);
                if !room.registry.grid().in_bounds(cell) {
                    return ignored("move-character");
                }
                let now = room.tick;
                room.movement.command_walk(&mut room.registry, id, cell, now);
                RouteOutcome::Applied
            }
            RoomMessage::CharacterSit(seat) => {
                let Some(id) = room.registry.character_entity(seat.id) else {
                    return ignored("character-sit");
                };
                let cell = GridPos::new(seat.x, seat.y);
                if !room.registry.grid().in_bounds(cell) {
                    return ignored("character-sit");
                }
                if room.movement.command_sit(&mut room.registry, id, cell) {
                    RouteOutcome::Applied
                } else {
                    RouteOutcome::Ignored
                }
            }
            RoomMessage::CharacterAppearance(update) => {
                let character = room
                    .registry
                    .character_entity(update.id)
                    .and_then(|id| room.registry.get_mut(id))
                    .and_then(Entity::as_character_mut);
                match character {
                    Some(character) => {
                        character.appearance = update.appearance;
                        RouteOutcome::Applied
                    }
                    None => ignored("character-appearance"),
                }
            }
            RoomMessage::Chat(line) => {
                let username = room
                    .registry
                    .character_entity(line.id)
                    .and_then(|id| room.registry.get(id))
                    .and_then(Entity::as_character)
                    .map(|character| character.username.clone());
                let Some(username) = username else {
                    return ignored("chat");
                };
                room.events.push(RoomEvent::Chat {
                    username,
                    message: line.message,
                    position: line.x.zip(line.y).map(|(x, y)| Vec2::new(x, y)),
                    colour: line.colour,
                });
                RouteOutcome::Applied
            }
            RoomMessage::AddObject(placement) => self.add_object(room, placement),
            RoomMessage::RemoveObject(placement) => {
                let cell = GridPos::new(placement.x, placement.y);
                remove_placed(room, &placement.name, cell, Layer::Solid, "remove-object")
            }
            RoomMessage::AddRug(placement) => self.add_rug(room, placement),
            RoomMessage::RemoveRug(placement) => {
                let cell = GridPos::new(placement.x, placement.y);
                remove_placed(room, &placement.name, cell, Layer::Floor, "remove-rug")
            }
            RoomMessage::AddPoster(placement) => self.add_poster(room, placement),
            RoomMessage::RemovePoster(placement) => {
                let found = room
                    .registry
                    .iter()
                    .find(|entity| match &entity.kind {
                        EntityKind::Poster(poster) => {
                            poster.name == placement.name
                                && poster.wall == placement.x
                                && poster.offset == placement.y
                        }
                        _ => false,
                    })
                    .map(|entity| entity.id);
                match found {
                    Some(id) => {
                        room.registry.despawn(id);
                        RouteOutcome::Applied
                    }
                    None => ignored("remove-poster"),
                }
            }
            RoomMessage::RoomSettings(settings) => {
                room.set_skin(settings.tile, settings.wall);
                RouteOutcome::Applied
            }
        }
    }

    fn add_character(&self, room: &mut Room, snapshot: CharacterSnapshot) -> RouteOutcome {
        let cell = GridPos::new(snapshot.x, snapshot.y);
        if !room.registry.grid().in_bounds(cell) {
            return ignored("add-character");
        }
        let character = Character::new(snapshot.id, snapshot.username, snapshot.appearance);
        room.registry
            .spawn(Some(cell), EntityKind::Character(character));
        RouteOutcome::Applied
    }

    fn add_object(&self, room: &mut Room, placement: ObjectPlacement) -> RouteOutcome {
        let cell = GridPos::new(placement.x, placement.y);
        if let Some(id) = room.registry.find_placed(&placement.name, cell, Layer::Solid) {
            // Echo of our own placement.
            room.registry.set_angle(id, placement.angle);
            if let Some(entity) = room.registry.get_mut(id) {
                entity.provisional = false;
            }
            return RouteOutcome::Applied;
        }
        let Some(definition) = self.catalog.furniture(&placement.name) else {
            return ignored("add-object");
        };
        let furniture =
            FurnitureObject::from_definition(&placement.name, definition, placement.angle);
        let (width, height) = furniture.effective_size();
        if !room
            .registry
            .grid()
            .contains_footprint(Footprint::new(cell, width, height))
        {
            return ignored("add-object");
        }
        room.registry
            .spawn(Some(cell), EntityKind::Furniture(furniture));
        RouteOutcome::Applied
    }

    fn add_rug(&self, room: &mut Room, placement: RugPlacement) -> RouteOutcome {
        let cell = GridPos::new(placement.x, placement.y);
        if let Some(id) = room.registry.find_placed(&placement.name, cell, Layer::Floor) {
            if let Some(entity) = room.registry.get_mut(id) {
                entity.provisional = false;
            }
            return RouteOutcome::Applied;
        }
        let Some(definition) = self.catalog.rug(&placement.name) else {
            return ignored("add-rug");
        };
        let rug = Rug::from_definition(&placement.name, definition);
        let footprint = Footprint::new(cell, rug.tile_width, rug.tile_height);
        if !room.registry.grid().contains_footprint(footprint) {
            return ignored("add-rug");
        }
        room.registry.spawn(Some(cell), EntityKind::Rug(rug));
        RouteOutcome::Applied
    }

    fn add_poster(&self, room: &mut Room, placement: PosterPlacement) -> RouteOutcome {
        let Some(definition) = self.catalog.poster(&placement.name) else {
            return ignored("add-poster");
        };
        let poster = Poster {
            name: placement.name,
            wall: placement.x,
            offset: placement.y,
            sprite_height: definition.height,
        };
        room.registry.spawn(None, EntityKind::Poster(poster));
        RouteOutcome::Applied
    }
}

fn remove_placed(
    room: &mut Room,
    name: &str,
    cell: GridPos,
    layer: Layer,
    kind: &'static str,
) -> RouteOutcome {
    let Some(id) = room
        .registry
        .find_placed(name, cell, layer)
        .or_else(|| lifted_from(room, name, cell, layer))
    else {
        return ignored(kind);
    };
    room.placement.forget(id);
    room.registry.despawn(id);
    RouteOutcome::Applied
}

/// The entity the local owner is currently moving, if the server still knows it at `cell`.
fn lifted_from(room: &Room, name: &str, cell: GridPos, layer: Layer) -> Option<EntityId> {
    let PlacementState::Moving(ghost) = room.placement.state() else {
        return None;
    };
    let (previous, _) = ghost.previous?;
    let entity = room.registry.get(ghost.entity)?;
    (previous == cell && entity.name() == Some(name) && entity.layer() == Some(layer))
        .then_some(ghost.entity)
}
