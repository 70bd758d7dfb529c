mod depth;
mod draw;
mod entity;
mod movement;
mod placement;
mod registry;
mod router;

use thiserror::Error;
use tracing::{debug, info};

use crate::app::{InputContext, PointerInput};
use crate::config::CoreConfig;
use crate::content::{Catalog, RoomDefinition};
use crate::protocol::{ClientCommand, JoinRoom, RoomMessage};
use crate::spatial::{GridError, GridPos, IsoTransform, Layer, OccupancyGrid, Vec2};

pub use depth::{sort_draw_order, DepthKey, DrawSlot};
pub use draw::{CharacterPose, DrawContext, DrawEntry, SpriteRef, WALL_HEIGHT_PX};
pub use entity::{
    Appearance, Character, CharacterId, Entity, EntityId, EntityIdAllocator, EntityKind, Facing,
    FurnitureObject, Orientation, Poster, Rug,
};
pub use movement::{MotionState, MovementController, WalkState, WALK_FRAME_COUNT};
pub use placement::{
    Cancellation, Ghost, PlacementController, PlacementOutcome, PlacementState, RotateOutcome,
};
pub use registry::EntityRegistry;
pub use router::{RoomEventRouter, RouteOutcome};

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("room '{0}' is not in the catalog")]
    UnknownRoom(String),
    #[error("room '{room}' has an invalid map: {source}")]
    InvalidMap {
        room: String,
        #[source]
        source: GridError,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    Chat {
        username: String,
        message: String,
        position: Option<Vec2>,
        colour: Option<String>,
    },
    /// The owner pressed one of their objects; the host should show its settings.
    OpenObjectSettings { entity: EntityId, name: String },
    /// Tile or wall skin changed and the composited background must be rebuilt.
    BackgroundDirty { revision: u64 },
    /// The local player was removed from the room.
    Teardown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectAction {
    Rotate,
    PickUp,
    Delete,
    Move,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceableKind {
    Furniture,
    Rug,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomSkin {
    pub tile: Option<String>,
    pub wall: Option<String>,
}

/// A joined room: static layout plus the live entity model.
#[derive(Debug)]
pub struct Room {
    name: String,
    definition: RoomDefinition,
    owner: Option<CharacterId>,
    local: Option<CharacterId>,
    skin: RoomSkin,
    background_revision: u64,
    background_offset: Vec2,
    character_lift: f32,
    registry: EntityRegistry,
    movement: MovementController,
    placement: PlacementController,
    tick: u64,
    hovered: Option<GridPos>,
    /// Rug the owner last clicked; a second click on it opens its settings.
    selected: Option<EntityId>,
    outbox: Vec<ClientCommand>,
    events: Vec<RoomEvent>,
    draw_list: Vec<DrawEntry>,
}

impl Room {
    pub fn join(
        catalog: &Catalog,
        config: &CoreConfig,
        join: JoinRoom,
        local: Option<CharacterId>,
    ) -> Result<Self, RoomError> {
        let definition = catalog
            .room(&join.name)
            .cloned()
            .ok_or_else(|| RoomError::UnknownRoom(join.name.clone()))?;
        let grid = OccupancyGrid::from_blocked_rows(&definition.map).map_err(|source| {
            RoomError::InvalidMap {
                room: join.name.clone(),
                source,
            }
        })?;

        let background_offset = Vec2::new(
            (config.viewport_width as f32 / 2.0 - definition.background.width as f32 / 2.0).floor(),
            (config.viewport_height as f32 / 2.0 - definition.background.height as f32 / 2.0)
                .floor(),
        );
        let transform = IsoTransform::new(
            config.tile_width,
            config.tile_height,
            background_offset + Vec2::new(definition.offset_x, definition.offset_y),
        );

        let mut room = Self {
            name: join.name.clone(),
            definition,
            owner: join.owner_id,
            local,
            skin: RoomSkin {
                tile: join.tile.clone(),
                wall: join.wall.clone(),
            },
            background_revision: 1,
            background_offset,
            character_lift: config.character_lift_px,
            registry: EntityRegistry::new(grid),
            movement: MovementController::new(transform, config),
            placement: PlacementController::default(),
            tick: 0,
            hovered: None,
            selected: None,
            outbox: Vec::new(),
            events: Vec::new(),
            draw_list: Vec::new(),
        };

        let router = RoomEventRouter::new(catalog);
        let snapshot = join
            .rugs
            .into_iter()
            .map(RoomMessage::AddRug)
            .chain(join.objects.into_iter().map(RoomMessage::AddObject))
            .chain(join.posters.into_iter().map(RoomMessage::AddPoster))
            .chain(join.characters.into_iter().map(RoomMessage::AddCharacter));
        for message in snapshot {
            router.route(&mut room, message);
        }
        room.rebuild_draw_list();

        info!(
            room = %room.name,
            entities = room.registry.len(),
            owner = room.owner.map(|owner| owner.0),
            "room_joined"
        );
        Ok(room)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> &RoomDefinition {
        &self.definition
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn transform(&self) -> &IsoTransform {
        self.movement.transform()
    }

    pub fn skin(&self) -> &RoomSkin {
        &self.skin
    }

    pub fn background_revision(&self) -> u64 {
        self.background_revision
    }

    pub fn background_offset(&self) -> Vec2 {
        self.background_offset
    }

    pub fn hovered_tile(&self) -> Option<GridPos> {
        self.hovered
    }

    pub fn selected(&self) -> Option<EntityId> {
        self.selected
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn placement_state(&self) -> PlacementState {
        self.placement.state()
    }

    pub fn draw_list(&self) -> &[DrawEntry] {
        &self.draw_list
    }

    pub fn local_entity(&self) -> Option<EntityId> {
        self.local
            .and_then(|local| self.registry.character_entity(local))
    }

    pub fn is_owner(&self) -> bool {
        self.local.is_some() && self.local == self.owner
    }

    pub fn take_outbound(&mut self) -> Vec<ClientCommand> {
        std::mem::take(&mut self.outbox)
    }

    pub fn take_events(&mut self) -> Vec<RoomEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn apply(&mut self, catalog: &Catalog, message: RoomMessage) -> RouteOutcome {
        RoomEventRouter::new(catalog).route(self, message)
    }

    /// One fixed step: advance every walk, then recompute paint order.
    pub fn tick(&mut self) {
        self.tick = self.tick.saturating_add(1);
        self.movement.advance(&mut self.registry, self.tick);
        self.rebuild_draw_list();
    }

    fn rebuild_draw_list(&mut self) {
        let exit = GridPos::new(self.definition.exit.x, self.definition.exit.y);
        let slots = sort_draw_order(&self.registry, Some(exit));
        let context = DrawContext {
            movement: &self.movement,
            walls: &self.definition.walls,
            foreground_clip: &self.definition.foreground,
            background_offset: self.background_offset,
            character_lift: self.character_lift,
        };
        self.draw_list = context.build(&self.registry, &slots);
    }

    /// Routes one pointer sample: placement first, then hover, object settings
    /// and walking.
    pub fn handle_pointer(&mut self, context: &InputContext, pointer: &PointerInput) {
        let cell = pointer
            .position_px()
            .map(|position| self.transform().screen_to_grid(position));

        if pointer.escape_pressed() {
            if let Some(cancelled) = self.placement.cancel(&mut self.registry) {
                self.settle_cancellation(cancelled);
            }
            self.selected = None;
            return;
        }

        if self.placement.is_moving() {
            self.placement.track_pointer(&mut self.registry, cell);
            if pointer.released() {
                self.commit_placement();
            }
            return;
        }

        if context.suppresses_room_input() {
            self.hovered = None;
            return;
        }

        let grid = self.registry.grid();
        self.hovered = cell.filter(|cell| grid.in_bounds(*cell) && !grid.is_static_blocked(*cell));
        let Some(target) = self.hovered else {
            return;
        };
        if !pointer.pressed() || context.suppresses_clicks() {
            return;
        }

        if self.is_owner() && self.open_settings_at(target) {
            return;
        }

        if self.registry.is_blocked(target, self.local_entity()) {
            debug!(x = target.x, y = target.y, "walk_target_blocked");
            return;
        }
        self.outbox.push(ClientCommand::Walk {
            x: target.x,
            y: target.y,
        });
    }

    /// Furniture opens its settings on the first press. Rugs are walked onto:
    /// the first press selects the rug and only a press on the selected rug opens it.
    fn open_settings_at(&mut self, cell: GridPos) -> bool {
        let furniture = self
            .registry
            .entity_at_layer(cell, Layer::Solid)
            .filter(|id| self.registry.get(*id).is_some_and(Entity::is_placeable));
        let rug = self.registry.entity_at_layer(cell, Layer::Floor);

        let target = match (furniture, rug) {
            (Some(id), _) => id,
            (None, Some(id)) if self.selected == Some(id) => id,
            (None, rug) => {
                self.selected = rug;
                return false;
            }
        };
        let Some(name) = self.registry.get(target).and_then(Entity::name) else {
            return false;
        };
        let name = name.to_string();
        self.selected = Some(target);
        self.events.push(RoomEvent::OpenObjectSettings {
            entity: target,
            name,
        });
        true
    }

    fn commit_placement(&mut self) {
        match self.placement.commit(&mut self.registry) {
            Some(PlacementOutcome::Committed { entity, commands }) => {
                debug!(entity = entity.0, commands = commands.len(), "placement_committed");
                self.outbox.extend(commands);
            }
            Some(PlacementOutcome::Cancelled(cancelled)) => self.settle_cancellation(cancelled),
            None => {}
        }
    }

    /// A cancelled inventory ghost has nowhere to go back to; it returns to the inventory.
    fn settle_cancellation(&mut self, cancelled: Cancellation) {
        let discard = cancelled.restored.is_none()
            && self
                .registry
                .get(cancelled.entity)
                .is_some_and(|entity| entity.provisional);
        if discard {
            self.registry.despawn(cancelled.entity);
        }
        debug!(
            entity = cancelled.entity.0,
            restored = cancelled.restored.is_some(),
            discarded = discard,
            "placement_cancelled"
        );
    }

    /// Applies an object-settings button for the owner.
    pub fn object_action(&mut self, id: EntityId, action: ObjectAction) -> bool {
        if !self.is_owner() {
            debug!(entity = id.0, "object_action_not_owner");
            return false;
        }
        let Some(entity) = self.registry.get(id) else {
            return false;
        };
        if !entity.is_placeable() {
            return false;
        }
        let wire = entity.position.zip(entity.name().map(str::to_string));
        let is_rug = matches!(entity.kind, EntityKind::Rug(_));

        match action {
            ObjectAction::Rotate => match self.placement.rotate(&mut self.registry, id) {
                RotateOutcome::Rotated(command) => {
                    self.outbox.extend(command);
                    true
                }
                RotateOutcome::Blocked | RotateOutcome::NotRotatable => false,
            },
            ObjectAction::PickUp | ObjectAction::Delete => {
                let Some((cell, name)) = wire else {
                    return false;
                };
                let (x, y) = (cell.x, cell.y);
                let command = match (action, is_rug) {
                    (ObjectAction::PickUp, false) => ClientCommand::PickUpObject { name, x, y },
                    (ObjectAction::PickUp, true) => ClientCommand::PickUpRug { name, x, y },
                    (_, false) => ClientCommand::RemoveObject { name, x, y },
                    (_, true) => ClientCommand::RemoveRug { name, x, y },
                };
                self.placement.forget(id);
                self.registry.despawn(id);
                self.outbox.push(command);
                true
            }
            ObjectAction::Move => {
                if let Some(cancelled) = self.placement.begin(&mut self.registry, id) {
                    self.settle_cancellation(cancelled);
                }
                self.placement.ghost() == Some(id)
            }
        }
    }

    /// Creates a provisional ghost from an inventory item and attaches it to the pointer.
    pub fn begin_inventory_placement(
        &mut self,
        catalog: &Catalog,
        kind: PlaceableKind,
        name: &str,
    ) -> Option<EntityId> {
        if !self.is_owner() {
            debug!(name, "inventory_placement_not_owner");
            return None;
        }
        let entity_kind = match kind {
            PlaceableKind::Furniture => catalog
                .furniture(name)
                .map(|def| EntityKind::Furniture(FurnitureObject::from_definition(name, def, 0))),
            PlaceableKind::Rug => catalog
                .rug(name)
                .map(|def| EntityKind::Rug(Rug::from_definition(name, def))),
        };
        let Some(entity_kind) = entity_kind else {
            debug!(name, "inventory_item_unknown");
            return None;
        };
        let id = self.registry.spawn_provisional(entity_kind);
        if let Some(cancelled) = self.placement.begin(&mut self.registry, id) {
            self.settle_cancellation(cancelled);
        }
        Some(id)
    }

    /// Queues a chat line. Blank input is dropped.
    pub fn send_chat(&mut self, message: &str) -> bool {
        let message = message.trim();
        if message.is_empty() {
            return false;
        }
        self.outbox.push(ClientCommand::Chat {
            message: message.to_string(),
        });
        true
    }

    /// Local settings preview; the server confirms with `room-settings`.
    pub fn preview_skin(&mut self, tile: Option<String>, wall: Option<String>) {
        self.set_skin(tile, wall);
    }

    fn set_skin(&mut self, tile: Option<String>, wall: Option<String>) {
        if let Some(tile) = tile {
            self.skin.tile = Some(tile);
        }
        if let Some(wall) = wall {
            self.skin.wall = Some(wall);
        }
        self.background_revision = self.background_revision.saturating_add(1);
        self.events.push(RoomEvent::BackgroundDirty {
            revision: self.background_revision,
        });
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::app::Panel;
    use crate::protocol::ServerMessage;

    pub(super) fn catalog() -> Catalog {
        Catalog::from_json_str(
            &json!({
                "rooms": {
                    "studio_a": {
                        "map": [
                            [0, 0, 0, 0, 0, 0],
                            [0, 0, 0, 0, 0, 0],
                            [0, 0, 0, 0, 0, 0],
                            [0, 0, 0, 0, 0, 0],
                            [0, 0, 0, 0, 0, 0],
                            [0, 0, 0, 0, 0, 1]
                        ],
                        "walls": [
                            { "orientation": "left", "offsetX": 0, "offsetY": 100, "width": 6 }
                        ],
                        "exit": { "x": 0, "y": 3, "wall": [0, 2] },
                        "foreground": [{ "x": 0, "y": 0 }, { "x": 30, "y": 10 }],
                        "offsetX": 175,
                        "offsetY": 20,
                        "background": { "width": 400, "height": 300 }
                    }
                },
                "furniture": {
                    "couch": {
                        "tileWidth": 2, "tileHeight": 1, "height": 60,
                        "orientations": ["ne", "nw"], "sit": true, "foreground": true
                    },
                    "table": { "tileWidth": 1, "tileHeight": 1, "height": 40 }
                },
                "rugs": { "red_rug": { "tileWidth": 2, "tileHeight": 2 } },
                "posters": { "band": { "height": 50 } }
            })
            .to_string(),
        )
        .expect("catalog")
    }

    pub(super) fn join_room(catalog: &Catalog, local: u64, owner: u64) -> Room {
        let ServerMessage::JoinRoom(join) = ServerMessage::from_value(json!({
            "type": "join-room",
            "name": "studio_a",
            "ownerId": owner,
            "characters": [
                { "id": local, "username": "me", "x": 2, "y": 2 },
                { "id": 90, "username": "guest", "x": 4, "y": 4 }
            ],
            "objects": [{ "name": "couch", "x": 0, "y": 0, "angle": 0 }],
            "rugs": [{ "name": "red_rug", "x": 3, "y": 0 }],
            "posters": [{ "name": "band", "x": 0, "y": 30 }]
        }))
        .expect("join") else {
            panic!("expected join-room");
        };
        Room::join(catalog, &CoreConfig::default(), join, Some(CharacterId(local))).expect("room")
    }

    fn click(room: &Room, cell: GridPos) -> PointerInput {
        let top = room.transform().grid_to_screen(cell);
        PointerInput::at(top + Vec2::new(0.0, room.transform().half_height()))
            .with_pressed(true)
            .with_released(true)
    }

    #[test]
    fn join_builds_entities_and_draw_list() {
        let catalog = catalog();
        let room = join_room(&catalog, 1, 1);
        assert_eq!(room.registry().len(), 5);
        assert_eq!(room.draw_list().len(), 5);
        assert!(matches!(room.draw_list().last(), Some(DrawEntry::Entity { .. })));
        assert_eq!(room.background_offset(), Vec2::new(200.0, 150.0));
        assert_eq!(room.background_revision(), 1);
        assert!(room.is_owner());
    }

    #[test]
    fn unknown_room_is_an_error() {
        let catalog = catalog();
        let join = JoinRoom {
            name: "missing".to_string(),
            owner_id: None,
            tile: None,
            wall: None,
            characters: Vec::new(),
            objects: Vec::new(),
            rugs: Vec::new(),
            posters: Vec::new(),
        };
        let error = Room::join(&catalog, &CoreConfig::default(), join, None).expect_err("unknown");
        assert!(matches!(error, RoomError::UnknownRoom(name) if name == "missing"));
    }

    #[test]
    fn clicking_an_open_tile_sends_walk() {
        let catalog = catalog();
        let mut room = join_room(&catalog, 1, 2);
        room.handle_pointer(&InputContext::empty(), &click(&room, GridPos::new(1, 4)));
        assert_eq!(room.hovered_tile(), Some(GridPos::new(1, 4)));
        assert_eq!(room.take_outbound(), vec![ClientCommand::Walk { x: 1, y: 4 }]);
    }

    #[test]
    fn clicking_blocked_or_occupied_tiles_sends_nothing() {
        let catalog = catalog();
        let mut room = join_room(&catalog, 1, 2);
        room.handle_pointer(&InputContext::empty(), &click(&room, GridPos::new(5, 5)));
        assert_eq!(room.hovered_tile(), None);
        room.handle_pointer(&InputContext::empty(), &click(&room, GridPos::new(4, 4)));
        assert!(room.take_outbound().is_empty());
    }

    #[test]
    fn open_panel_suppresses_walk_and_hover() {
        let catalog = catalog();
        let mut room = join_room(&catalog, 1, 2);
        let context = InputContext::empty().with_open_panel(Some(Panel::Settings));
        room.handle_pointer(&context, &click(&room, GridPos::new(1, 4)));
        assert_eq!(room.hovered_tile(), None);
        assert!(room.take_outbound().is_empty());
    }

    #[test]
    fn owner_click_on_furniture_opens_settings() {
        let catalog = catalog();
        let mut room = join_room(&catalog, 1, 1);
        room.handle_pointer(&InputContext::empty(), &click(&room, GridPos::new(1, 0)));
        let events = room.take_events();
        assert!(matches!(
            events.as_slice(),
            [RoomEvent::OpenObjectSettings { name, .. }] if name == "couch"
        ));
        assert!(room.take_outbound().is_empty());
    }

    #[test]
    fn guest_click_on_sittable_furniture_walks_there() {
        let catalog = catalog();
        let mut room = join_room(&catalog, 1, 2);
        room.handle_pointer(&InputContext::empty(), &click(&room, GridPos::new(1, 0)));
        assert!(room.take_events().is_empty());
        assert_eq!(room.take_outbound(), vec![ClientCommand::Walk { x: 1, y: 0 }]);
    }

    #[test]
    fn inventory_placement_commits_with_add_object() {
        let catalog = catalog();
        let mut room = join_room(&catalog, 1, 1);
        let ghost = room
            .begin_inventory_placement(&catalog, PlaceableKind::Furniture, "table")
            .expect("ghost");
        room.handle_pointer(
            &InputContext::empty(),
            &PointerInput::at(
                room.transform().grid_to_screen(GridPos::new(1, 3)) + Vec2::new(0.0, 18.0),
            ),
        );
        room.tick();
        assert!(room.draw_list().iter().any(|entry| matches!(
            entry,
            DrawEntry::Entity { id, translucent: true, .. } if *id == ghost
        )));

        room.handle_pointer(&InputContext::empty(), &click(&room, GridPos::new(1, 3)));
        assert_eq!(
            room.take_outbound(),
            vec![ClientCommand::AddObject {
                name: "table".to_string(),
                x: 1,
                y: 3,
                angle: 0
            }]
        );
        assert_eq!(room.registry().entity_at(GridPos::new(1, 3)), Some(ghost));
    }

    #[test]
    fn escaping_an_inventory_ghost_discards_it() {
        let catalog = catalog();
        let mut room = join_room(&catalog, 1, 1);
        let ghost = room
            .begin_inventory_placement(&catalog, PlaceableKind::Rug, "red_rug")
            .expect("ghost");
        room.handle_pointer(
            &InputContext::empty(),
            &PointerInput::empty().with_escape_pressed(true),
        );
        assert!(room.registry().get(ghost).is_none());
        assert_eq!(room.placement_state(), PlacementState::Idle);
    }

    #[test]
    fn guests_cannot_place_or_edit() {
        let catalog = catalog();
        let mut room = join_room(&catalog, 1, 2);
        assert!(room
            .begin_inventory_placement(&catalog, PlaceableKind::Furniture, "table")
            .is_none());
        let couch = room.registry().entity_at(GridPos::new(0, 0)).expect("couch");
        assert!(!room.object_action(couch, ObjectAction::Delete));
        assert!(room.registry().get(couch).is_some());
    }

    #[test]
    fn pick_up_removes_locally_and_sends_command() {
        let catalog = catalog();
        let mut room = join_room(&catalog, 1, 1);
        let rug = room
            .registry()
            .entity_at_layer(GridPos::new(3, 0), Layer::Floor)
            .expect("rug");
        assert!(room.object_action(rug, ObjectAction::PickUp));
        assert!(room.registry().get(rug).is_none());
        assert_eq!(
            room.take_outbound(),
            vec![ClientCommand::PickUpRug {
                name: "red_rug".to_string(),
                x: 3,
                y: 0
            }]
        );
    }

    #[test]
    fn move_action_then_escape_restores_object() {
        let catalog = catalog();
        let mut room = join_room(&catalog, 1, 1);
        let couch = room.registry().entity_at(GridPos::new(0, 0)).expect("couch");
        assert!(room.object_action(couch, ObjectAction::Move));
        assert_eq!(room.registry().entity_at(GridPos::new(0, 0)), None);
        room.handle_pointer(
            &InputContext::empty(),
            &PointerInput::at(room.transform().grid_to_screen(GridPos::new(2, 4)))
                .with_escape_pressed(true),
        );
        assert_eq!(room.registry().entity_at(GridPos::new(0, 0)), Some(couch));
        assert!(room.take_outbound().is_empty());
    }

    #[test]
    fn chat_is_trimmed_and_blank_lines_dropped() {
        let catalog = catalog();
        let mut room = join_room(&catalog, 1, 1);
        assert!(!room.send_chat("   "));
        assert!(room.send_chat("  hello "));
        assert_eq!(
            room.take_outbound(),
            vec![ClientCommand::Chat {
                message: "hello".to_string()
            }]
        );
    }

    #[test]
    fn skin_preview_bumps_background_revision() {
        let catalog = catalog();
        let mut room = join_room(&catalog, 1, 1);
        room.preview_skin(Some("blue_tile".to_string()), None);
        assert_eq!(room.skin().tile.as_deref(), Some("blue_tile"));
        assert_eq!(room.take_events(), vec![RoomEvent::BackgroundDirty { revision: 2 }]);
    }

    #[test]
    fn owner_walks_onto_a_rug_before_opening_it() {
        let catalog = catalog();
        let mut room = join_room(&catalog, 1, 1);
        let rug = room
            .registry()
            .entity_at_layer(GridPos::new(3, 0), Layer::Floor)
            .expect("rug");

        room.handle_pointer(&InputContext::empty(), &click(&room, GridPos::new(3, 1)));
        assert_eq!(room.take_outbound(), vec![ClientCommand::Walk { x: 3, y: 1 }]);
        assert!(room.take_events().is_empty());
        assert_eq!(room.selected(), Some(rug));

        room.handle_pointer(&InputContext::empty(), &click(&room, GridPos::new(4, 1)));
        assert!(room.take_outbound().is_empty());
        assert!(matches!(
            room.take_events().as_slice(),
            [RoomEvent::OpenObjectSettings { entity, name }] if *entity == rug && name == "red_rug"
        ));
    }

    #[test]
    fn escape_in_the_same_sample_as_a_press_does_not_walk() {
        let catalog = catalog();
        let mut room = join_room(&catalog, 1, 1);
        let couch = room.registry().entity_at(GridPos::new(0, 0)).expect("couch");
        assert!(room.object_action(couch, ObjectAction::Move));
        room.handle_pointer(
            &InputContext::empty(),
            &click(&room, GridPos::new(1, 4)).with_escape_pressed(true),
        );
        assert_eq!(room.registry().entity_at(GridPos::new(0, 0)), Some(couch));
        assert!(room.take_outbound().is_empty());

        room.handle_pointer(
            &InputContext::empty(),
            &click(&room, GridPos::new(1, 4)).with_escape_pressed(true),
        );
        assert!(room.take_outbound().is_empty());
    }

    #[test]
    fn chat_focus_keeps_hover_but_blocks_walking() {
        let catalog = catalog();
        let mut room = join_room(&catalog, 1, 2);
        let typing = InputContext::empty().with_chat_focused(true);
        room.handle_pointer(&typing, &click(&room, GridPos::new(1, 4)));
        assert_eq!(room.hovered_tile(), Some(GridPos::new(1, 4)));
        assert!(room.take_outbound().is_empty());
    }
}
