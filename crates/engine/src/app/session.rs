use std::time::Duration;

use tracing::{debug, info, warn};

use super::clock::TickClock;
use super::input::{InputContext, PointerInput};
use crate::config::CoreConfig;
use crate::content::Catalog;
use crate::protocol::{ClientCommand, ProtocolError, ServerMessage};
use crate::room::{
    CharacterId, EntityId, ObjectAction, PlaceableKind, Room, RoomEvent, RouteOutcome,
};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    LoggedIn { character_id: CharacterId },
    LoginFailed { message: String },
    RoomJoined { name: String },
    RoomJoinFailed { name: String, message: String },
    RoomLeft { name: String },
    Room(RoomEvent),
    /// Terminal: the transport is gone and nothing else will be processed.
    Disconnected,
}

/// Owns the joined room and is the single entry point for inbound messages,
/// local input and the fixed tick.
#[derive(Debug)]
pub struct Session {
    config: CoreConfig,
    catalog: Catalog,
    clock: TickClock,
    character_id: Option<CharacterId>,
    room: Option<Room>,
    connected: bool,
    outbound: Vec<ClientCommand>,
    events: Vec<SessionEvent>,
}

impl Session {
    pub fn new(config: CoreConfig, catalog: Catalog) -> Self {
        let clock = TickClock::new(&config);
        Self {
            config,
            catalog,
            clock,
            character_id: None,
            room: None,
            connected: true,
            outbound: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn character_id(&self) -> Option<CharacterId> {
        self.character_id
    }

    pub fn room(&self) -> Option<&Room> {
        self.room.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn tick_count(&self) -> u64 {
        self.clock.tick()
    }

    pub fn take_outbound(&mut self) -> Vec<ClientCommand> {
        std::mem::take(&mut self.outbound)
    }

    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Decodes and applies one inbound message. Malformed messages are logged and
    /// dropped without touching state; the error is returned for the caller's records.
    pub fn handle_message(&mut self, raw: &str) -> Result<(), ProtocolError> {
        if !self.connected {
            debug!("message_after_disconnect_ignored");
            return Ok(());
        }
        let message = match ServerMessage::decode(raw) {
            Ok(message) => message,
            Err(error) => {
                warn!(error = %error, "inbound_message_dropped");
                return Err(error);
            }
        };
        self.dispatch(message);
        Ok(())
    }

    pub fn dispatch(&mut self, message: ServerMessage) {
        if !self.connected {
            return;
        }
        match message {
            ServerMessage::LoginResponse(response) => match (response.success, response.id) {
                (true, Some(character_id)) => {
                    info!(character = character_id.0, "login_succeeded");
                    self.character_id = Some(character_id);
                    self.events.push(SessionEvent::LoggedIn { character_id });
                }
                _ => {
                    let message = response.message.unwrap_or_default();
                    info!(message = %message, "login_failed");
                    self.events.push(SessionEvent::LoginFailed { message });
                }
            },
            ServerMessage::JoinRoom(join) => {
                self.leave_room();
                let name = join.name.clone();
                match Room::join(&self.catalog, &self.config, join, self.character_id) {
                    Ok(room) => {
                        self.room = Some(room);
                        self.events.push(SessionEvent::RoomJoined { name });
                    }
                    Err(error) => {
                        warn!(room = %name, error = %error, "room_join_failed");
                        self.events.push(SessionEvent::RoomJoinFailed {
                            name,
                            message: error.to_string(),
                        });
                    }
                }
            }
            ServerMessage::LeaveRoom => self.leave_room(),
            ServerMessage::Room(message) => {
                let Some(room) = self.room.as_mut() else {
                    debug!("room_message_without_room");
                    return;
                };
                let outcome = room.apply(&self.catalog, message);
                self.drain_room();
                if outcome == RouteOutcome::Teardown {
                    self.leave_room();
                }
            }
        }
    }

    fn leave_room(&mut self) {
        self.drain_room();
        if let Some(room) = self.room.take() {
            info!(room = %room.name(), "room_left");
            self.events.push(SessionEvent::RoomLeft {
                name: room.name().to_string(),
            });
        }
    }

    fn drain_room(&mut self) {
        if let Some(room) = self.room.as_mut() {
            self.outbound.extend(room.take_outbound());
            self.events
                .extend(room.take_events().into_iter().map(SessionEvent::Room));
        }
    }

    /// Reports loss of the transport exactly once and drops the room.
    pub fn connection_lost(&mut self) {
        if !self.connected {
            return;
        }
        self.connected = false;
        self.room = None;
        self.outbound.clear();
        info!("connection_lost");
        self.events.push(SessionEvent::Disconnected);
    }

    /// Feeds wall-clock time into the fixed-step clock and runs the due ticks.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        let ticks = self.clock.advance(elapsed);
        if let Some(room) = self.room.as_mut() {
            for _ in 0..ticks {
                room.tick();
            }
        }
        self.drain_room();
        ticks
    }

    pub fn handle_pointer(&mut self, context: &InputContext, pointer: &PointerInput) {
        if let Some(room) = self.room.as_mut() {
            room.handle_pointer(context, pointer);
        }
        self.drain_room();
    }

    pub fn object_action(&mut self, entity: EntityId, action: ObjectAction) -> bool {
        let applied = self
            .room
            .as_mut()
            .is_some_and(|room| room.object_action(entity, action));
        self.drain_room();
        applied
    }

    pub fn begin_inventory_placement(
        &mut self,
        kind: PlaceableKind,
        name: &str,
    ) -> Option<EntityId> {
        let catalog = &self.catalog;
        let ghost = self
            .room
            .as_mut()
            .and_then(|room| room.begin_inventory_placement(catalog, kind, name));
        self.drain_room();
        ghost
    }

    pub fn send_chat(&mut self, message: &str) -> bool {
        let sent = self
            .room
            .as_mut()
            .is_some_and(|room| room.send_chat(message));
        self.drain_room();
        sent
    }

    pub fn preview_skin(&mut self, tile: Option<String>, wall: Option<String>) {
        if let Some(room) = self.room.as_mut() {
            room.preview_skin(tile, wall);
        }
        self.drain_room();
    }
}
