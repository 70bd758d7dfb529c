//! JSON wire messages. Every message is an object discriminated by its `type`
//! string; payload fields sit next to `type` at the top level.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::room::{Appearance, CharacterId};

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("message is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("message has no string `type` field")]
    MissingType,
    #[error("unknown message type '{0}'")]
    UnknownType(String),
    #[error("failed to encode command: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("invalid '{kind}' payload at '{path}': {message}")]
    InvalidPayload {
        kind: String,
        path: String,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CharacterSnapshot {
    pub id: CharacterId,
    pub username: String,
    pub x: i32,
    pub y: i32,
    #[serde(flatten)]
    pub appearance: Appearance,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ObjectPlacement {
    pub name: String,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub angle: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RugPlacement {
    pub name: String,
    pub x: i32,
    pub y: i32,
}

/// Posters reuse `x` for the wall segment and `y` for the offset along it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PosterPlacement {
    pub name: String,
    pub x: usize,
    pub y: i32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoom {
    pub name: String,
    #[serde(default)]
    pub owner_id: Option<CharacterId>,
    #[serde(default)]
    pub tile: Option<String>,
    #[serde(default)]
    pub wall: Option<String>,
    #[serde(default)]
    pub characters: Vec<CharacterSnapshot>,
    #[serde(default)]
    pub objects: Vec<ObjectPlacement>,
    #[serde(default)]
    pub rugs: Vec<RugPlacement>,
    #[serde(default)]
    pub posters: Vec<PosterPlacement>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(default)]
    pub id: Option<CharacterId>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CharacterRef {
    pub id: CharacterId,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CharacterCell {
    pub id: CharacterId,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CharacterAppearance {
    pub id: CharacterId,
    #[serde(flatten)]
    pub appearance: Appearance,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatLine {
    pub id: CharacterId,
    pub message: String,
    #[serde(default)]
    pub x: Option<f32>,
    #[serde(default)]
    pub y: Option<f32>,
    #[serde(default)]
    pub colour: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RoomSettings {
    #[serde(default)]
    pub tile: Option<String>,
    #[serde(default)]
    pub wall: Option<String>,
}

/// Messages that mutate the joined room.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomMessage {
    AddCharacter(CharacterSnapshot),
    RemoveCharacter(CharacterRef),
    MoveCharacter(CharacterCell),
    CharacterSit(CharacterCell),
    CharacterAppearance(CharacterAppearance),
    Chat(ChatLine),
    AddObject(ObjectPlacement),
    RemoveObject(ObjectPlacement),
    AddRug(RugPlacement),
    RemoveRug(RugPlacement),
    AddPoster(PosterPlacement),
    RemovePoster(PosterPlacement),
    RoomSettings(RoomSettings),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    LoginResponse(LoginResponse),
    JoinRoom(JoinRoom),
    LeaveRoom,
    Room(RoomMessage),
}

impl ServerMessage {
    pub fn decode(raw: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingType)?
            .to_string();

        let message = match kind.as_str() {
            "login-response" => ServerMessage::LoginResponse(payload(&kind, value)?),
            "join-room" => ServerMessage::JoinRoom(payload(&kind, value)?),
            "leave-room" => ServerMessage::LeaveRoom,
            "add-character" => room(RoomMessage::AddCharacter(payload(&kind, value)?)),
            "remove-character" => room(RoomMessage::RemoveCharacter(payload(&kind, value)?)),
            "move-character" => room(RoomMessage::MoveCharacter(payload(&kind, value)?)),
            "character-sit" => room(RoomMessage::CharacterSit(payload(&kind, value)?)),
            "character-appearance" => {
                room(RoomMessage::CharacterAppearance(payload(&kind, value)?))
            }
            "chat" => room(RoomMessage::Chat(payload(&kind, value)?)),
            "add-object" => room(RoomMessage::AddObject(payload(&kind, value)?)),
            "remove-object" => room(RoomMessage::RemoveObject(payload(&kind, value)?)),
            "add-rug" => room(RoomMessage::AddRug(payload(&kind, value)?)),
            "remove-rug" => room(RoomMessage::RemoveRug(payload(&kind, value)?)),
            "add-poster" => room(RoomMessage::AddPoster(payload(&kind, value)?)),
            "remove-poster" => room(RoomMessage::RemovePoster(payload(&kind, value)?)),
            "room-settings" => room(RoomMessage::RoomSettings(payload(&kind, value)?)),
            _ => return Err(ProtocolError::UnknownType(kind)),
        };
        Ok(message)
    }
}

fn room(message: RoomMessage) -> ServerMessage {
    ServerMessage::Room(message)
}

fn payload<T: DeserializeOwned>(kind: &str, value: Value) -> Result<T, ProtocolError> {
    serde_path_to_error::deserialize(value).map_err(|error| ProtocolError::InvalidPayload {
        kind: kind.to_string(),
        path: error.path().to_string(),
        message: error.inner().to_string(),
    })
}

/// Commands this client sends to the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientCommand {
    Walk { x: i32, y: i32 },
    AddObject { name: String, x: i32, y: i32, angle: usize },
    AddRug { name: String, x: i32, y: i32 },
    PickUpObject { name: String, x: i32, y: i32 },
    PickUpRug { name: String, x: i32, y: i32 },
    RotateObject { name: String, x: i32, y: i32 },
    RemoveObject { name: String, x: i32, y: i32 },
    RemoveRug { name: String, x: i32, y: i32 },
    Chat { message: String },
}

impl ClientCommand {
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClientCommand::Walk { .. } => "walk",
            ClientCommand::AddObject { .. } => "add-object",
            ClientCommand::AddRug { .. } => "add-rug",
            ClientCommand::PickUpObject { .. } => "pick-up-object",
            ClientCommand::PickUpRug { .. } => "pick-up-rug",
            ClientCommand::RotateObject { .. } => "rotate-object",
            ClientCommand::RemoveObject { .. } => "remove-object",
            ClientCommand::RemoveRug { .. } => "remove-rug",
            ClientCommand::Chat { .. } => "chat",
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_room_messages_by_type() {
        let message = ServerMessage::decode(
            r#"{"type":"move-character","id":4,"x":2,"y":5}"#,
        )
        .expect("decode");
        assert_eq!(
            message,
            ServerMessage::Room(RoomMessage::MoveCharacter(CharacterCell {
                id: CharacterId(4),
                x: 2,
                y: 5
            }))
        );
    }

    #[test]
    fn add_character_carries_flattened_appearance() {
        let value = json!({
            "type": "add-character",
            "id": 7,
            "username": "mel",
            "x": 1,
            "y": 2,
            "isFemale": true,
            "hairIndex": 3,
            "shirtColour": 16711680
        });
        let ServerMessage::Room(RoomMessage::AddCharacter(snapshot)) =
            ServerMessage::from_value(value).expect("decode")
        else {
            panic!("expected add-character");
        };
        assert_eq!(snapshot.username, "mel");
        assert!(snapshot.appearance.is_female);
        assert_eq!(snapshot.appearance.hair_index, 3);
        assert_eq!(snapshot.appearance.shirt_colour, 16711680);
        assert_eq!(snapshot.appearance.pants_index, 0);
    }

    #[test]
    fn join_room_defaults_missing_lists() {
        let message = ServerMessage::from_value(json!({
            "type": "join-room",
            "name": "studio_a",
            "ownerId": 3,
            "objects": [{ "name": "lamp", "x": 1, "y": 1 }]
        }))
        .expect("decode");
        let ServerMessage::JoinRoom(join) = message else {
            panic!("expected join-room");
        };
        assert_eq!(join.owner_id, Some(CharacterId(3)));
        assert!(join.characters.is_empty());
        assert_eq!(join.objects[0].angle, 0);
    }

    #[test]
    fn rejects_malformed_untyped_and_unknown_messages() {
        assert!(matches!(
            ServerMessage::decode("{not json"),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            ServerMessage::decode(r#"{"id": 1}"#),
            Err(ProtocolError::MissingType)
        ));
        assert!(matches!(
            ServerMessage::decode(r#"{"type": "teleport"}"#),
            Err(ProtocolError::UnknownType(kind)) if kind == "teleport"
        ));
    }

    #[test]
    fn invalid_payload_reports_field_path() {
        let error = ServerMessage::from_value(json!({
            "type": "join-room",
            "name": "studio_a",
            "objects": [{ "name": "lamp", "x": "left", "y": 1 }]
        }))
        .expect_err("bad payload");
        match error {
            ProtocolError::InvalidPayload { kind, path, .. } => {
                assert_eq!(kind, "join-room");
                assert_eq!(path, "objects[0].x");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn commands_serialize_with_kebab_case_type() {
        let command = ClientCommand::PickUpObject {
            name: "coke_couch".to_string(),
            x: 3,
            y: 4,
        };
        let value: Value =
            serde_json::from_str(&command.to_json().expect("encode")).expect("json");
        assert_eq!(
            value,
            json!({ "type": "pick-up-object", "name": "coke_couch", "x": 3, "y": 4 })
        );
        assert_eq!(command.kind(), "pick-up-object");

        let walk = serde_json::to_value(ClientCommand::Walk { x: 1, y: 2 }).expect("encode");
        assert_eq!(walk, json!({ "type": "walk", "x": 1, "y": 2 }));
    }
}
