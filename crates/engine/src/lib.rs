pub mod app;
pub mod config;
pub mod content;
pub mod protocol;
pub mod room;
pub mod spatial;

pub use app::{InputContext, Panel, PointerInput, Session, SessionEvent, TickClock};
pub use config::CoreConfig;
pub use content::{Catalog, CatalogError, NameProblem};
pub use protocol::{ClientCommand, ProtocolError, RoomMessage, ServerMessage};
pub use room::{
    CharacterId, DrawEntry, EntityId, ObjectAction, PlaceableKind, PlacementState, Room,
    RoomError, RoomEvent, SpriteRef,
};
pub use spatial::{GridPos, IsoTransform, Vec2};
