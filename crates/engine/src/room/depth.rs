use super::entity::{Entity, EntityId, EntityKind};
use super::movement::MotionState;
use super::registry::EntityRegistry;
use crate::spatial::{GridPos, Layer};

/// Paint-order key. Field order is the comparison order: layer first, then the
/// far-corner depth, then `y`, then `x`, with the entity id as the last tie-break
/// so the order is total even for overlapping footprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DepthKey {
    pub layer: u8,
    pub depth: i64,
    pub y: i32,
    pub x: i32,
    pub id: EntityId,
}

impl DepthKey {
    pub fn of(entity: &Entity) -> Option<Self> {
        if let EntityKind::Poster(poster) = &entity.kind {
            return Some(Self {
                layer: 0,
                depth: poster.wall as i64,
                y: poster.offset,
                x: 0,
                id: entity.id,
            });
        }
        let footprint = entity.footprint()?;
        let layer = match entity.layer()? {
            Layer::Floor => 1,
            Layer::Solid => 2,
        };
        let far = footprint.far_corner();
        Some(Self {
            layer,
            depth: i64::from(far.x) + i64::from(far.y),
            y: footprint.anchor.y,
            x: footprint.anchor.x,
            id: entity.id,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawSlot {
    Entity(EntityId),
    /// Seat back painted over the host's sitters.
    SeatForeground { host: EntityId },
    /// Doorway cutout painted over whoever is passing through the exit.
    ExitForeground,
}

fn seat_of(entity: &Entity) -> Option<EntityId> {
    match entity.as_character()?.motion {
        MotionState::Sitting { seat } => Some(seat),
        _ => None,
    }
}

fn crosses_exit(entity: &Entity, exit: GridPos) -> bool {
    let Some(character) = entity.as_character() else {
        return false;
    };
    if entity.position == Some(exit) {
        return true;
    }
    matches!(&character.motion, MotionState::Walking(walk) if walk.origin == exit)
}

/// Orders every drawable entity back to front. Sitters follow their host
/// directly instead of taking their own depth slot.
pub fn sort_draw_order(registry: &EntityRegistry, exit: Option<GridPos>) -> Vec<DrawSlot> {
    let mut keyed = registry
        .iter()
        .filter(|entity| {
            seat_of(entity)
                .and_then(|seat| registry.get(seat))
                .is_none()
        })
        .filter_map(|entity| DepthKey::of(entity).map(|key| (key, entity)))
        .collect::<Vec<_>>();
    keyed.sort_by_key(|(key, _)| *key);

    let mut slots = Vec::with_capacity(keyed.len() + 1);
    for (_, entity) in keyed {
        slots.push(DrawSlot::Entity(entity.id));
        if let Some(furniture) = entity.as_furniture() {
            for sitter in &furniture.sitters {
                if registry.get(*sitter).is_some() {
                    slots.push(DrawSlot::Entity(*sitter));
                }
            }
            if furniture.foreground && !furniture.sitters.is_empty() {
                slots.push(DrawSlot::SeatForeground { host: entity.id });
            }
        }
        if exit.is_some_and(|exit| crosses_exit(entity, exit)) {
            slots.push(DrawSlot::ExitForeground);
        }
    }
    slots
}
