use tracing::debug;

use super::entity::{Entity, EntityId, EntityKind};
use super::registry::EntityRegistry;
use crate::protocol::ClientCommand;
use crate::spatial::GridPos;

/// Entity floating under the pointer. `previous` is where it was committed
/// before the move started, with the angle it had there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ghost {
    pub entity: EntityId,
    pub previous: Option<(GridPos, usize)>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlacementState {
    #[default]
    Idle,
    Moving(Ghost),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancellation {
    pub entity: EntityId,
    /// Cell the entity went back to; `None` means it is unplaced again.
    pub restored: Option<GridPos>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlacementOutcome {
    Committed {
        entity: EntityId,
        commands: Vec<ClientCommand>,
    },
    Cancelled(Cancellation),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RotateOutcome {
    /// Applied; the command is `None` for a ghost the server does not know yet.
    Rotated(Option<ClientCommand>),
    Blocked,
    NotRotatable,
}

/// One-at-a-time pick-up/drop/rotate transaction for furniture and rugs.
#[derive(Debug, Default)]
pub struct PlacementController {
    state: PlacementState,
}

impl PlacementController {
    pub fn state(&self) -> PlacementState {
        self.state
    }

    pub fn ghost(&self) -> Option<EntityId> {
        match self.state {
            PlacementState::Moving(ghost) => Some(ghost.entity),
            PlacementState::Idle => None,
        }
    }

    pub fn is_moving(&self) -> bool {
        matches!(self.state, PlacementState::Moving(_))
    }

    /// Lifts `id` out of the grid and attaches it to the pointer. Any placement
    /// already in progress is cancelled first and reported back.
    pub fn begin(&mut self, registry: &mut EntityRegistry, id: EntityId) -> Option<Cancellation> {
        let previous = match registry.get(id) {
            Some(entity) if entity.is_placeable() => entity.position.map(|cell| {
                let angle = entity.as_furniture().map_or(0, |furniture| furniture.angle);
                (cell, angle)
            }),
            _ => {
                debug!(entity = id.0, "placement_not_placeable");
                return None;
            }
        };
        let cancelled = match self.state {
            PlacementState::Moving(ghost) if ghost.entity == id => return None,
            PlacementState::Moving(_) => self.cancel(registry),
            PlacementState::Idle => None,
        };
        registry.set_edit(id, true);
        self.state = PlacementState::Moving(Ghost {
            entity: id,
            previous,
        });
        cancelled
    }

    /// Follows the pointer. Cells outside the room leave the ghost where it was.
    pub fn track_pointer(&mut self, registry: &mut EntityRegistry, cell: Option<GridPos>) {
        let PlacementState::Moving(ghost) = self.state else {
            return;
        };
        let Some(cell) = cell.filter(|cell| registry.grid().in_bounds(*cell)) else {
            return;
        };
        if registry.get(ghost.entity).and_then(|entity| entity.position) != Some(cell) {
            registry.set_position(ghost.entity, Some(cell));
        }
    }

    /// Drops the ghost where it is. A blocked or off-room drop cancels instead.
    pub fn commit(&mut self, registry: &mut EntityRegistry) -> Option<PlacementOutcome> {
        let PlacementState::Moving(ghost) = self.state else {
            return None;
        };
        let Some(entity) = registry.get(ghost.entity) else {
            self.state = PlacementState::Idle;
            return None;
        };
        let Some(cell) = entity.position else {
            return self.cancel(registry).map(PlacementOutcome::Cancelled);
        };
        if !registry.can_occupy(ghost.entity, cell, None) {
            debug!(entity = ghost.entity.0, x = cell.x, y = cell.y, "placement_blocked");
            return self.cancel(registry).map(PlacementOutcome::Cancelled);
        }

        let commands = commit_commands(entity, cell, ghost.previous);
        registry.set_edit(ghost.entity, false);
        self.state = PlacementState::Idle;
        Some(PlacementOutcome::Committed {
            entity: ghost.entity,
            commands,
        })
    }

    /// Puts the ghost back where it came from, or leaves it unplaced.
    pub fn cancel(&mut self, registry: &mut EntityRegistry) -> Option<Cancellation> {
        let PlacementState::Moving(ghost) = self.state else {
            return None;
        };
        self.state = PlacementState::Idle;
        match ghost.previous {
            Some((cell, angle)) => {
                registry.set_angle(ghost.entity, angle);
                registry.set_position(ghost.entity, Some(cell));
            }
            None => {
                registry.set_position(ghost.entity, None);
            }
        }
        registry.set_edit(ghost.entity, false);
        Some(Cancellation {
            entity: ghost.entity,
            restored: ghost.previous.map(|(cell, _)| cell),
        })
    }

    /// Advances furniture to its next declared orientation. Committed furniture
    /// only rotates when the turned footprint fits; otherwise nothing changes.
    pub fn rotate(&mut self, registry: &mut EntityRegistry, id: EntityId) -> RotateOutcome {
        let Some(entity) = registry.get(id) else {
            return RotateOutcome::NotRotatable;
        };
        let Some(furniture) = entity.as_furniture() else {
            return RotateOutcome::NotRotatable;
        };
        let next = furniture.next_angle();
        let name = furniture.name.clone();

        if self.ghost() == Some(id) {
            registry.set_angle(id, next);
            return RotateOutcome::Rotated(None);
        }

        let Some(cell) = entity.position else {
            return RotateOutcome::NotRotatable;
        };
        if !registry.can_occupy(id, cell, Some(next)) {
            debug!(entity = id.0, angle = next, "rotation_blocked");
            return RotateOutcome::Blocked;
        }
        registry.set_angle(id, next);
        RotateOutcome::Rotated(Some(ClientCommand::RotateObject {
            name,
            x: cell.x,
            y: cell.y,
        }))
    }

    /// Drops the transaction if its entity disappeared underneath it.
    pub fn forget(&mut self, id: EntityId) {
        if self.ghost() == Some(id) {
            self.state = PlacementState::Idle;
        }
    }
}

fn commit_commands(
    entity: &Entity,
    cell: GridPos,
    previous: Option<(GridPos, usize)>,
) -> Vec<ClientCommand> {
    let mut commands = Vec::new();
    match &entity.kind {
        EntityKind::Furniture(furniture) => {
            if previous == Some((cell, furniture.angle)) {
                return commands;
            }
            if let Some((old, _)) = previous {
                commands.push(ClientCommand::PickUpObject {
                    name: furniture.name.clone(),
                    x: old.x,
                    y: old.y,
                });
            }
            commands.push(ClientCommand::AddObject {
                name: furniture.name.clone(),
                x: cell.x,
                y: cell.y,
                angle: furniture.angle,
            });
        }
        EntityKind::Rug(rug) => {
            if let Some((old, _)) = previous {
                if old == cell {
                    return commands;
                }
                commands.push(ClientCommand::PickUpRug {
                    name: rug.name.clone(),
                    x: old.x,
                    y: old.y,
                });
            }
            commands.push(ClientCommand::AddRug {
                name: rug.name.clone(),
                x: cell.x,
                y: cell.y,
            });
        }
        EntityKind::Character(_) | EntityKind::Poster(_) => {}
    }
    commands
}
