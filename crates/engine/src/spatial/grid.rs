use thiserror::Error;
use tracing::debug;

use super::GridPos;
use crate::room::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Footprint {
    pub anchor: GridPos,
    pub width: u32,
    pub height: u32,
}

impl Footprint {
    pub fn single(anchor: GridPos) -> Self {
        Self {
            anchor,
            width: 1,
            height: 1,
        }
    }

    pub fn new(anchor: GridPos, width: u32, height: u32) -> Self {
        Self {
            anchor,
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Farthest occupied cell, which decides paint depth.
    pub fn far_corner(&self) -> GridPos {
        let (dx, dy) = self.extent();
        self.anchor.offset(dx, dy)
    }

    /// `None` when the footprint would run past the `i32` grid range.
    pub fn checked_far_corner(&self) -> Option<GridPos> {
        let (dx, dy) = self.extent();
        self.anchor.checked_offset(dx, dy)
    }

    fn extent(&self) -> (i32, i32) {
        let span = |size: u32| i32::try_from(size.saturating_sub(1)).unwrap_or(i32::MAX);
        (span(self.width), span(self.height))
    }

    pub fn contains(&self, cell: GridPos) -> bool {
        let far = self.far_corner();
        cell.x >= self.anchor.x && cell.x <= far.x && cell.y >= self.anchor.y && cell.y <= far.y
    }

    pub fn cells(&self) -> impl Iterator<Item = GridPos> {
        let anchor = self.anchor;
        let (last_x, last_y) = self.extent();
        (0..=last_y).flat_map(move |dy| (0..=last_x).map(move |dx| anchor.offset(dx, dy)))
    }
}

/// Rugs lie on the floor layer so furniture and characters can stand on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Floor,
    Solid,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Cell {
    floor: Option<EntityId>,
    solid: Option<EntityId>,
}

impl Cell {
    fn slot(&self, layer: Layer) -> Option<EntityId> {
        match layer {
            Layer::Floor => self.floor,
            Layer::Solid => self.solid,
        }
    }

    fn slot_mut(&mut self, layer: Layer) -> &mut Option<EntityId> {
        match layer {
            Layer::Floor => &mut self.floor,
            Layer::Solid => &mut self.solid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("blocked map has no rows")]
    Empty,
    #[error("blocked map row {row} has {actual} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyGrid {
    width: u32,
    height: u32,
    blocked: Vec<bool>,
    cells: Vec<Cell>,
}

impl OccupancyGrid {
    pub fn new(width: u32, height: u32) -> Self {
        let count = width as usize * height as usize;
        Self {
            width,
            height,
            blocked: vec![false; count],
            cells: vec![Cell::default(); count],
        }
    }

    /// Builds a grid from rows of the room's base map, where any non-zero cell is blocked.
    pub fn from_blocked_rows(rows: &[Vec<u8>]) -> Result<Self, GridError> {
        let expected = rows.first().map(Vec::len).ok_or(GridError::Empty)?;
        if expected == 0 {
            return Err(GridError::Empty);
        }
        let mut blocked = Vec::with_capacity(expected * rows.len());
        for (row, cells) in rows.iter().enumerate() {
            if cells.len() != expected {
                return Err(GridError::RaggedRow {
                    row,
                    expected,
                    actual: cells.len(),
                });
            }
            blocked.extend(cells.iter().map(|cell| *cell != 0));
        }
        let count = blocked.len();
        Ok(Self {
            width: expected as u32,
            height: rows.len() as u32,
            blocked,
            cells: vec![Cell::default(); count],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn in_bounds(&self, cell: GridPos) -> bool {
        self.index_of(cell).is_some()
    }

    /// Whether every cell of the footprint lies inside the room.
    pub fn contains_footprint(&self, footprint: Footprint) -> bool {
        footprint
            .checked_far_corner()
            .is_some_and(|far| self.in_bounds(footprint.anchor) && self.in_bounds(far))
    }

    fn index_of(&self, cell: GridPos) -> Option<usize> {
        if cell.x < 0 || cell.y < 0 {
            return None;
        }
        let (x, y) = (cell.x as u32, cell.y as u32);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    /// Out-of-bounds cells count as statically blocked.
    pub fn is_static_blocked(&self, cell: GridPos) -> bool {
        self.index_of(cell)
            .and_then(|index| self.blocked.get(index).copied())
            .unwrap_or(true)
    }

    pub fn occupant(&self, cell: GridPos, layer: Layer) -> Option<EntityId> {
        self.index_of(cell)
            .and_then(|index| self.cells.get(index))
            .and_then(|slots| slots.slot(layer))
    }

    /// Claims every vacant in-bounds cell of the footprint and returns how many were claimed.
    /// Cells held by another entity are left alone so that `remove` exactly undoes `place`.
    pub fn place(&mut self, id: EntityId, layer: Layer, footprint: Footprint) -> usize {
        let mut claimed = 0;
        for cell in footprint.cells() {
            let Some(index) = self.index_of(cell) else {
                continue;
            };
            let slot = self.cells[index].slot_mut(layer);
            match *slot {
                None => {
                    *slot = Some(id);
                    claimed += 1;
                }
                Some(holder) if holder == id => {}
                Some(holder) => {
                    debug!(
                        entity = id.0,
                        holder = holder.0,
                        x = cell.x,
                        y = cell.y,
                        "grid_cell_already_held"
                    );
                }
            }
        }
        claimed
    }

    /// Clears the footprint cells still held by `id` and returns how many were cleared.
    pub fn remove(&mut self, id: EntityId, layer: Layer, footprint: Footprint) -> usize {
        let mut cleared = 0;
        for cell in footprint.cells() {
            let Some(index) = self.index_of(cell) else {
                continue;
            };
            let slot = self.cells[index].slot_mut(layer);
            if *slot == Some(id) {
                *slot = None;
                cleared += 1;
            }
        }
        cleared
    }

    /// True when every cell is in bounds, not statically blocked, and free on `layer`
    /// apart from cells held by `ignore`.
    pub fn is_area_clear(
        &self,
        layer: Layer,
        footprint: Footprint,
        ignore: Option<EntityId>,
    ) -> bool {
        footprint.cells().all(|cell| {
            if self.is_static_blocked(cell) {
                return false;
            }
            match self.occupant(cell, layer) {
                None => true,
                Some(holder) => Some(holder) == ignore,
            }
        })
    }

    pub fn occupied_count(&self, layer: Layer) -> usize {
        self.cells
            .iter()
            .filter(|cell| cell.slot(layer).is_some())
            .count()
    }

    pub fn cells_held_by(&self, id: EntityId) -> Vec<GridPos> {
        let mut held = Vec::new();
        for (index, cell) in self.cells.iter().enumerate() {
            if cell.floor == Some(id) || cell.solid == Some(id) {
                let x = (index % self.width as usize) as i32;
                let y = (index / self.width as usize) as i32;
                held.push(GridPos::new(x, y));
            }
        }
        held
    }

    pub fn clear_occupants(&mut self) {
        self.cells.iter_mut().for_each(|cell| *cell = Cell::default());
    }
}
