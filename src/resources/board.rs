//! Grid model.
//!
//! [`Board`] owns cell geometry and occupancy. Each cell has a background tile
//! slot and a single occupant slot, both holding object ids only; the objects
//! themselves live in the ECS world. Every mutating method checks bounds
//! before touching anything and leaves the board unchanged on error.
//!
//! The board does not know about [`GridPosition`](crate::components::gridposition::GridPosition);
//! use the wrappers in [`crate::systems::grid`] to keep the cached positions in sync.

use bevy_ecs::prelude::Resource;
use log::error;

use crate::components::gridposition::Coord;
use crate::components::objectid::ObjectId;
use crate::error::BoardError;

/// Background tile reference held by a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRef {
    pub id: ObjectId,
    pub walkable: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cell {
    pub tile: Option<TileRef>,
    pub occupant: Option<ObjectId>,
}

/// Largest number of cells a board may have.
pub const MAX_CELLS: usize = 1 << 20;

/// Cell count of a `width` x `height` board, if it fits under [`MAX_CELLS`].
/// Non-positive dimensions count as zero.
pub fn cell_count(width: i32, height: i32) -> Option<usize> {
    let width = usize::try_from(width.max(0)).ok()?;
    let height = usize::try_from(height.max(0)).ok()?;
    width.checked_mul(height).filter(|&n| n <= MAX_CELLS)
}

#[derive(Resource, Debug, Clone)]
pub struct Board {
    width: i32,
    height: i32,
    cells: Vec<Cell>,
}

impl Board {
    /// Create an empty board. Non-positive dimensions yield an empty grid.
    ///
    /// A board over [`MAX_CELLS`] cells is refused with
    /// [`BoardError::TooLarge`].
    pub fn try_new(width: i32, height: i32) -> Result<Self, BoardError> {
        let cells = cell_count(width, height).ok_or(BoardError::TooLarge { width, height })?;
        Ok(Self {
            width: width.max(0),
            height: height.max(0),
            cells: vec![Cell::default(); cells],
        })
    }

    /// Like [`try_new`](Board::try_new), but an oversized board is logged
    /// and replaced by an empty one.
    pub fn new(width: i32, height: i32) -> Self {
        Self::try_new(width, height).unwrap_or_else(|err| {
            error!("{err}; using an empty board");
            Self {
                width: 0,
                height: 0,
                cells: Vec::new(),
            }
        })
    }

    pub fn dimensions(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, at: Coord) -> bool {
        at.x >= 0 && at.y >= 0 && at.x < self.width && at.y < self.height
    }

    fn index(&self, at: Coord) -> Result<usize, BoardError> {
        if self.in_bounds(at) {
            Ok((at.y * self.width + at.x) as usize)
        } else {
            Err(BoardError::OutOfBounds(at))
        }
    }

    pub fn cell(&self, at: Coord) -> Option<&Cell> {
        self.index(at).ok().map(|i| &self.cells[i])
    }

    pub fn occupant_at(&self, at: Coord) -> Option<ObjectId> {
        self.cell(at).and_then(|c| c.occupant)
    }

    pub fn tile_at(&self, at: Coord) -> Option<TileRef> {
        self.cell(at).and_then(|c| c.tile)
    }

    /// False only when a tile is present and marked not walkable.
    pub fn is_walkable(&self, at: Coord) -> bool {
        self.tile_at(at).is_none_or(|t| t.walkable)
    }

    /// Put `id` into the empty occupant slot at `at`.
    pub fn place(&mut self, id: ObjectId, at: Coord) -> Result<(), BoardError> {
        let i = self.index(at)?;
        let cell = &mut self.cells[i];
        if cell.occupant.is_some() {
            return Err(BoardError::Occupied(at));
        }
        cell.occupant = Some(id);
        Ok(())
    }

    /// Clear the occupant slot at `at`, returning what was there.
    pub fn remove(&mut self, at: Coord) -> Result<Option<ObjectId>, BoardError> {
        let i = self.index(at)?;
        Ok(self.cells[i].occupant.take())
    }

    /// Atomically move `id` from `from` to `to`.
    ///
    /// Fails with [`BoardError::Occupied`] if `to` already has an occupant and
    /// with [`BoardError::UnknownObject`] if `id` is not at `from`; in both
    /// cases nothing changes.
    pub fn move_occupant(&mut self, id: ObjectId, from: Coord, to: Coord) -> Result<(), BoardError> {
        let src = self.index(from)?;
        let dst = self.index(to)?;
        if self.cells[src].occupant != Some(id) {
            return Err(BoardError::UnknownObject(id.0));
        }
        if src == dst {
            return Ok(());
        }
        if self.cells[dst].occupant.is_some() {
            return Err(BoardError::Occupied(to));
        }
        self.cells[src].occupant = None;
        self.cells[dst].occupant = Some(id);
        Ok(())
    }

    pub fn place_tile(&mut self, tile: TileRef, at: Coord) -> Result<(), BoardError> {
        let i = self.index(at)?;
        let cell = &mut self.cells[i];
        if cell.tile.is_some() {
            return Err(BoardError::Occupied(at));
        }
        cell.tile = Some(tile);
        Ok(())
    }

    pub fn remove_tile(&mut self, at: Coord) -> Result<Option<TileRef>, BoardError> {
        let i = self.index(at)?;
        Ok(self.cells[i].tile.take())
    }

    /// Iterate over `(coord, occupant)` for every occupied cell.
    pub fn occupants(&self) -> impl Iterator<Item = (Coord, ObjectId)> + '_ {
        self.cells.iter().enumerate().filter_map(move |(i, cell)| {
            let i = i as i32;
            cell.occupant
                .map(|id| (Coord::new(i % self.width, i / self.width), id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(x: i32, y: i32) -> Coord {
        Coord::new(x, y)
    }

    #[test]
    fn test_place_and_query() {
        let mut board = Board::new(4, 3);
        assert_eq!(board.dimensions(), (4, 3));
        board.place(ObjectId(1), c(2, 1)).unwrap();
        assert_eq!(board.occupant_at(c(2, 1)), Some(ObjectId(1)));
        assert_eq!(board.occupant_at(c(1, 2)), None);
        assert_eq!(board.place(ObjectId(2), c(2, 1)), Err(BoardError::Occupied(c(2, 1))));
    }

    #[test]
    fn test_bounds_checked_before_mutation() {
        let mut board = Board::new(4, 3);
        assert!(!board.in_bounds(c(4, 0)));
        assert!(!board.in_bounds(c(0, -1)));
        assert_eq!(board.place(ObjectId(1), c(4, 0)), Err(BoardError::OutOfBounds(c(4, 0))));
        assert_eq!(board.occupants().count(), 0);
    }

    #[test]
    fn test_move_is_atomic() {
        let mut board = Board::new(4, 4);
        board.place(ObjectId(1), c(0, 0)).unwrap();
        board.place(ObjectId(2), c(1, 1)).unwrap();

        assert_eq!(
            board.move_occupant(ObjectId(1), c(0, 0), c(1, 1)),
            Err(BoardError::Occupied(c(1, 1)))
        );
        assert_eq!(board.occupant_at(c(0, 0)), Some(ObjectId(1)));
        assert_eq!(board.occupant_at(c(1, 1)), Some(ObjectId(2)));

        board.move_occupant(ObjectId(1), c(0, 0), c(3, 3)).unwrap();
        assert_eq!(board.occupant_at(c(0, 0)), None);
        assert_eq!(board.occupant_at(c(3, 3)), Some(ObjectId(1)));
    }

    #[test]
    fn test_move_requires_id_at_origin() {
        let mut board = Board::new(4, 4);
        board.place(ObjectId(1), c(0, 0)).unwrap();
        assert_eq!(
            board.move_occupant(ObjectId(9), c(0, 0), c(1, 0)),
            Err(BoardError::UnknownObject(9))
        );
    }

    #[test]
    fn test_tiles_are_separate_from_occupants() {
        let mut board = Board::new(2, 2);
        let water = TileRef {
            id: ObjectId(5),
            walkable: false,
        };
        board.place_tile(water, c(1, 1)).unwrap();
        board.place(ObjectId(6), c(1, 1)).unwrap();
        assert_eq!(board.tile_at(c(1, 1)), Some(water));
        assert!(!board.is_walkable(c(1, 1)));
        assert!(board.is_walkable(c(0, 0)));
        assert_eq!(board.remove_tile(c(1, 1)), Ok(Some(water)));
        assert_eq!(board.occupant_at(c(1, 1)), Some(ObjectId(6)));
    }

    #[test]
    fn test_oversized_boards_are_refused() {
        assert_eq!(
            Board::try_new(70_000, 70_000).map(|b| b.dimensions()),
            Err(BoardError::TooLarge {
                width: 70_000,
                height: 70_000
            })
        );
        assert!(Board::try_new(i32::MAX, 2).is_err());
        assert_eq!(Board::try_new(1024, 1024).map(|b| b.dimensions()), Ok((1024, 1024)));
        assert_eq!(Board::try_new(-3, 5).map(|b| b.dimensions()), Ok((0, 5)));

        let fallback = Board::new(70_000, 70_000);
        assert_eq!(fallback.dimensions(), (0, 0));
        assert!(!fallback.in_bounds(c(0, 0)));
        assert_eq!(fallback.occupants().count(), 0);
    }

    #[test]
    fn test_occupants_iterator_reports_coords() {
        let mut board = Board::new(3, 3);
        board.place(ObjectId(1), c(2, 0)).unwrap();
        board.place(ObjectId(2), c(0, 2)).unwrap();
        let all: Vec<_> = board.occupants().collect();
        assert_eq!(all, vec![(c(2, 0), ObjectId(1)), (c(0, 2), ObjectId(2))]);
    }
}
