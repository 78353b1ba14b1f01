//! Board coordinates and the cached per-object position.
//!
//! [`GridPosition`] is a lookup-only mirror of the occupancy kept by
//! [`Board`](crate::resources::board::Board). It is written only by the grid
//! wrappers in [`crate::systems::grid`], in the same call that mutates the
//! board, so the two views never diverge.

use std::fmt;

use bevy_ecs::prelude::Component;
use serde::{Deserialize, Serialize};

/// Integer cell coordinate on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Chebyshev distance (king moves).
    pub fn chebyshev(self, other: Coord) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }
}

impl From<(i32, i32)> for Coord {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Cached board position of an object.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridPosition {
    pub pos: Coord,
}

impl GridPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self {
            pos: Coord::new(x, y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_and_chebyshev() {
        let c = Coord::new(3, 1).offset(-1, 2);
        assert_eq!(c, Coord::new(2, 3));
        assert_eq!(Coord::new(0, 0).chebyshev(Coord::new(2, -5)), 5);
    }

    #[test]
    fn test_display() {
        assert_eq!(Coord::new(4, 7).to_string(), "(4, 7)");
    }
}
