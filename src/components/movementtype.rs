//! Movement patterns for pieces.
//!
//! [`MovementType`] is a closed set of six geometric rules plus one open
//! extension point, [`MovementType::Custom`], which hands the decision to the
//! piece's own behavior task (see [`crate::systems::movement`]).
//!
//! The geometry here is pure: callers pass a [`Surroundings`] view so the rules
//! can be tested without a world.

use std::fmt;
use std::str::FromStr;

use arrayvec::ArrayVec;
use bevy_ecs::prelude::Component;
use serde::{Deserialize, Serialize};

use crate::components::gridposition::Coord;
use crate::components::piececolor::PieceColor;
use crate::error::MoveError;

const KNIGHT_OFFSETS: [(i32, i32); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

const KING_OFFSETS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Read-only view of the board used by the geometric rules.
pub trait Surroundings {
    /// Board height, used for the black pawn start rank.
    fn height(&self) -> i32;
    fn is_occupied(&self, at: Coord) -> bool;
    /// True if `at` holds a piece of a different color than `color`.
    fn is_enemy_piece(&self, at: Coord, color: PieceColor) -> bool;
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    Knight,
    Rook,
    Bishop,
    Queen,
    King,
    Pawn,
    Custom,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Knight => "knight",
            MovementType::Rook => "rook",
            MovementType::Bishop => "bishop",
            MovementType::Queen => "queen",
            MovementType::King => "king",
            MovementType::Pawn => "pawn",
            MovementType::Custom => "custom",
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, MovementType::Custom)
    }

    /// Evaluate the geometric rule for a predefined pattern.
    ///
    /// Bounds, friendly fire and the `from == to` case are checked by the
    /// validator before this is called. Always false for `Custom`.
    pub fn allows(
        &self,
        from: Coord,
        to: Coord,
        color: Option<PieceColor>,
        board: &impl Surroundings,
    ) -> bool {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        match self {
            MovementType::Knight => {
                let (ax, ay) = (dx.abs(), dy.abs());
                (ax == 1 && ay == 2) || (ax == 2 && ay == 1)
            }
            MovementType::Rook => is_straight(dx, dy) && path_is_clear(from, to, board),
            MovementType::Bishop => is_diagonal(dx, dy) && path_is_clear(from, to, board),
            MovementType::Queen => {
                (is_straight(dx, dy) || is_diagonal(dx, dy)) && path_is_clear(from, to, board)
            }
            MovementType::King => from.chebyshev(to) == 1,
            MovementType::Pawn => pawn_allows(from, to, color, board),
            MovementType::Custom => false,
        }
    }

    /// Cells worth probing when enumerating moves for this pattern.
    ///
    /// Sliding pieces return the full rays to the board edge; the validator
    /// filters them through [`MovementType::allows`].
    pub fn candidates(&self, from: Coord, width: i32, height: i32) -> Vec<Coord> {
        let in_bounds = |c: &Coord| c.x >= 0 && c.y >= 0 && c.x < width && c.y < height;
        match self {
            MovementType::Knight => offsets(from, &KNIGHT_OFFSETS)
                .into_iter()
                .filter(in_bounds)
                .collect(),
            MovementType::King => offsets(from, &KING_OFFSETS)
                .into_iter()
                .filter(in_bounds)
                .collect(),
            MovementType::Pawn => [(0, 1), (0, 2), (1, 1), (-1, 1), (0, -1), (0, -2), (1, -1), (-1, -1)]
                .iter()
                .map(|&(dx, dy)| from.offset(dx, dy))
                .filter(in_bounds)
                .collect(),
            MovementType::Rook | MovementType::Bishop | MovementType::Queen => {
                let mut cells = Vec::new();
                for &(dx, dy) in KING_OFFSETS.iter() {
                    let mut c = from.offset(dx, dy);
                    while in_bounds(&c) {
                        cells.push(c);
                        c = c.offset(dx, dy);
                    }
                }
                cells
            }
            MovementType::Custom => Vec::new(),
        }
    }
}

fn offsets(from: Coord, table: &[(i32, i32); 8]) -> ArrayVec<Coord, 8> {
    table.iter().map(|&(dx, dy)| from.offset(dx, dy)).collect()
}

fn is_straight(dx: i32, dy: i32) -> bool {
    (dx == 0) != (dy == 0)
}

fn is_diagonal(dx: i32, dy: i32) -> bool {
    dx != 0 && dx.abs() == dy.abs()
}

/// Every cell strictly between `from` and `to` is empty.
///
/// Only meaningful for straight or diagonal lines.
fn path_is_clear(from: Coord, to: Coord, board: &impl Surroundings) -> bool {
    let step_x = (to.x - from.x).signum();
    let step_y = (to.y - from.y).signum();
    let mut c = from.offset(step_x, step_y);
    while c != to {
        if board.is_occupied(c) {
            return false;
        }
        c = c.offset(step_x, step_y);
    }
    true
}

fn pawn_allows(from: Coord, to: Coord, color: Option<PieceColor>, board: &impl Surroundings) -> bool {
    let Some(color) = color else {
        return false;
    };
    let Some(forward) = color.forward() else {
        return false;
    };
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let start_rank = if forward > 0 { 1 } else { board.height() - 2 };

    if dx == 0 && dy == forward {
        return !board.is_occupied(to);
    }
    if dx == 0 && dy == 2 * forward && from.y == start_rank {
        return !board.is_occupied(from.offset(0, forward)) && !board.is_occupied(to);
    }
    if dx.abs() == 1 && dy == forward {
        return board.is_enemy_piece(to, color);
    }
    false
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = MoveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "knight" => Ok(MovementType::Knight),
            "rook" => Ok(MovementType::Rook),
            "bishop" => Ok(MovementType::Bishop),
            "queen" => Ok(MovementType::Queen),
            "king" => Ok(MovementType::King),
            "pawn" => Ok(MovementType::Pawn),
            "custom" => Ok(MovementType::Custom),
            other => Err(MoveError::InvalidMovementPattern(other.to_string())),
        }
    }
}
