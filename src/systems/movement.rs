//! Movement validator.
//!
//! Decides whether a piece may move from one cell to another and applies
//! accepted moves. Checks run in a fixed order and the first failing check
//! is the rejection reason:
//!
//! 1. the mover exists, is an active piece and stands on `from`
//! 2. `to` is on the board and differs from `from`
//! 3. the movement pattern allows it (custom pieces ask their behavior)
//! 4. `to` does not hold a piece of the mover's color, is walkable, and is
//!    not held by a dying object
//!
//! An accepted move onto an empty cell is a plain grid move; onto an enemy
//! it goes to the collision resolver. Every outcome is queued to the mover
//! as a `move_accepted` or `move_rejected` event.
//!
//! A custom piece that moves itself from one of its own callbacks has
//! already made the decision its `move_request` would make, so step 3 is
//! skipped for it. The other steps still apply.
//!
//! Objects that are not pieces don't go through the validator. They move
//! with [`move_object`], which only needs the target to be free.

use bevy_ecs::prelude::*;
use log::debug;

use crate::behavior::MoveDecision;
use crate::components::category::Category;
use crate::components::gridposition::Coord;
use crate::components::movementtype::{MovementType, Surroundings};
use crate::components::objectid::ObjectId;
use crate::components::piececolor::PieceColor;
use crate::error::{BoardError, MoveError};
use crate::events::collision::{CollisionOutcome, CollisionTrigger, Contact};
use crate::events::pending::PendingEvent;
use crate::resources::board::Board;
use crate::resources::objectindex::ObjectIndex;
use crate::systems::registry::{self, ObjectSnapshot};
use crate::systems::{behavior, collision, grid};

#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    Moved { from: Coord, to: Coord },
    Collided(CollisionOutcome),
    Rejected(MoveError),
}

impl MoveOutcome {
    /// The validator accepted the move.
    ///
    /// A move onto an occupied cell is accepted and then handed to the
    /// collision resolver, which decides where the mover ends up. A blocked
    /// or cancelled collision leaves it on its origin; check [`arrived`]
    /// for that.
    ///
    /// [`arrived`]: MoveOutcome::arrived
    pub fn is_accepted(&self) -> bool {
        !matches!(self, MoveOutcome::Rejected(_))
    }

    /// The mover ended up on the target cell.
    pub fn arrived(&self) -> bool {
        matches!(
            self,
            MoveOutcome::Moved { .. }
                | MoveOutcome::Collided(CollisionOutcome::Captured { .. })
                | MoveOutcome::Collided(CollisionOutcome::Entered { .. })
        )
    }

    pub fn rejection(&self) -> Option<&MoveError> {
        match self {
            MoveOutcome::Rejected(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Who issued a move through [`move_object`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Issuer {
    Host,
    Behavior {
        id: ObjectId,
        callback: &'static str,
    },
}

impl Issuer {
    /// Whether a move of `mover` needs no `move_request` round trip.
    ///
    /// True when a behavior moves its own piece from anything but a query
    /// callback. Its task is checked out at that point, so asking it again
    /// would only fail as re-entrant.
    fn approves(self, mover: ObjectId) -> bool {
        match self {
            Issuer::Host => false,
            Issuer::Behavior { id, callback } => {
                id == mover && !matches!(callback, "move_request" | "get_valid_moves")
            }
        }
    }
}

/// Board seen through the world, for the geometric rules.
struct WorldView<'a>(&'a World);

impl Surroundings for WorldView<'_> {
    fn height(&self) -> i32 {
        self.0.resource::<Board>().height()
    }

    fn is_occupied(&self, at: Coord) -> bool {
        self.0.resource::<Board>().occupant_at(at).is_some()
    }

    fn is_enemy_piece(&self, at: Coord, color: PieceColor) -> bool {
        let Some(id) = self.0.resource::<Board>().occupant_at(at) else {
            return false;
        };
        let Some(entity) = self.0.resource::<ObjectIndex>().entity(id) else {
            return false;
        };
        self.0.get::<Category>(entity) == Some(&Category::Piece)
            && self.0.get::<PieceColor>(entity) != Some(&color)
    }
}

/// Validate and apply a move of piece `id` from `from` to `to`.
pub fn request_move(world: &mut World, id: ObjectId, from: Coord, to: Coord) -> MoveOutcome {
    apply_move(world, id, from, to, false)
}

fn apply_move(
    world: &mut World,
    id: ObjectId,
    from: Coord,
    to: Coord,
    self_approved: bool,
) -> MoveOutcome {
    let outcome = match check_move(world, id, from, to, self_approved) {
        Err(reason) => MoveOutcome::Rejected(reason),
        Ok(None) => match grid::move_object(world, id, from, to) {
            Ok(()) => MoveOutcome::Moved { from, to },
            Err(err) => MoveOutcome::Rejected(board_rejection(err, id, from)),
        },
        Ok(Some(defender)) => MoveOutcome::Collided(collision::resolve(
            world,
            id,
            defender,
            CollisionTrigger::Move { from, to },
        )),
    };

    match &outcome {
        MoveOutcome::Rejected(reason) => {
            debug!("move of {} {} -> {} rejected: {}", id, from, to, reason);
            behavior::queue_event(world, PendingEvent::move_rejected(id, from, to, reason.clone()));
        }
        accepted => {
            debug!("move of {} {} -> {}: {:?}", id, from, to, accepted);
            behavior::queue_event(world, PendingEvent::move_accepted(id, from, to));
        }
    }
    outcome
}

/// Run the validation steps without applying anything.
///
/// Returns the enemy occupant of `to`, if any. Custom pieces are asked
/// through their `move_request` callback, which may itself act on the world,
/// unless the move is `self_approved`.
pub(crate) fn check_move(
    world: &mut World,
    id: ObjectId,
    from: Coord,
    to: Coord,
    self_approved: bool,
) -> Result<Option<ObjectId>, MoveError> {
    let mover = check_origin(world, id, from)?;
    if to == from || !grid::in_bounds(world, to) {
        return Err(MoveError::OutOfBounds(to));
    }

    match mover.movement {
        None => {
            return Err(MoveError::InvalidMovementPattern("none".to_string()));
        }
        Some(MovementType::Custom) if self_approved => {}
        Some(MovementType::Custom) => {
            match behavior::ask_move_request(world, id, from, to)? {
                MoveDecision::Allow => {}
                MoveDecision::Reject => return Err(MoveError::IllegalMove { from, to }),
                MoveDecision::MoveList(cells) => {
                    if !cells.contains(&to) {
                        return Err(MoveError::IllegalMove { from, to });
                    }
                }
            }
            // the callback may have changed the board
            check_origin(world, id, from)?;
        }
        Some(pattern) => {
            if !pattern.allows(from, to, mover.color, &WorldView(world)) {
                return Err(MoveError::IllegalMove { from, to });
            }
        }
    }

    check_target(world, &mover, to)
}

fn check_origin(world: &World, id: ObjectId, from: Coord) -> Result<ObjectSnapshot, MoveError> {
    let Some(mover) = registry::snapshot(world, id) else {
        return Err(MoveError::UnknownObject(id.0));
    };
    if !mover.is_piece() {
        return Err(MoveError::NotAPiece(id.0));
    }
    if !mover.is_active() || grid::occupant_at(world, from) != Some(id) {
        return Err(MoveError::StaleOrigin { id: id.0, from });
    }
    Ok(mover)
}

fn check_target(
    world: &World,
    mover: &ObjectSnapshot,
    to: Coord,
) -> Result<Option<ObjectId>, MoveError> {
    let occupant = grid::occupant_at(world, to);
    let occupant_snapshot = occupant.and_then(|other| registry::snapshot(world, other));
    if let Some(other) = &occupant_snapshot {
        if other.color.is_some() && other.color == mover.color {
            return Err(MoveError::FriendlyFire(to));
        }
    }
    if !grid::is_walkable(world, to) {
        return Err(MoveError::Blocked(to));
    }
    if let Some(other) = &occupant_snapshot {
        if !other.is_active() {
            return Err(MoveError::Occupied(to));
        }
    }
    Ok(occupant)
}

fn board_rejection(err: BoardError, id: ObjectId, from: Coord) -> MoveError {
    match err {
        BoardError::OutOfBounds(at) => MoveError::OutOfBounds(at),
        BoardError::Occupied(at) => MoveError::Occupied(at),
        BoardError::UnknownObject(_)
        | BoardError::UnknownTemplate(_)
        | BoardError::TooLarge { .. } => {
            MoveError::StaleOrigin { id: id.0, from }
        }
    }
}

/// Cells the piece on `at` could legally move to. Advisory only.
pub fn valid_moves(world: &mut World, at: Coord) -> Vec<Coord> {
    let Some(id) = grid::occupant_at(world, at) else {
        return Vec::new();
    };
    let Some(piece) = registry::snapshot(world, id) else {
        return Vec::new();
    };
    if !piece.is_piece() || !piece.is_active() {
        return Vec::new();
    }
    match piece.movement {
        Some(MovementType::Custom) => behavior::ask_valid_moves(world, id, at),
        Some(pattern) => {
            let (width, height) = grid::dimensions(world);
            pattern
                .candidates(at, width, height)
                .into_iter()
                .filter(|&to| check_move(world, id, at, to, false).is_ok())
                .collect()
        }
        None => Vec::new(),
    }
}

/// Move whatever stands on `from` to `to`.
///
/// Pieces are validated with [`request_move`]. Other movers only need a
/// free, walkable cell; bumping into an active occupant records a contact
/// for the collision phase. Returns whether the mover now stands on `to`.
pub fn move_object(world: &mut World, from: Coord, to: Coord) -> bool {
    move_object_as(world, Issuer::Host, from, to)
}

pub(crate) fn move_object_as(world: &mut World, issuer: Issuer, from: Coord, to: Coord) -> bool {
    let Some(id) = grid::occupant_at(world, from) else {
        return false;
    };
    let Some(mover) = registry::snapshot(world, id) else {
        return false;
    };
    if mover.is_piece() {
        return apply_move(world, id, from, to, issuer.approves(id)).arrived();
    }
    if !mover.is_active() || to == from || !grid::in_bounds(world, to) {
        return false;
    }
    if let Some(other) = grid::occupant_at(world, to) {
        if registry::is_active(world, other) {
            collision::record_contact(
                world,
                Contact {
                    mover: id,
                    other,
                    at: to,
                },
            );
        }
        return false;
    }
    if !grid::is_walkable(world, to) {
        return false;
    }
    grid::move_object(world, id, from, to).is_ok()
}
