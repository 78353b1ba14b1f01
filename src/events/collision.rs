//! Collision records and outcomes.
//!
//! Two things can make objects collide: a piece move the validator accepted
//! onto an occupied cell ([`CollisionTrigger::Move`]), or a non-piece mover
//! (a hazard driven by its own `update`) trying to enter an occupied cell
//! during a tick ([`CollisionTrigger::Contact`]). Contacts are only recorded
//! while updates run and are resolved afterwards, in the order they happened.
//!
//! See [`crate::systems::collision`] for the resolution rules.

use bevy_ecs::prelude::Resource;

use crate::components::animation::AnimationState;
use crate::components::gridposition::Coord;
use crate::components::objectid::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionTrigger {
    Move { from: Coord, to: Coord },
    Contact { at: Coord },
}

/// A mover ran into an occupied cell during this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    pub mover: ObjectId,
    pub other: ObjectId,
    pub at: Coord,
}

/// Contacts waiting for the collision phase of the current tick.
#[derive(Resource, Debug, Default)]
pub struct PendingContacts {
    pub contacts: Vec<Contact>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CollisionOutcome {
    /// The defender was destroyed and the attacker took its cell.
    Captured {
        attacker: ObjectId,
        defender: ObjectId,
        state: AnimationState,
    },
    /// `victim` was destroyed by `by` and stays on its cell while it dies.
    Destroyed {
        victim: ObjectId,
        by: ObjectId,
        state: AnimationState,
    },
    /// A callback removed the defender and the attacker moved into the free cell.
    Entered { attacker: ObjectId },
    /// A collision callback cancelled the default outcome.
    Cancelled,
    /// No default rule applies; nobody moves.
    Blocked,
}
