//! Collision resolver.
//!
//! A collision is resolved in three steps:
//!
//! 1. the defender's `collision` callback runs with the attacker, then the
//!    attacker's with the defender; either may cancel the default outcome
//! 2. if nobody cancelled, the default rule for the pair of categories is
//!    applied (see [`resolve`])
//! 3. destroyed objects enter their death animation through the dispatcher
//!    and are removed once it has played
//!
//! Contacts recorded while behaviors update (a hazard driving into an
//! occupied cell) are resolved after all updates of the tick, in the order
//! they were recorded.

use bevy_ecs::prelude::*;
use log::debug;

use crate::components::animation::AnimationState;
use crate::components::category::Category;
use crate::components::objectid::ObjectId;
use crate::events::collision::{CollisionOutcome, CollisionTrigger, Contact, PendingContacts};
use crate::resources::templatestore::TemplateStore;
use crate::systems::registry::{self, ObjectSnapshot};
use crate::systems::{animation, behavior, grid};

/// Resolve a collision of `attacker` into `defender`.
///
/// Default outcomes:
/// - piece attacks piece: the defender dies (`captured`, or the attacker's
///   declared hit kind) and leaves its cell at once; the attacker moves in
/// - a hazard and a piece meet, in either direction: the piece dies with
///   the hazard's hit kind (`death` if none) and keeps its cell until removed
/// - anything else is blocked
///
/// If a callback already got rid of the defender and the cell is free, a
/// moving piece simply enters it.
pub fn resolve(
    world: &mut World,
    attacker: ObjectId,
    defender: ObjectId,
    trigger: CollisionTrigger,
) -> CollisionOutcome {
    let (Some(a), Some(d)) = (
        registry::snapshot(world, attacker),
        registry::snapshot(world, defender),
    ) else {
        return CollisionOutcome::Blocked;
    };
    debug!(
        "collision: {} ({}) -> {} ({}) via {:?}",
        attacker, a.category, defender, d.category, trigger
    );

    let mut cancelled = behavior::deliver_collision(world, defender, &a);
    cancelled |= behavior::deliver_collision(world, attacker, &d);
    if cancelled {
        debug!("collision {} -> {} cancelled by a callback", attacker, defender);
        return CollisionOutcome::Cancelled;
    }

    if !registry::is_active(world, attacker) {
        return CollisionOutcome::Blocked;
    }

    if !registry::is_active(world, defender) {
        if let CollisionTrigger::Move { from, to } = trigger {
            if a.is_piece()
                && grid::occupant_at(world, to).is_none()
                && grid::move_object(world, attacker, from, to).is_ok()
            {
                return CollisionOutcome::Entered { attacker };
            }
        }
        return CollisionOutcome::Blocked;
    }

    match (a.category, d.category) {
        (Category::Piece, Category::Piece) => {
            let state = hit_kind(world, &a).unwrap_or(AnimationState::Captured);
            animation::begin_death(world, defender, state.clone(), true);
            if let CollisionTrigger::Move { from, to } = trigger {
                if grid::move_object(world, attacker, from, to).is_ok() {
                    return CollisionOutcome::Captured {
                        attacker,
                        defender,
                        state,
                    };
                }
            }
            CollisionOutcome::Destroyed {
                victim: defender,
                by: attacker,
                state,
            }
        }
        (Category::Piece, Category::Hazard) => {
            let state = hit_kind(world, &d).unwrap_or(AnimationState::Death);
            animation::begin_death(world, attacker, state.clone(), false);
            CollisionOutcome::Destroyed {
                victim: attacker,
                by: defender,
                state,
            }
        }
        (Category::Hazard, Category::Piece) => {
            let state = hit_kind(world, &a).unwrap_or(AnimationState::Death);
            animation::begin_death(world, defender, state.clone(), false);
            CollisionOutcome::Destroyed {
                victim: defender,
                by: attacker,
                state,
            }
        }
        _ => CollisionOutcome::Blocked,
    }
}

fn hit_kind(world: &World, object: &ObjectSnapshot) -> Option<AnimationState> {
    world
        .resource::<TemplateStore>()
        .get(&object.template)
        .and_then(|t| t.hit_kind.clone())
}

pub(crate) fn record_contact(world: &mut World, contact: Contact) {
    debug!(
        "contact: {} ran into {} at {}",
        contact.mover, contact.other, contact.at
    );
    world.resource_mut::<PendingContacts>().contacts.push(contact);
}

/// Resolve the contacts recorded so far, oldest first.
///
/// A contact is dropped if either side stopped being active or the other
/// object left the cell in the meantime.
pub fn resolve_contacts(world: &mut World) {
    let contacts = std::mem::take(&mut world.resource_mut::<PendingContacts>().contacts);
    for contact in contacts {
        if !registry::is_active(world, contact.mover)
            || !registry::is_active(world, contact.other)
            || grid::occupant_at(world, contact.at) != Some(contact.other)
        {
            continue;
        }
        let outcome = resolve(
            world,
            contact.mover,
            contact.other,
            CollisionTrigger::Contact { at: contact.at },
        );
        debug!("contact {} -> {} resolved: {:?}", contact.mover, contact.other, outcome);
    }
}
