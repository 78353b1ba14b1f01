//! Events queued for delivery to behavior tasks.
//!
//! A [`PendingEvent`] is parked in the [`Scheduler`](crate::resources::scheduler::Scheduler)
//! queue when it can't (or shouldn't) be delivered on the spot: move
//! notifications, collision callbacks aimed at a task that is busy running
//! another callback, and suspension timers that came due. The scheduler
//! drains the queue in FIFO order at fixed points of each tick.

use crate::components::gridposition::Coord;
use crate::components::objectid::ObjectId;
use crate::error::MoveError;
use crate::systems::registry::ObjectSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Collision,
    MoveAccepted,
    MoveRejected,
    TimerExpired,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Collision { other: Box<ObjectSnapshot> },
    Move { from: Coord, to: Coord },
    Rejected { from: Coord, to: Coord, reason: MoveError },
    Timer { seq: u64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingEvent {
    pub kind: EventKind,
    pub target: ObjectId,
    pub payload: EventPayload,
}

impl PendingEvent {
    pub fn collision(target: ObjectId, other: ObjectSnapshot) -> Self {
        Self {
            kind: EventKind::Collision,
            target,
            payload: EventPayload::Collision {
                other: Box::new(other),
            },
        }
    }

    pub fn move_accepted(target: ObjectId, from: Coord, to: Coord) -> Self {
        Self {
            kind: EventKind::MoveAccepted,
            target,
            payload: EventPayload::Move { from, to },
        }
    }

    pub fn move_rejected(target: ObjectId, from: Coord, to: Coord, reason: MoveError) -> Self {
        Self {
            kind: EventKind::MoveRejected,
            target,
            payload: EventPayload::Rejected { from, to, reason },
        }
    }

    pub fn timer_expired(target: ObjectId, seq: u64) -> Self {
        Self {
            kind: EventKind::TimerExpired,
            target,
            payload: EventPayload::Timer { seq },
        }
    }
}
