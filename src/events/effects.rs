//! Outbound effect commands.
//!
//! Everything the engine wants the host to show or play goes out as an
//! [`EffectCmd`] message. The ids are opaque tokens resolved by the
//! theme/asset collaborator; the engine passes them through untouched.
//! The host drains them after each tick with
//! [`Simulation::drain_effects`](crate::simulation::Simulation::drain_effects).

use bevy_ecs::message::Message;

use crate::components::animation::AnimationState;
use crate::components::gridposition::Coord;
use crate::components::objectid::ObjectId;

#[derive(Message, Debug, Clone, PartialEq)]
pub enum EffectCmd {
    PlaySound {
        id: String,
    },
    SpawnEffect {
        id: String,
        at: Coord,
    },
    ShowMessage {
        text: String,
        duration: Option<f32>,
    },
    AnimationChanged {
        object: ObjectId,
        state: AnimationState,
    },
    /// The object has been removed from the board and the registry.
    ObjectRemoved {
        object: ObjectId,
    },
}
