//! Event/animation dispatcher.
//!
//! - [`advance_animations`] advances playback of every [`Animation`] by the
//!   tick delta. It runs in the simulation's playback [`Schedule`].
//! - [`set_animation_state`] switches an object's state, resolves its
//!   duration and fires the template's cues for that state.
//! - [`begin_death`] is the terminal outcome of a collision: the object
//!   stops interacting, plays its death state and is removed once the
//!   state's duration has elapsed.
//!
//! Everything meant for the host goes out as an [`EffectCmd`] message;
//! [`drain_effects`] hands the accumulated messages over.
//!
//! # Related
//!
//! - [`crate::resources::templatestore::ObjectTemplate`] – per-state durations and cues
//! - [`crate::resources::simconfig::SimConfig`] – fallback durations
//!
//! [`Schedule`]: bevy_ecs::schedule::Schedule

use bevy_ecs::prelude::*;
use log::debug;

use crate::components::animation::{Animation, AnimationState};
use crate::components::gridposition::GridPosition;
use crate::components::lifecycle::{Lifecycle, TemplateRef};
use crate::components::objectid::ObjectId;
use crate::events::effects::EffectCmd;
use crate::resources::objectindex::ObjectIndex;
use crate::resources::simconfig::SimConfig;
use crate::resources::templatestore::{Cue, TemplateStore};
use crate::resources::worldtime::WorldTime;
use crate::systems::{behavior, grid, registry};

/// Advance animation playback by the scaled tick delta.
///
/// States with a declared duration stop at their end.
pub fn advance_animations(time: Res<WorldTime>, mut query: Query<&mut Animation>) {
    for mut animation in query.iter_mut() {
        let elapsed = animation.elapsed + time.delta;
        animation.elapsed = match animation.duration {
            Some(duration) => elapsed.min(duration),
            None => elapsed,
        };
    }
}

/// Switch `id` to `state`, restarting playback.
///
/// Emits [`EffectCmd::AnimationChanged`] plus the template's sound/effect cue
/// for the state, if it declares one. Returns false for unknown objects and
/// objects being torn down.
pub fn set_animation_state(world: &mut World, id: ObjectId, state: AnimationState) -> bool {
    let Some(entity) = world.resource::<ObjectIndex>().entity(id) else {
        return false;
    };
    if world.get::<Lifecycle>(entity) == Some(&Lifecycle::TearingDown) {
        return false;
    }

    let (duration, cue) = {
        let template = world
            .get::<TemplateRef>(entity)
            .and_then(|t| world.resource::<TemplateStore>().get(t.id()));
        let duration = template
            .and_then(|t| t.duration(&state))
            .or_else(|| world.resource::<SimConfig>().animation_duration(&state));
        let cue: Option<Cue> = template.and_then(|t| t.cue(&state)).cloned();
        (duration, cue)
    };
    let at = world.get::<GridPosition>(entity).map(|p| p.pos);

    if let Some(mut animation) = world.get_mut::<Animation>(entity) {
        animation.restart(state.clone(), duration);
    }
    debug!("object {} animation -> {} ({:?}s)", id, state, duration);
    emit(world, EffectCmd::AnimationChanged { object: id, state });

    if let Some(cue) = cue {
        if let Some(sound) = cue.sound {
            emit(world, EffectCmd::PlaySound { id: sound });
        }
        if let (Some(effect), Some(at)) = (cue.effect, at) {
            emit(world, EffectCmd::SpawnEffect { id: effect, at });
        }
    }
    true
}

/// Put `id` into its death `state` and schedule its removal.
///
/// With `detach` the object frees its cell right away; otherwise it keeps
/// it until removed. Does nothing to objects that are not active.
pub(crate) fn begin_death(world: &mut World, id: ObjectId, state: AnimationState, detach: bool) {
    if !registry::is_active(world, id) {
        return;
    }
    registry::set_lifecycle(world, id, Lifecycle::Dying);
    set_animation_state(world, id, state);
    if detach {
        grid::detach(world, id);
    }
    let duration = world
        .resource::<ObjectIndex>()
        .entity(id)
        .and_then(|e| world.get::<Animation>(e))
        .and_then(|a| a.duration)
        .unwrap_or(0.0);
    behavior::schedule_removal(world, id, duration);
}

pub fn emit(world: &mut World, cmd: EffectCmd) {
    world.resource_mut::<Messages<EffectCmd>>().write(cmd);
}

/// Take every effect emitted since the last drain, oldest first.
pub fn drain_effects(world: &mut World) -> Vec<EffectCmd> {
    world.resource_mut::<Messages<EffectCmd>>().drain().collect()
}
