//! Time update system.
//!
//! Advances the shared [`WorldTime`](crate::resources::worldtime::WorldTime)
//! resource once per tick, applying `time_scale` to the provided delta.
use bevy_ecs::prelude::*;

use crate::resources::worldtime::WorldTime;

/// Advance the simulated clock by `dt` seconds.
///
/// `dt` is the unscaled tick delta. The current `time_scale` is applied
/// before it is added to `elapsed`. A paused clock keeps its time and reports
/// a zero delta. Returns whether the clock advanced.
pub fn update_world_time(world: &mut World, dt: f32) -> bool {
    let mut wt = world.resource_mut::<WorldTime>();
    if wt.paused {
        wt.delta = 0.0;
        return false;
    }
    let scaled_dt = dt.max(0.0) * wt.time_scale;
    wt.elapsed += f64::from(scaled_dt);
    wt.delta = scaled_dt;
    wt.tick += 1;
    true
}
