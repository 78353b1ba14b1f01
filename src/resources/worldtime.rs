use bevy_ecs::prelude::Resource;

/// Simulated clock of one simulation.
///
/// `elapsed` is kept in `f64` so long runs of small deltas don't drift past
/// suspension deadlines. While `paused`, ticks don't advance anything.
#[derive(Resource, Clone, Copy, Debug)]
pub struct WorldTime {
    pub elapsed: f64,
    pub delta: f32,
    pub time_scale: f32,
    pub paused: bool,
    pub tick: u64,
}

impl Default for WorldTime {
    fn default() -> Self {
        WorldTime {
            elapsed: 0.0,
            delta: 0.0,
            time_scale: 1.0,
            paused: false,
            tick: 0,
        }
    }
}

impl WorldTime {
    pub fn with_time_scale(mut self, time_scale: f32) -> Self {
        self.time_scale = time_scale;
        self
    }
}
