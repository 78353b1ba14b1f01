//! Animation state of a board object.
//!
//! The engine does not draw anything; it only tracks which state an object is
//! in and for how long, so the host can pick the right clip and the collision
//! resolver can defer a removal until a death animation has played out.
//!
//! # Related
//!
//! - [`crate::systems::animation`] – state transitions, cues and playback
//! - [`crate::resources::templatestore::ObjectTemplate`] – per-template durations and cues

use std::fmt;

use bevy_ecs::prelude::Component;
use serde::{Deserialize, Serialize};

/// Fixed set of animation states plus theme-defined extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AnimationState {
    #[default]
    Idle,
    Moving,
    Attacking,
    Hit,
    HitByCar,
    Drowning,
    Burning,
    Death,
    Captured,
    Custom(String),
}

impl AnimationState {
    pub fn name(&self) -> &str {
        match self {
            AnimationState::Idle => "idle",
            AnimationState::Moving => "moving",
            AnimationState::Attacking => "attacking",
            AnimationState::Hit => "hit",
            AnimationState::HitByCar => "hitbycar",
            AnimationState::Drowning => "drowning",
            AnimationState::Burning => "burning",
            AnimationState::Death => "death",
            AnimationState::Captured => "captured",
            AnimationState::Custom(name) => name,
        }
    }

    /// States that end with the object being removed.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AnimationState::HitByCar
                | AnimationState::Drowning
                | AnimationState::Burning
                | AnimationState::Death
                | AnimationState::Captured
        )
    }
}

impl From<&str> for AnimationState {
    fn from(name: &str) -> Self {
        match name {
            "idle" => AnimationState::Idle,
            "moving" => AnimationState::Moving,
            "attacking" => AnimationState::Attacking,
            "hit" => AnimationState::Hit,
            "hitbycar" => AnimationState::HitByCar,
            "drowning" => AnimationState::Drowning,
            "burning" => AnimationState::Burning,
            "death" => AnimationState::Death,
            "captured" => AnimationState::Captured,
            other => AnimationState::Custom(other.to_string()),
        }
    }
}

impl From<String> for AnimationState {
    fn from(name: String) -> Self {
        AnimationState::from(name.as_str())
    }
}

impl From<AnimationState> for String {
    fn from(state: AnimationState) -> Self {
        state.name().to_string()
    }
}

impl fmt::Display for AnimationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Current animation of an object and how long it has been playing.
#[derive(Debug, Clone, Component, PartialEq)]
pub struct Animation {
    pub state: AnimationState,
    pub elapsed: f32,
    /// Declared length of the current state, if the template or config gives one.
    pub duration: Option<f32>,
}

impl Animation {
    pub fn new(state: AnimationState) -> Self {
        Self {
            state,
            elapsed: 0.0,
            duration: None,
        }
    }

    /// Switch to `state` and restart playback.
    pub fn restart(&mut self, state: AnimationState, duration: Option<f32>) {
        self.state = state;
        self.elapsed = 0.0;
        self.duration = duration;
    }

    /// True once a state with a declared duration has played to the end.
    pub fn finished(&self) -> bool {
        self.duration.is_some_and(|d| self.elapsed >= d)
    }
}

impl Default for Animation {
    fn default() -> Self {
        Self::new(AnimationState::Idle)
    }
}
