//! Object template registry.
//!
//! Templates describe what a spawned object is: its category, movement
//! pattern, what kind of death it inflicts on a piece it hits, how long its
//! animations last, and which sound/effect cues to fire when it enters an
//! animation state. They are keyed by opaque string ids owned by the theme
//! collaborator; the engine never interprets the cue ids.
//!
//! Templates can be built in code or decoded from JSON:
//!
//! ```json
//! [
//!   { "id": "white_pawn", "category": "piece", "movement": "pawn", "default_color": "white",
//!     "cues": { "hitbycar": { "sound": "brakes" } } },
//!   { "id": "car", "category": "hazard", "hit_kind": "hitbycar" }
//! ]
//! ```

use std::path::Path;
use std::sync::Arc;

use bevy_ecs::prelude::Resource;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::components::animation::AnimationState;
use crate::components::category::Category;
use crate::components::movementtype::MovementType;
use crate::components::piececolor::PieceColor;
use crate::error::TemplateError;

/// Sound and/or effect fired when an object enters an animation state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    #[serde(default)]
    pub sound: Option<String>,
    #[serde(default)]
    pub effect: Option<String>,
}

fn default_walkable() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectTemplate {
    pub id: String,
    pub category: Category,
    #[serde(default)]
    pub movement: Option<MovementType>,
    #[serde(default)]
    pub default_color: Option<PieceColor>,
    /// Only meaningful for tiles.
    #[serde(default = "default_walkable")]
    pub walkable: bool,
    /// Animation state this object inflicts on a piece it destroys.
    #[serde(default)]
    pub hit_kind: Option<AnimationState>,
    /// Per-state durations in seconds, overriding the config defaults.
    #[serde(default)]
    pub animation_durations: FxHashMap<String, f32>,
    #[serde(default)]
    pub cues: FxHashMap<String, Cue>,
}

impl ObjectTemplate {
    pub fn new(id: impl Into<String>, category: Category) -> Self {
        Self {
            id: id.into(),
            category,
            movement: None,
            default_color: None,
            walkable: true,
            hit_kind: None,
            animation_durations: FxHashMap::default(),
            cues: FxHashMap::default(),
        }
    }

    pub fn piece(id: impl Into<String>, movement: MovementType, color: PieceColor) -> Self {
        Self::new(id, Category::Piece)
            .with_movement(movement)
            .with_color(color)
    }

    pub fn hazard(id: impl Into<String>, hit_kind: AnimationState) -> Self {
        Self::new(id, Category::Hazard).with_hit_kind(hit_kind)
    }

    pub fn with_movement(mut self, movement: MovementType) -> Self {
        self.movement = Some(movement);
        self
    }

    pub fn with_color(mut self, color: PieceColor) -> Self {
        self.default_color = Some(color);
        self
    }

    pub fn with_hit_kind(mut self, hit_kind: AnimationState) -> Self {
        self.hit_kind = Some(hit_kind);
        self
    }

    pub fn with_walkable(mut self, walkable: bool) -> Self {
        self.walkable = walkable;
        self
    }

    pub fn with_duration(mut self, state: AnimationState, seconds: f32) -> Self {
        self.animation_durations.insert(state.name().to_string(), seconds);
        self
    }

    pub fn with_cue(mut self, state: AnimationState, cue: Cue) -> Self {
        self.cues.insert(state.name().to_string(), cue);
        self
    }

    pub fn duration(&self, state: &AnimationState) -> Option<f32> {
        self.animation_durations.get(state.name()).copied()
    }

    pub fn cue(&self, state: &AnimationState) -> Option<&Cue> {
        self.cues.get(state.name())
    }
}

/// Central registry of object templates keyed by id.
#[derive(Resource, Debug, Default, Clone)]
pub struct TemplateStore {
    templates: FxHashMap<Arc<str>, ObjectTemplate>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template, replacing any previous one with the same id.
    pub fn insert(&mut self, template: ObjectTemplate) {
        self.templates.insert(Arc::from(template.id.as_str()), template);
    }

    pub fn with(mut self, template: ObjectTemplate) -> Self {
        self.insert(template);
        self
    }

    pub fn get(&self, id: &str) -> Option<&ObjectTemplate> {
        self.templates.get(id)
    }

    /// Shared key for `id`, so objects can keep a cheap reference to it.
    pub fn key(&self, id: &str) -> Option<Arc<str>> {
        self.templates.get_key_value(id).map(|(k, _)| k.clone())
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Decode a JSON array of templates. Duplicate ids are rejected.
    pub fn from_json_str(json: &str) -> Result<Self, TemplateError> {
        let templates: Vec<ObjectTemplate> = serde_json::from_str(json)?;
        let mut store = Self::new();
        for template in templates {
            if store.get(&template.id).is_some() {
                return Err(TemplateError::Duplicate(template.id));
            }
            store.insert(template);
        }
        Ok(store)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}
