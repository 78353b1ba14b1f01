//! Stable-id index over the object entities.

use std::collections::BTreeMap;

use bevy_ecs::prelude::{Entity, Resource};

use crate::components::objectid::ObjectId;

/// Maps [`ObjectId`]s to their ECS entities.
///
/// A `BTreeMap` keeps iteration in ascending id (spawn) order. Ids come from a
/// monotonically increasing counter and are never handed out twice.
#[derive(Resource, Debug, Default)]
pub struct ObjectIndex {
    entities: BTreeMap<ObjectId, Entity>,
    next_id: u64,
}

impl ObjectIndex {
    pub fn allocate(&mut self) -> ObjectId {
        self.next_id += 1;
        ObjectId(self.next_id)
    }

    pub fn insert(&mut self, id: ObjectId, entity: Entity) {
        self.entities.insert(id, entity);
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    pub fn entity(&self, id: ObjectId) -> Option<Entity> {
        self.entities.get(&id).copied()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Ids in ascending spawn order.
    pub fn ids(&self) -> Vec<ObjectId> {
        self.entities.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
