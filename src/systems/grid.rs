//! World-level grid operations.
//!
//! Thin wrappers around the [`Board`] resource that also keep each object's
//! cached [`GridPosition`] in step with the occupancy map.

use bevy_ecs::prelude::*;

use crate::components::gridposition::{Coord, GridPosition};
use crate::components::objectid::ObjectId;
use crate::error::BoardError;
use crate::resources::board::{Board, TileRef};
use crate::resources::objectindex::ObjectIndex;

pub fn in_bounds(world: &World, at: Coord) -> bool {
    world.resource::<Board>().in_bounds(at)
}

pub fn dimensions(world: &World) -> (i32, i32) {
    world.resource::<Board>().dimensions()
}

pub fn occupant_at(world: &World, at: Coord) -> Option<ObjectId> {
    world.resource::<Board>().occupant_at(at)
}

pub fn tile_at(world: &World, at: Coord) -> Option<TileRef> {
    world.resource::<Board>().tile_at(at)
}

pub fn is_walkable(world: &World, at: Coord) -> bool {
    world.resource::<Board>().is_walkable(at)
}

/// Place `id` into the occupant slot at `at`.
pub fn place(world: &mut World, id: ObjectId, at: Coord) -> Result<(), BoardError> {
    world.resource_mut::<Board>().place(id, at)?;
    sync_position(world, id, at);
    Ok(())
}

/// Clear the occupant slot at `at`. The removed object keeps its last position.
pub fn remove(world: &mut World, at: Coord) -> Result<Option<ObjectId>, BoardError> {
    world.resource_mut::<Board>().remove(at)
}

pub fn move_object(world: &mut World, id: ObjectId, from: Coord, to: Coord) -> Result<(), BoardError> {
    world.resource_mut::<Board>().move_occupant(id, from, to)?;
    sync_position(world, id, to);
    Ok(())
}

/// Release whatever slot `id` holds at its current position.
pub(crate) fn detach(world: &mut World, id: ObjectId) {
    let Some(at) = position_of(world, id) else {
        return;
    };
    let mut board = world.resource_mut::<Board>();
    if board.occupant_at(at) == Some(id) {
        let _ = board.remove(at);
    }
    if board.tile_at(at).is_some_and(|t| t.id == id) {
        let _ = board.remove_tile(at);
    }
}

pub(crate) fn position_of(world: &World, id: ObjectId) -> Option<Coord> {
    let entity = world.resource::<ObjectIndex>().entity(id)?;
    world.get::<GridPosition>(entity).map(|p| p.pos)
}

fn sync_position(world: &mut World, id: ObjectId, at: Coord) {
    let Some(entity) = world.resource::<ObjectIndex>().entity(id) else {
        return;
    };
    if let Some(mut position) = world.get_mut::<GridPosition>(entity) {
        position.pos = at;
    }
}
