//! Object registry.
//!
//! Objects are ECS entities; [`ObjectIndex`] maps their stable ids to
//! entities. This module spawns the entity side of an object, removes it,
//! and reads objects back as owned [`ObjectSnapshot`]s.
//!
//! Starting and stopping behavior tasks is not done here; see
//! [`crate::systems::behavior::spawn`] and [`crate::systems::behavior::destroy`].

use std::sync::Arc;

use bevy_ecs::prelude::*;
use log::debug;

use crate::components::animation::{Animation, AnimationState};
use crate::components::attributes::{AttrValue, Attributes};
use crate::components::category::Category;
use crate::components::gridposition::{Coord, GridPosition};
use crate::components::lifecycle::{Lifecycle, TemplateRef};
use crate::components::movementtype::MovementType;
use crate::components::objectid::ObjectId;
use crate::components::piececolor::PieceColor;
use crate::error::BoardError;
use crate::events::effects::EffectCmd;
use crate::resources::board::{Board, TileRef};
use crate::resources::objectindex::ObjectIndex;
use crate::resources::templatestore::TemplateStore;

/// Owned copy of an object's observable state.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSnapshot {
    pub id: ObjectId,
    pub template: Arc<str>,
    pub category: Category,
    pub position: Coord,
    pub color: Option<PieceColor>,
    pub movement: Option<MovementType>,
    pub animation: AnimationState,
    pub lifecycle: Lifecycle,
    pub attributes: Attributes,
}

impl ObjectSnapshot {
    pub fn is_piece(&self) -> bool {
        self.category == Category::Piece
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle.is_active()
    }
}

/// Create the entity for a new object of `template` at `at`.
///
/// Fails without side effects if the template is unknown, `at` is off the
/// board, or the slot the category needs is taken.
pub fn spawn_object(
    world: &mut World,
    template: &str,
    at: Coord,
    color: Option<PieceColor>,
) -> Result<ObjectId, BoardError> {
    let (key, category, movement, default_color, walkable) = {
        let templates = world.resource::<TemplateStore>();
        let Some(t) = templates.get(template) else {
            return Err(BoardError::UnknownTemplate(template.to_string()));
        };
        let key = templates
            .key(template)
            .ok_or_else(|| BoardError::UnknownTemplate(template.to_string()))?;
        (key, t.category, t.movement, t.default_color, t.walkable)
    };

    {
        let board = world.resource::<Board>();
        if !board.in_bounds(at) {
            return Err(BoardError::OutOfBounds(at));
        }
        match category {
            Category::Tile if board.tile_at(at).is_some() => {
                return Err(BoardError::Occupied(at));
            }
            c if c.occupies_cell() && board.occupant_at(at).is_some() => {
                return Err(BoardError::Occupied(at));
            }
            _ => {}
        }
    }

    let id = world.resource_mut::<ObjectIndex>().allocate();
    let mut entity = world.spawn((
        id,
        category,
        GridPosition { pos: at },
        Animation::default(),
        Attributes::default(),
        Lifecycle::Active,
        TemplateRef(key),
    ));
    if let Some(color) = color.or(default_color) {
        entity.insert(color);
    }
    if let Some(movement) = movement {
        entity.insert(movement);
    }
    let entity = entity.id();
    world.resource_mut::<ObjectIndex>().insert(id, entity);

    let mut board = world.resource_mut::<Board>();
    match category {
        Category::Tile => board.place_tile(TileRef { id, walkable }, at)?,
        c if c.occupies_cell() => board.place(id, at)?,
        _ => {}
    }
    debug!("spawned {} '{}' ({}) at {}", id, template, category, at);
    Ok(id)
}

/// Remove the object from the grid, the index and the world.
pub(crate) fn remove_object(world: &mut World, id: ObjectId) {
    crate::systems::grid::detach(world, id);
    if let Some(entity) = world.resource_mut::<ObjectIndex>().remove(id) {
        world.despawn(entity);
        crate::systems::animation::emit(world, EffectCmd::ObjectRemoved { object: id });
        debug!("removed {}", id);
    }
}

pub fn exists(world: &World, id: ObjectId) -> bool {
    world.resource::<ObjectIndex>().contains(id)
}

pub fn snapshot(world: &World, id: ObjectId) -> Option<ObjectSnapshot> {
    let entity = world.resource::<ObjectIndex>().entity(id)?;
    let e = world.get_entity(entity).ok()?;
    Some(ObjectSnapshot {
        id,
        template: e.get::<TemplateRef>()?.0.clone(),
        category: *e.get::<Category>()?,
        position: e.get::<GridPosition>()?.pos,
        color: e.get::<PieceColor>().copied(),
        movement: e.get::<MovementType>().copied(),
        animation: e
            .get::<Animation>()
            .map(|a| a.state.clone())
            .unwrap_or_default(),
        lifecycle: e.get::<Lifecycle>().copied().unwrap_or_default(),
        attributes: e.get::<Attributes>().cloned().unwrap_or_default(),
    })
}

/// Snapshots of every object matching `predicate`, in ascending id order.
pub fn objects_matching(
    world: &World,
    mut predicate: impl FnMut(&ObjectSnapshot) -> bool,
) -> Vec<ObjectSnapshot> {
    world
        .resource::<ObjectIndex>()
        .ids()
        .into_iter()
        .filter_map(|id| snapshot(world, id))
        .filter(|s| predicate(s))
        .collect()
}

pub fn lifecycle(world: &World, id: ObjectId) -> Option<Lifecycle> {
    let entity = world.resource::<ObjectIndex>().entity(id)?;
    world.get::<Lifecycle>(entity).copied()
}

pub fn is_active(world: &World, id: ObjectId) -> bool {
    lifecycle(world, id).is_some_and(|l| l.is_active())
}

pub(crate) fn set_lifecycle(world: &mut World, id: ObjectId, value: Lifecycle) {
    let Some(entity) = world.resource::<ObjectIndex>().entity(id) else {
        return;
    };
    if let Some(mut lifecycle) = world.get_mut::<Lifecycle>(entity) {
        *lifecycle = value;
    }
}

pub fn attribute(world: &World, id: ObjectId, key: &str) -> Option<AttrValue> {
    let entity = world.resource::<ObjectIndex>().entity(id)?;
    world.get::<Attributes>(entity)?.get(key).cloned()
}

pub fn set_attribute(world: &mut World, id: ObjectId, key: String, value: AttrValue) {
    let Some(entity) = world.resource::<ObjectIndex>().entity(id) else {
        return;
    };
    if let Some(mut attributes) = world.get_mut::<Attributes>(entity) {
        attributes.set(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::templatestore::ObjectTemplate;

    fn make_world() -> World {
        let mut world = World::new();
        world.insert_resource(Board::new(4, 4));
        world.insert_resource(ObjectIndex::default());
        world.insert_resource(
            TemplateStore::new()
                .with(ObjectTemplate::piece("rook", MovementType::Rook, PieceColor::White))
                .with(ObjectTemplate::new("grass", Category::Tile))
                .with(ObjectTemplate::new("banner", Category::Ui)),
        );
        world.init_resource::<Messages<EffectCmd>>();
        world
    }

    #[test]
    fn test_spawn_assigns_ascending_ids() {
        let mut world = make_world();
        let a = spawn_object(&mut world, "rook", Coord::new(0, 0), None).unwrap();
        let b = spawn_object(&mut world, "rook", Coord::new(1, 0), None).unwrap();
        assert!(a < b);
        let snap = snapshot(&world, a).unwrap();
        assert_eq!(snap.color, Some(PieceColor::White));
        assert_eq!(snap.movement, Some(MovementType::Rook));
        assert_eq!(&*snap.template, "rook");
    }

    #[test]
    fn test_spawn_color_overrides_template_default() {
        let mut world = make_world();
        let id = spawn_object(&mut world, "rook", Coord::new(0, 0), Some(PieceColor::Black)).unwrap();
        assert_eq!(snapshot(&world, id).unwrap().color, Some(PieceColor::Black));
    }

    #[test]
    fn test_spawn_failures_leave_no_object() {
        let mut world = make_world();
        spawn_object(&mut world, "rook", Coord::new(0, 0), None).unwrap();
        assert_eq!(
            spawn_object(&mut world, "rook", Coord::new(0, 0), None),
            Err(BoardError::Occupied(Coord::new(0, 0)))
        );
        assert_eq!(
            spawn_object(&mut world, "rook", Coord::new(4, 0), None),
            Err(BoardError::OutOfBounds(Coord::new(4, 0)))
        );
        assert_eq!(
            spawn_object(&mut world, "queen", Coord::new(1, 1), None),
            Err(BoardError::UnknownTemplate("queen".into()))
        );
        assert_eq!(world.resource::<ObjectIndex>().len(), 1);
    }

    #[test]
    fn test_tiles_and_pieces_share_a_cell() {
        let mut world = make_world();
        let tile = spawn_object(&mut world, "grass", Coord::new(2, 2), None).unwrap();
        let piece = spawn_object(&mut world, "rook", Coord::new(2, 2), None).unwrap();
        let board = world.resource::<Board>();
        assert_eq!(board.tile_at(Coord::new(2, 2)).map(|t| t.id), Some(tile));
        assert_eq!(board.occupant_at(Coord::new(2, 2)), Some(piece));
    }

    #[test]
    fn test_ui_objects_are_off_grid() {
        let mut world = make_world();
        let id = spawn_object(&mut world, "banner", Coord::new(1, 1), None).unwrap();
        spawn_object(&mut world, "rook", Coord::new(1, 1), None).unwrap();
        assert!(exists(&world, id));
        remove_object(&mut world, id);
        assert!(!exists(&world, id));
        assert!(world.resource::<Board>().occupant_at(Coord::new(1, 1)).is_some());
    }

    #[test]
    fn test_remove_frees_the_cell_and_reports_it() {
        let mut world = make_world();
        let id = spawn_object(&mut world, "rook", Coord::new(3, 3), None).unwrap();
        remove_object(&mut world, id);
        assert_eq!(world.resource::<Board>().occupant_at(Coord::new(3, 3)), None);
        assert!(snapshot(&world, id).is_none());
        let effects: Vec<_> = world.resource_mut::<Messages<EffectCmd>>().drain().collect();
        assert_eq!(effects, vec![EffectCmd::ObjectRemoved { object: id }]);
    }

    #[test]
    fn test_attributes_round_trip() {
        let mut world = make_world();
        let id = spawn_object(&mut world, "rook", Coord::new(0, 0), None).unwrap();
        set_attribute(&mut world, id, "moves".into(), AttrValue::Integer(3));
        assert_eq!(attribute(&world, id, "moves"), Some(AttrValue::Integer(3)));
        assert_eq!(attribute(&world, id, "missing"), None);
    }
}
