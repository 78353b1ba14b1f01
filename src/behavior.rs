//! Behavior contract for board objects.
//!
//! Every object owns exactly one behavior task. A behavior is any type
//! implementing [`Behavior`]; all callbacks have do-nothing defaults, so a
//! behavior only overrides what it cares about. Behaviors can be written in
//! Rust or, with the `lua` feature, as Lua scripts (see
//! [`crate::resources::lua_runtime`]).
//!
//! # Waiting
//!
//! `init`, `update`, `collision` and `event` return a [`Flow`]. Returning
//! [`Flow::Wait`] suspends the task: the continuation runs once at least the
//! requested amount of simulated time has passed. While suspended the task
//! gets no `update` calls, but on-demand callbacks (`move_request`,
//! `valid_moves`, `collision`) still reach it.
//!
//! ```ignore
//! fn update(&mut self, ctx: &mut BehaviorCtx<'_>, _dt: f32) -> CallbackResult<Flow> {
//!     ctx.move_object((0, 0), (1, 0));
//!     Ok(Flow::wait(2.0, |ctx| {
//!         ctx.move_object((1, 0), (2, 0));
//!         Ok(Flow::Done)
//!     }))
//! }
//! ```
//!
//! # Context
//!
//! Callbacks receive a [`BehaviorCtx`], the only handle a behavior has on
//! the simulation. It can query the board and registry, spawn and destroy
//! objects, move things, change animation states and emit effects.

use std::fmt;

use bevy_ecs::prelude::*;

use crate::components::animation::AnimationState;
use crate::components::attributes::AttrValue;
use crate::components::gridposition::Coord;
use crate::components::objectid::ObjectId;
use crate::components::piececolor::PieceColor;
use crate::error::{BoardError, CallbackResult};
use crate::events::effects::EffectCmd;
use crate::events::pending::PendingEvent;
use crate::resources::board::TileRef;
use crate::resources::templatestore::ObjectTemplate;
use crate::resources::worldtime::WorldTime;
use crate::systems::movement::Issuer;
use crate::systems::registry::ObjectSnapshot;
use crate::systems::{animation, behavior, grid, movement, registry};

/// Rest of a callback after a wait.
pub type Continuation = Box<dyn FnOnce(&mut BehaviorCtx<'_>) -> CallbackResult<Flow>>;

/// Creates the behavior for a freshly spawned object.
pub type BehaviorFactory = Box<dyn Fn(&ObjectTemplate) -> Box<dyn Behavior>>;

/// What a callback wants the scheduler to do once it returns.
pub enum Flow {
    Done,
    Wait { seconds: f32, then: Continuation },
}

impl Flow {
    /// Suspend for `seconds` of simulated time, then run `then`.
    pub fn wait(
        seconds: f32,
        then: impl FnOnce(&mut BehaviorCtx<'_>) -> CallbackResult<Flow> + 'static,
    ) -> Self {
        Flow::Wait {
            seconds,
            then: Box::new(then),
        }
    }
}

impl fmt::Debug for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flow::Done => write!(f, "Done"),
            Flow::Wait { seconds, .. } => write!(f, "Wait({seconds}s)"),
        }
    }
}

/// Answer of a custom piece to a move request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveDecision {
    Allow,
    Reject,
    /// Allow the move only if the target is one of these cells.
    MoveList(Vec<Coord>),
}

pub trait Behavior {
    fn init(&mut self, _ctx: &mut BehaviorCtx<'_>) -> CallbackResult<Flow> {
        Ok(Flow::Done)
    }

    fn update(&mut self, _ctx: &mut BehaviorCtx<'_>, _dt: f32) -> CallbackResult<Flow> {
        Ok(Flow::Done)
    }

    /// Called when this object collides with `other`, before the default
    /// outcome is applied. Use [`BehaviorCtx::cancel_collision`] to veto it.
    fn collision(
        &mut self,
        _ctx: &mut BehaviorCtx<'_>,
        _other: &ObjectSnapshot,
    ) -> CallbackResult<Flow> {
        Ok(Flow::Done)
    }

    /// Only asked for pieces with the custom movement pattern.
    fn move_request(
        &mut self,
        _ctx: &mut BehaviorCtx<'_>,
        _from: Coord,
        _to: Coord,
    ) -> CallbackResult<MoveDecision> {
        Ok(MoveDecision::Reject)
    }

    /// Only asked for pieces with the custom movement pattern.
    fn valid_moves(&mut self, _ctx: &mut BehaviorCtx<'_>, _at: Coord) -> CallbackResult<Vec<Coord>> {
        Ok(Vec::new())
    }

    /// Move notifications about this object.
    fn event(&mut self, _ctx: &mut BehaviorCtx<'_>, _event: &PendingEvent) -> CallbackResult<Flow> {
        Ok(Flow::Done)
    }

    /// Last callback before the object leaves the simulation. Cannot wait.
    fn destroy(&mut self, _ctx: &mut BehaviorCtx<'_>) -> CallbackResult<()> {
        Ok(())
    }
}

/// Behavior of objects whose template has none registered.
#[derive(Debug, Default)]
pub struct Inert;

impl Behavior for Inert {}

/// Handle on the simulation given to behavior callbacks.
pub struct BehaviorCtx<'w> {
    world: &'w mut World,
    me: ObjectId,
    callback: &'static str,
    collision_cancelled: bool,
}

impl<'w> BehaviorCtx<'w> {
    pub(crate) fn new(world: &'w mut World, me: ObjectId, callback: &'static str) -> Self {
        Self {
            world,
            me,
            callback,
            collision_cancelled: false,
        }
    }

    /// Id of the object this behavior belongs to.
    pub fn id(&self) -> ObjectId {
        self.me
    }

    /// Name of the callback currently running.
    pub fn callback(&self) -> &'static str {
        self.callback
    }

    pub fn me(&self) -> Option<ObjectSnapshot> {
        registry::snapshot(self.world, self.me)
    }

    pub fn get(&self, id: ObjectId) -> Option<ObjectSnapshot> {
        registry::snapshot(self.world, id)
    }

    pub fn now(&self) -> f64 {
        self.world.resource::<WorldTime>().elapsed
    }

    pub fn occupant_at(&self, at: impl Into<Coord>) -> Option<ObjectId> {
        grid::occupant_at(self.world, at.into())
    }

    pub fn tile_at(&self, at: impl Into<Coord>) -> Option<TileRef> {
        grid::tile_at(self.world, at.into())
    }

    pub fn in_bounds(&self, at: impl Into<Coord>) -> bool {
        grid::in_bounds(self.world, at.into())
    }

    pub fn board_dimensions(&self) -> (i32, i32) {
        grid::dimensions(self.world)
    }

    pub fn spawn(
        &mut self,
        template: &str,
        at: impl Into<Coord>,
        color: Option<PieceColor>,
    ) -> Result<ObjectId, BoardError> {
        behavior::spawn(self.world, template, at.into(), color)
    }

    pub fn destroy(&mut self, id: ObjectId) {
        behavior::destroy(self.world, id);
    }

    /// Move whatever stands on `from` to `to`.
    ///
    /// Pieces go through the movement validator. A custom piece moving
    /// itself skips its own `move_request`, except from inside that
    /// callback. Anything else moves straight onto a free walkable cell;
    /// running into an occupied cell records a contact that is resolved
    /// after this tick's updates.
    pub fn move_object(&mut self, from: impl Into<Coord>, to: impl Into<Coord>) -> bool {
        let issuer = Issuer::Behavior {
            id: self.me,
            callback: self.callback,
        };
        movement::move_object_as(self.world, issuer, from.into(), to.into())
    }

    pub fn set_animation_state(&mut self, id: ObjectId, state: impl Into<AnimationState>) -> bool {
        animation::set_animation_state(self.world, id, state.into())
    }

    pub fn play_sound(&mut self, sound: impl Into<String>) {
        animation::emit(self.world, EffectCmd::PlaySound { id: sound.into() });
    }

    pub fn spawn_effect(&mut self, effect: impl Into<String>, at: impl Into<Coord>) {
        animation::emit(
            self.world,
            EffectCmd::SpawnEffect {
                id: effect.into(),
                at: at.into(),
            },
        );
    }

    pub fn show_message(&mut self, text: impl Into<String>, duration: Option<f32>) {
        animation::emit(
            self.world,
            EffectCmd::ShowMessage {
                text: text.into(),
                duration,
            },
        );
    }

    pub fn attribute(&self, key: &str) -> Option<AttrValue> {
        registry::attribute(self.world, self.me, key)
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: AttrValue) {
        registry::set_attribute(self.world, self.me, key.into(), value);
    }

    /// Veto the default outcome of the collision being handled.
    ///
    /// Only meaningful inside a `collision` callback that runs as part of
    /// the resolution; a collision delivered later from the event queue
    /// can no longer be cancelled.
    pub fn cancel_collision(&mut self) {
        self.collision_cancelled = true;
    }

    pub(crate) fn collision_cancelled(&self) -> bool {
        self.collision_cancelled
    }
}
