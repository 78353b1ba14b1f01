//! Simulation façade.
//!
//! A [`Simulation`] owns one ECS [`World`] holding the whole engine state:
//! the board, the object entities, the clock, configuration, templates and
//! the behavior scheduler. Hosts drive it with [`Simulation::tick`] and read
//! what to show back with [`Simulation::drain_effects`].
//!
//! # Tick order
//!
//! 1. advance the clock (a paused simulation stops here)
//! 2. advance animation playback
//! 3. queue `timer_expired` for due suspensions
//! 4. deliver pending events
//! 5. `update` every runnable object in ascending id order
//! 6. resolve the contacts recorded during the updates
//! 7. deliver the events queued since step 4
//!
//! A `Simulation` is not `Send`: behaviors are plain trait objects and may
//! hold a Lua state.

use bevy_ecs::prelude::*;
use log::info;

use crate::behavior::{Behavior, BehaviorFactory};
use crate::components::animation::AnimationState;
use crate::components::gridposition::Coord;
use crate::components::objectid::ObjectId;
use crate::components::piececolor::PieceColor;
use crate::error::BoardError;
use crate::events::collision::PendingContacts;
use crate::events::effects::EffectCmd;
use crate::resources::board::{Board, TileRef};
#[cfg(feature = "lua")]
use crate::resources::lua_runtime::LuaRuntime;
use crate::resources::objectindex::ObjectIndex;
use crate::resources::scheduler::{BehaviorFactories, Scheduler, TaskState};
use crate::resources::simconfig::SimConfig;
use crate::resources::templatestore::{ObjectTemplate, TemplateStore};
use crate::resources::worldtime::WorldTime;
use crate::systems::animation::advance_animations;
use crate::systems::movement::MoveOutcome;
use crate::systems::registry::ObjectSnapshot;
use crate::systems::time::update_world_time;
use crate::systems::{animation, behavior, grid, movement, registry};

pub struct Simulation {
    world: World,
    playback: Schedule,
}

impl Simulation {
    pub fn new(config: SimConfig, templates: TemplateStore) -> Self {
        let mut world = World::new();
        world.insert_resource(Board::new(config.board_width, config.board_height));
        world.insert_resource(ObjectIndex::default());
        world.insert_resource(WorldTime::default().with_time_scale(config.time_scale));
        world.insert_resource(PendingContacts::default());
        world.insert_resource(Messages::<EffectCmd>::default());
        world.insert_non_send_resource(Scheduler::default());
        world.insert_non_send_resource(BehaviorFactories::default());
        info!(
            "simulation created: {}x{} board, {} templates",
            config.board_width,
            config.board_height,
            templates.len()
        );
        world.insert_resource(config);
        world.insert_resource(templates);

        let mut playback = Schedule::default();
        playback.add_systems(advance_animations);

        Self { world, playback }
    }

    /// Register the behavior constructor used for objects of `template`.
    pub fn register_behavior<F, B>(&mut self, template: impl Into<String>, factory: F)
    where
        F: Fn(&ObjectTemplate) -> B + 'static,
        B: Behavior + 'static,
    {
        let factory: BehaviorFactory =
            Box::new(move |t: &ObjectTemplate| -> Box<dyn Behavior> { Box::new(factory(t)) });
        self.world
            .non_send_resource_mut::<BehaviorFactories>()
            .register(template, factory);
    }

    /// Register a Lua script as the behavior of `template`.
    ///
    /// `name` labels the chunk in Lua error messages. The first call creates
    /// the simulation's Lua state.
    #[cfg(feature = "lua")]
    pub fn register_lua_behavior(
        &mut self,
        template: impl Into<String>,
        name: &str,
        source: &str,
    ) -> mlua::Result<()> {
        let factory = self.lua_runtime()?.behavior_factory(name, source)?;
        self.world
            .non_send_resource_mut::<BehaviorFactories>()
            .register(template, factory);
        Ok(())
    }

    /// Register the Lua script at `path` as the behavior of `template`.
    #[cfg(feature = "lua")]
    pub fn register_lua_script(
        &mut self,
        template: impl Into<String>,
        path: impl AsRef<std::path::Path>,
    ) -> mlua::Result<()> {
        let factory = self.lua_runtime()?.behavior_factory_from_file(path)?;
        self.world
            .non_send_resource_mut::<BehaviorFactories>()
            .register(template, factory);
        Ok(())
    }

    #[cfg(feature = "lua")]
    fn lua_runtime(&mut self) -> mlua::Result<&LuaRuntime> {
        if self.world.get_non_send_resource::<LuaRuntime>().is_none() {
            let runtime = LuaRuntime::new()?;
            info!("Lua runtime initialized");
            self.world.insert_non_send_resource(runtime);
        }
        Ok(self.world.non_send_resource::<LuaRuntime>())
    }

    pub fn add_template(&mut self, template: ObjectTemplate) {
        self.world.resource_mut::<TemplateStore>().insert(template);
    }

    /// Advance the simulation by `dt` seconds of unscaled time.
    pub fn tick(&mut self, dt: f32) {
        if !update_world_time(&mut self.world, dt) {
            return;
        }
        self.playback.run(&mut self.world);
        behavior::run_behaviors(&mut self.world);
    }

    pub fn pause(&mut self) {
        self.world.resource_mut::<WorldTime>().paused = true;
    }

    pub fn resume(&mut self) {
        self.world.resource_mut::<WorldTime>().paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.world.resource::<WorldTime>().paused
    }

    /// Simulated seconds since the simulation started.
    pub fn now(&self) -> f64 {
        self.world.resource::<WorldTime>().elapsed
    }

    pub fn tick_count(&self) -> u64 {
        self.world.resource::<WorldTime>().tick
    }

    pub fn spawn(
        &mut self,
        template: &str,
        at: impl Into<Coord>,
        color: Option<PieceColor>,
    ) -> Result<ObjectId, BoardError> {
        behavior::spawn(&mut self.world, template, at.into(), color)
    }

    /// Destroy `id`. Unknown ids are ignored.
    pub fn destroy(&mut self, id: ObjectId) {
        behavior::destroy(&mut self.world, id);
    }

    pub fn get(&self, id: ObjectId) -> Option<ObjectSnapshot> {
        registry::snapshot(&self.world, id)
    }

    /// Snapshots of the objects matching `predicate`, in ascending id order.
    pub fn objects(
        &self,
        predicate: impl FnMut(&ObjectSnapshot) -> bool,
    ) -> std::vec::IntoIter<ObjectSnapshot> {
        registry::objects_matching(&self.world, predicate).into_iter()
    }

    pub fn object_count(&self) -> usize {
        self.world.resource::<ObjectIndex>().len()
    }

    pub fn set_animation_state(&mut self, id: ObjectId, state: impl Into<AnimationState>) -> bool {
        animation::set_animation_state(&mut self.world, id, state.into())
    }

    /// Validate and apply a move of piece `id`.
    pub fn request_move(
        &mut self,
        id: ObjectId,
        from: impl Into<Coord>,
        to: impl Into<Coord>,
    ) -> MoveOutcome {
        movement::request_move(&mut self.world, id, from.into(), to.into())
    }

    /// Move whatever stands on `from`, the way a behavior would.
    pub fn move_object(&mut self, from: impl Into<Coord>, to: impl Into<Coord>) -> bool {
        movement::move_object(&mut self.world, from.into(), to.into())
    }

    pub fn valid_moves(&mut self, at: impl Into<Coord>) -> Vec<Coord> {
        movement::valid_moves(&mut self.world, at.into())
    }

    pub fn occupant_at(&self, at: impl Into<Coord>) -> Option<ObjectId> {
        grid::occupant_at(&self.world, at.into())
    }

    pub fn tile_at(&self, at: impl Into<Coord>) -> Option<TileRef> {
        grid::tile_at(&self.world, at.into())
    }

    pub fn in_bounds(&self, at: impl Into<Coord>) -> bool {
        grid::in_bounds(&self.world, at.into())
    }

    pub fn board_dimensions(&self) -> (i32, i32) {
        grid::dimensions(&self.world)
    }

    pub fn task_state(&self, id: ObjectId) -> Option<TaskState> {
        behavior::task_state(&self.world, id)
    }

    /// Take the effects emitted since the last call.
    pub fn drain_effects(&mut self) -> Vec<EffectCmd> {
        animation::drain_effects(&mut self.world)
    }

    pub fn config(&self) -> &SimConfig {
        self.world.resource::<SimConfig>()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}
