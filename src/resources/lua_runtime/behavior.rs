//! Behaviors backed by Lua scripts.
//!
//! A behavior script is a chunk returning a table of callbacks, all optional:
//!
//! ```lua
//! local car = {}
//!
//! function car.update(dt)
//!     local me = engine.get(engine.self_id())
//!     engine.move(me.x, me.y, me.x + 1, me.y)
//!     engine.wait(0.5)
//! end
//!
//! function car.collision(other)
//!     engine.play_sound("horn")
//! end
//!
//! return car
//! ```
//!
//! `init`, `update` and `collision` run inside a fresh coroutine, so they can
//! call `engine.wait(seconds)`; the coroutine is resumed by the scheduler
//! once the time has passed. `move_request(fx, fy, tx, ty)`,
//! `get_valid_moves(x, y)` and `destroy()` are plain calls and must not wait.
//!
//! `move_request` answers with `true`/`"allow"`, `false`/`nil`/`"reject"`,
//! or a list of cells (`{ {0, 0}, {x = 7, y = 0} }`) the move must land on.

use mlua::ThreadStatus;
use mlua::prelude::*;

use crate::behavior::{Behavior, BehaviorCtx, Flow, MoveDecision};
use crate::components::gridposition::Coord;
use crate::error::{CallbackError, CallbackResult};
use crate::systems::registry::ObjectSnapshot;

use super::runtime::{LuaHost, coord_from_lua, snapshot_table, with_engine};

pub struct LuaBehavior {
    host: LuaHost,
    callbacks: LuaTable,
}

impl LuaBehavior {
    pub(crate) fn load(host: &LuaHost, name: &str, source: &str) -> LuaResult<Self> {
        let callbacks = host
            .lua
            .load(source)
            .set_name(name)
            .eval::<LuaTable>()?;
        Ok(Self {
            host: host.clone(),
            callbacks,
        })
    }

    fn callback(&self, name: &str) -> CallbackResult<Option<LuaFunction>> {
        Ok(self.callbacks.get::<Option<LuaFunction>>(name)?)
    }

    /// Run `name` as a coroutine with `args`.
    fn start(
        &self,
        ctx: &mut BehaviorCtx<'_>,
        name: &str,
        args: impl IntoLuaMulti,
    ) -> CallbackResult<Flow> {
        let Some(func) = self.callback(name)? else {
            return Ok(Flow::Done);
        };
        let thread = self.host.lua.create_thread(func)?;
        let args = args.into_lua_multi(&self.host.lua)?;
        resume(self.host.clone(), ctx, thread, args)
    }
}

/// Resume `thread` and turn a yield from `engine.wait` into a [`Flow::Wait`].
fn resume(
    host: LuaHost,
    ctx: &mut BehaviorCtx<'_>,
    thread: LuaThread,
    args: LuaMultiValue,
) -> CallbackResult<Flow> {
    let yielded: LuaValue = with_engine(&host, ctx, || thread.resume::<LuaValue>(args))?;
    if !matches!(thread.status(), ThreadStatus::Resumable) {
        return Ok(Flow::Done);
    }
    let seconds = match yielded {
        LuaValue::Integer(i) => i as f32,
        LuaValue::Number(n) => n as f32,
        other => {
            return Err(CallbackError::new(format!(
                "engine.wait expects a number of seconds, got {}",
                other.type_name()
            )));
        }
    };
    Ok(Flow::wait(seconds, move |ctx| {
        resume(host, ctx, thread, LuaMultiValue::new())
    }))
}

fn decision_from_lua(value: LuaValue) -> CallbackResult<MoveDecision> {
    match value {
        LuaValue::Nil | LuaValue::Boolean(false) => Ok(MoveDecision::Reject),
        LuaValue::Boolean(true) => Ok(MoveDecision::Allow),
        LuaValue::String(s) => match &*s.to_str()? {
            "allow" => Ok(MoveDecision::Allow),
            "reject" => Ok(MoveDecision::Reject),
            other => Err(CallbackError::new(format!(
                "move_request returned unknown decision '{other}'"
            ))),
        },
        LuaValue::Table(_) => Ok(MoveDecision::MoveList(coords_from_lua(value)?)),
        other => Err(CallbackError::new(format!(
            "move_request returned a {}",
            other.type_name()
        ))),
    }
}

fn coords_from_lua(value: LuaValue) -> CallbackResult<Vec<Coord>> {
    let LuaValue::Table(list) = value else {
        return Ok(Vec::new());
    };
    let mut cells = Vec::new();
    for entry in list.sequence_values::<LuaValue>() {
        let entry = entry?;
        let cell = coord_from_lua(&entry)
            .ok_or_else(|| CallbackError::new("expected a cell as {x, y}"))?;
        cells.push(cell);
    }
    Ok(cells)
}

impl Behavior for LuaBehavior {
    fn init(&mut self, ctx: &mut BehaviorCtx<'_>) -> CallbackResult<Flow> {
        self.start(ctx, "init", ())
    }

    fn update(&mut self, ctx: &mut BehaviorCtx<'_>, dt: f32) -> CallbackResult<Flow> {
        self.start(ctx, "update", dt)
    }

    fn collision(&mut self, ctx: &mut BehaviorCtx<'_>, other: &ObjectSnapshot) -> CallbackResult<Flow> {
        let other = snapshot_table(&self.host.lua, other)?;
        self.start(ctx, "collision", other)
    }

    fn move_request(
        &mut self,
        ctx: &mut BehaviorCtx<'_>,
        from: Coord,
        to: Coord,
    ) -> CallbackResult<MoveDecision> {
        let Some(func) = self.callback("move_request")? else {
            return Ok(MoveDecision::Reject);
        };
        let value: LuaValue = with_engine(&self.host, ctx, || {
            func.call::<LuaValue>((from.x, from.y, to.x, to.y))
        })?;
        decision_from_lua(value)
    }

    fn valid_moves(&mut self, ctx: &mut BehaviorCtx<'_>, at: Coord) -> CallbackResult<Vec<Coord>> {
        let Some(func) = self.callback("get_valid_moves")? else {
            return Ok(Vec::new());
        };
        let value: LuaValue = with_engine(&self.host, ctx, || func.call::<LuaValue>((at.x, at.y)))?;
        coords_from_lua(value)
    }

    fn destroy(&mut self, ctx: &mut BehaviorCtx<'_>) -> CallbackResult<()> {
        let Some(func) = self.callback("destroy")? else {
            return Ok(());
        };
        with_engine(&self.host, ctx, || func.call::<()>(()))?;
        Ok(())
    }
}
