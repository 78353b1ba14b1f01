//! Lua runtime core implementation.
//!
//! [`LuaRuntime`] owns the Lua interpreter shared by every Lua behavior of a
//! simulation. The global `engine` table it installs only carries the
//! functions that need no simulation access (logging and `wait`); while a
//! behavior callback runs, `engine` is temporarily replaced by a table that
//! also carries the functions bound to that callback's [`BehaviorCtx`]
//! (see [`with_engine`]).

use std::cell::{RefCell, RefMut};
use std::path::Path;

use log::{error, info, warn};
use mlua::prelude::*;

use crate::behavior::{Behavior, BehaviorCtx, BehaviorFactory, Inert};
use crate::components::attributes::AttrValue;
use crate::components::gridposition::Coord;
use crate::components::objectid::ObjectId;
use crate::components::piececolor::PieceColor;
use crate::resources::templatestore::ObjectTemplate;
use crate::systems::registry::ObjectSnapshot;

use super::behavior::LuaBehavior;

/// Handles every Lua behavior keeps on the interpreter.
#[derive(Clone)]
pub(crate) struct LuaHost {
    pub(crate) lua: Lua,
    /// Context-free part of the `engine` table.
    pub(crate) base: LuaTable,
}

/// Resource holding the Lua interpreter state.
///
/// This is a `NonSend` resource because the Lua state is not thread-safe.
pub struct LuaRuntime {
    host: LuaHost,
}

impl LuaRuntime {
    pub fn new() -> LuaResult<Self> {
        let lua = Lua::new();
        let base = Self::register_base_api(&lua)?;
        lua.globals().set("engine", base.clone())?;
        Ok(Self {
            host: LuaHost { lua, base },
        })
    }

    fn register_base_api(lua: &Lua) -> LuaResult<LuaTable> {
        let engine = lua.create_table()?;

        // engine.log(message) - General purpose logging
        engine.set(
            "log",
            lua.create_function(|_, msg: String| {
                info!(target: "lua", "{}", msg);
                Ok(())
            })?,
        )?;

        engine.set(
            "log_info",
            lua.create_function(|_, msg: String| {
                info!(target: "lua", "{}", msg);
                Ok(())
            })?,
        )?;

        engine.set(
            "log_warn",
            lua.create_function(|_, msg: String| {
                warn!(target: "lua", "{}", msg);
                Ok(())
            })?,
        )?;

        engine.set(
            "log_error",
            lua.create_function(|_, msg: String| {
                error!(target: "lua", "{}", msg);
                Ok(())
            })?,
        )?;

        // engine.wait(seconds) - only valid inside init/update/collision
        let wait = lua
            .load("return function(seconds) return coroutine.yield(seconds) end")
            .set_name("engine.wait")
            .eval::<LuaFunction>()?;
        engine.set("wait", wait)?;

        Ok(engine)
    }

    /// Build a behavior factory from a script chunk.
    ///
    /// The chunk must return a table of callbacks. It is run once now to
    /// catch errors early and once more for every spawned object, so each
    /// object gets its own script-local state. An object whose run fails
    /// gets an inert behavior.
    pub fn behavior_factory(&self, name: &str, source: &str) -> LuaResult<BehaviorFactory> {
        LuaBehavior::load(&self.host, name, source)?;
        let host = self.host.clone();
        let name = name.to_string();
        let source = source.to_string();
        Ok(Box::new(move |template: &ObjectTemplate| -> Box<dyn Behavior> {
            match LuaBehavior::load(&host, &name, &source) {
                Ok(behavior) => Box::new(behavior),
                Err(err) => {
                    error!(
                        "failed to load script '{}' for template '{}': {}",
                        name, template.id, err
                    );
                    Box::new(Inert)
                }
            }
        }))
    }

    /// Read a script from disk and build a behavior factory from it.
    pub fn behavior_factory_from_file(&self, path: impl AsRef<Path>) -> LuaResult<BehaviorFactory> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| LuaError::ExternalError(std::sync::Arc::new(e)))?;
        self.behavior_factory(&path.display().to_string(), &source)
    }

    /// Returns a reference to the underlying Lua state.
    pub fn lua(&self) -> &Lua {
        &self.host.lua
    }
}

fn ctx_mut<'a, 'b, 'w>(
    cell: &'a RefCell<&'b mut BehaviorCtx<'w>>,
) -> LuaResult<RefMut<'a, &'b mut BehaviorCtx<'w>>> {
    cell.try_borrow_mut()
        .map_err(|_| LuaError::runtime("engine function called re-entrantly"))
}

/// Run `f` with the global `engine` table bound to `ctx`.
///
/// The context-bound functions are scoped: they stop working as soon as
/// this returns, and the previous `engine` table is put back, so nested
/// callbacks of other objects each see their own bindings.
pub(crate) fn with_engine<R>(
    host: &LuaHost,
    ctx: &mut BehaviorCtx<'_>,
    f: impl FnOnce() -> LuaResult<R>,
) -> LuaResult<R> {
    let lua = &host.lua;
    let cell = RefCell::new(ctx);
    let cell = &cell;

    lua.scope(|scope| {
        let engine = lua.create_table()?;
        for pair in host.base.pairs::<LuaValue, LuaValue>() {
            let (key, value) = pair?;
            engine.set(key, value)?;
        }

        engine.set(
            "self_id",
            scope.create_function(move |_, ()| Ok(ctx_mut(cell)?.id().0))?,
        )?;
        engine.set(
            "now",
            scope.create_function(move |_, ()| Ok(ctx_mut(cell)?.now()))?,
        )?;
        engine.set(
            "get",
            scope.create_function(move |lua, id: u64| {
                match ctx_mut(cell)?.get(ObjectId(id)) {
                    Some(snapshot) => snapshot_table(lua, &snapshot).map(LuaValue::Table),
                    None => Ok(LuaValue::Nil),
                }
            })?,
        )?;
        engine.set(
            "occupant_at",
            scope.create_function(move |_, (x, y): (i32, i32)| {
                Ok(ctx_mut(cell)?.occupant_at((x, y)).map(|id| id.0))
            })?,
        )?;
        engine.set(
            "tile_at",
            scope.create_function(move |lua, (x, y): (i32, i32)| {
                match ctx_mut(cell)?.tile_at((x, y)) {
                    Some(tile) => {
                        let t = lua.create_table()?;
                        t.set("id", tile.id.0)?;
                        t.set("walkable", tile.walkable)?;
                        Ok(LuaValue::Table(t))
                    }
                    None => Ok(LuaValue::Nil),
                }
            })?,
        )?;
        engine.set(
            "in_bounds",
            scope.create_function(move |_, (x, y): (i32, i32)| Ok(ctx_mut(cell)?.in_bounds((x, y))))?,
        )?;
        engine.set(
            "board_dimensions",
            scope.create_function(move |_, ()| Ok(ctx_mut(cell)?.board_dimensions()))?,
        )?;
        engine.set(
            "spawn",
            scope.create_function(
                move |_, (template, x, y, color): (String, i32, i32, Option<String>)| {
                    let color = match color.as_deref().map(str::parse::<PieceColor>) {
                        Some(Ok(c)) => Some(c),
                        Some(Err(err)) => return Ok((None, Some(err.to_string()))),
                        None => None,
                    };
                    match ctx_mut(cell)?.spawn(&template, (x, y), color) {
                        Ok(id) => Ok((Some(id.0), None)),
                        Err(err) => {
                            warn!(target: "lua", "spawn of '{}' at ({}, {}) failed: {}", template, x, y, err);
                            Ok((None, Some(err.to_string())))
                        }
                    }
                },
            )?,
        )?;
        engine.set(
            "destroy",
            scope.create_function(move |_, id: u64| {
                ctx_mut(cell)?.destroy(ObjectId(id));
                Ok(())
            })?,
        )?;
        engine.set(
            "move",
            scope.create_function(move |_, (fx, fy, tx, ty): (i32, i32, i32, i32)| {
                Ok(ctx_mut(cell)?.move_object((fx, fy), (tx, ty)))
            })?,
        )?;
        engine.set(
            "set_animation_state",
            scope.create_function(move |_, (id, state): (u64, String)| {
                Ok(ctx_mut(cell)?.set_animation_state(ObjectId(id), state))
            })?,
        )?;
        engine.set(
            "play_sound",
            scope.create_function(move |_, id: String| {
                ctx_mut(cell)?.play_sound(id);
                Ok(())
            })?,
        )?;
        engine.set(
            "spawn_effect",
            scope.create_function(move |_, (id, x, y): (String, i32, i32)| {
                ctx_mut(cell)?.spawn_effect(id, (x, y));
                Ok(())
            })?,
        )?;
        engine.set(
            "show_message",
            scope.create_function(move |_, (text, seconds): (String, Option<f32>)| {
                ctx_mut(cell)?.show_message(text, seconds);
                Ok(())
            })?,
        )?;
        engine.set(
            "get_attribute",
            scope.create_function(move |lua, key: String| match ctx_mut(cell)?.attribute(&key) {
                Some(value) => attr_to_lua(lua, value),
                None => Ok(LuaValue::Nil),
            })?,
        )?;
        engine.set(
            "set_attribute",
            scope.create_function(move |_, (key, value): (String, LuaValue)| {
                let value = attr_from_lua(value)?;
                ctx_mut(cell)?.set_attribute(key, value);
                Ok(())
            })?,
        )?;
        engine.set(
            "cancel_collision",
            scope.create_function(move |_, ()| {
                ctx_mut(cell)?.cancel_collision();
                Ok(())
            })?,
        )?;

        let globals = lua.globals();
        let previous: LuaValue = globals.get("engine")?;
        globals.set("engine", engine)?;
        let result = f();
        globals.set("engine", previous)?;
        result
    })
}

pub(crate) fn snapshot_table(lua: &Lua, snapshot: &ObjectSnapshot) -> LuaResult<LuaTable> {
    let t = lua.create_table()?;
    t.set("id", snapshot.id.0)?;
    t.set("template", &*snapshot.template)?;
    t.set("category", snapshot.category.as_str())?;
    t.set("x", snapshot.position.x)?;
    t.set("y", snapshot.position.y)?;
    if let Some(color) = snapshot.color {
        t.set("color", color.as_str())?;
    }
    if let Some(movement) = snapshot.movement {
        t.set("movement", movement.as_str())?;
    }
    t.set("animation", snapshot.animation.name())?;
    t.set("active", snapshot.is_active())?;
    Ok(t)
}

fn attr_to_lua(lua: &Lua, value: AttrValue) -> LuaResult<LuaValue> {
    Ok(match value {
        AttrValue::Flag(b) => LuaValue::Boolean(b),
        AttrValue::Integer(i) => LuaValue::Integer(i),
        AttrValue::Scalar(n) => LuaValue::Number(n),
        AttrValue::Text(s) => LuaValue::String(lua.create_string(&s)?),
    })
}

fn attr_from_lua(value: LuaValue) -> LuaResult<AttrValue> {
    match value {
        LuaValue::Boolean(b) => Ok(AttrValue::Flag(b)),
        LuaValue::Integer(i) => Ok(AttrValue::Integer(i)),
        LuaValue::Number(n) => Ok(AttrValue::Scalar(n)),
        LuaValue::String(s) => Ok(AttrValue::Text(s.to_str()?.to_string())),
        other => Err(LuaError::runtime(format!(
            "unsupported attribute value of type {}",
            other.type_name()
        ))),
    }
}

/// Read a cell from `{x, y}` or `{x = .., y = ..}`.
pub(crate) fn coord_from_lua(value: &LuaValue) -> Option<Coord> {
    let LuaValue::Table(t) = value else {
        return None;
    };
    let x = t
        .get::<Option<i32>>("x")
        .ok()
        .flatten()
        .or_else(|| t.get::<Option<i32>>(1).ok().flatten())?;
    let y = t
        .get::<Option<i32>>("y")
        .ok()
        .flatten()
        .or_else(|| t.get::<Option<i32>>(2).ok().flatten())?;
    Some(Coord::new(x, y))
}
