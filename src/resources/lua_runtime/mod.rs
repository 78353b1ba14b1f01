//! Lua scripting host for object behaviors.
//!
//! Behaviors can be written as Lua scripts and registered per template with
//! [`Simulation::register_lua_behavior`](crate::simulation::Simulation::register_lua_behavior).
//! Scripts reach the simulation through the global `engine` table.
//!
//! - [`runtime`] - the interpreter and the `engine` table bindings
//! - [`behavior`] - [`LuaBehavior`], the [`Behavior`](crate::behavior::Behavior) implementation
//!
//! # Example
//!
//! ```lua
//! local pawn = {}
//!
//! function pawn.init()
//!     engine.log("pawn " .. engine.self_id() .. " ready")
//! end
//!
//! function pawn.move_request(fx, fy, tx, ty)
//!     return { {0, 0}, {7, 0}, {0, 7}, {7, 7} }
//! end
//!
//! return pawn
//! ```

mod behavior;
mod runtime;

pub use behavior::LuaBehavior;
pub use runtime::LuaRuntime;
