//! ECS resources of a simulation.
//!
//! This module groups the long-lived data injected into the simulation's
//! world. Each submodule documents the semantics of its resource(s).
//!
//! Overview
//! - `board` – cell geometry, tiles and occupancy
//! - `lua_runtime` – Lua interpreter for scripted behaviors (feature `lua`)
//! - `objectindex` – stable object ids mapped to entities
//! - `scheduler` – behavior tasks, suspensions and the pending event queue
//! - `simconfig` – settings loaded from an INI file
//! - `templatestore` – object templates keyed by id
//! - `worldtime` – simulated clock and tick delta
pub mod board;
#[cfg(feature = "lua")]
pub mod lua_runtime;
pub mod objectindex;
pub mod scheduler;
pub mod simconfig;
pub mod templatestore;
pub mod worldtime;
