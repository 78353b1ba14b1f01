//! Engine systems.
//!
//! Most of these are plain functions over `&mut World` rather than scheduled
//! systems: behaviors call back into the engine while a tick is running, and
//! every such call needs the whole world.
//!
//! Submodules overview
//! - [`animation`] – advance playback, switch states, emit effect commands
//! - [`behavior`] – run behavior tasks, waits and event delivery
//! - [`collision`] – resolve attacker/defender collisions
//! - [`grid`] – board queries and occupancy updates
//! - [`movement`] – validate and apply moves
//! - [`registry`] – spawn, remove and inspect objects
//! - [`time`] – advance the simulated clock

pub mod animation;
pub mod behavior;
pub mod collision;
pub mod grid;
pub mod movement;
pub mod registry;
pub mod time;
