//! ECS components for board objects.
//!
//! Every object on the board is an entity carrying a handful of these
//! components. They hold data only; the rules that act on them live in
//! [`crate::systems`].
//!
//! Submodules overview:
//! - [`animation`] – current animation state and playback progress
//! - [`attributes`] – free-form per-object values set by behaviors
//! - [`category`] – what kind of object an entity is (piece, hazard, tile, UI)
//! - [`gridposition`] – board coordinates and the cached per-object cell
//! - [`lifecycle`] – active/dying/tearing-down state and the template link
//! - [`movementtype`] – movement patterns of pieces
//! - [`objectid`] – stable object ids
//! - [`piececolor`] – side a piece plays for

pub mod animation;
pub mod attributes;
pub mod category;
pub mod gridposition;
pub mod lifecycle;
pub mod movementtype;
pub mod objectid;
pub mod piececolor;
