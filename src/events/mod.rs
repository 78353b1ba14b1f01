//! Event types exchanged between the engine's subsystems.
//!
//! Submodules:
//! - [`collision`] – collision triggers, recorded contacts and outcomes
//! - [`effects`] – sound/effect/message commands sent to the host
//! - [`pending`] – events queued for delivery to behavior tasks
pub mod collision;
pub mod effects;
pub mod pending;
