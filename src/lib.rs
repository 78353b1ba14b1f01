//! Boardsim library.
//!
//! A turn-free board simulation engine: objects live on a 2D grid, pieces
//! move under fixed or scripted patterns, hazards roam the board, and every
//! object runs a cooperative behavior task that can wait on the simulated
//! clock. The engine renders nothing; hosts read [`EffectCmd`]s back.
//!
//! Start with [`Simulation`].

pub mod behavior;
pub mod components;
pub mod error;
pub mod events;
pub mod resources;
pub mod simulation;
pub mod systems;

pub use behavior::{Behavior, BehaviorCtx, Flow, MoveDecision};
pub use components::animation::AnimationState;
pub use components::category::Category;
pub use components::gridposition::Coord;
pub use components::movementtype::MovementType;
pub use components::objectid::ObjectId;
pub use components::piececolor::PieceColor;
pub use error::{BoardError, CallbackError, CallbackResult, MoveError};
pub use events::effects::EffectCmd;
pub use resources::simconfig::SimConfig;
pub use resources::templatestore::{ObjectTemplate, TemplateStore};
pub use simulation::Simulation;
pub use systems::movement::MoveOutcome;
pub use systems::registry::ObjectSnapshot;
