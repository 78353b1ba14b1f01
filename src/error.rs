//! Error types shared across the engine.
//!
//! None of these are fatal. Grid and registry operations return
//! [`BoardError`], the movement validator reports [`MoveError`] as a rejection
//! reason, and behavior callbacks fail with [`CallbackError`], which the
//! scheduler catches at the task boundary.

use thiserror::Error;

use crate::components::gridposition::Coord;

/// Failures of grid and registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("cell {0} is outside the board")]
    OutOfBounds(Coord),
    #[error("cell {0} is already occupied")]
    Occupied(Coord),
    #[error("unknown object template '{0}'")]
    UnknownTemplate(String),
    #[error("object {0} does not exist")]
    UnknownObject(u64),
    #[error("a {width}x{height} board has too many cells")]
    TooLarge { width: i32, height: i32 },
}

/// Reason a move request was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("target {0} is out of bounds or equal to the origin")]
    OutOfBounds(Coord),
    #[error("target {0} is occupied")]
    Occupied(Coord),
    #[error("target {0} holds a piece of the same color")]
    FriendlyFire(Coord),
    #[error("movement pattern '{0}' is not recognized")]
    InvalidMovementPattern(String),
    #[error("behavior fault in {callback}(): {message}")]
    BehaviorFault {
        callback: &'static str,
        message: String,
    },
    #[error("move from {from} to {to} is not allowed by the movement pattern")]
    IllegalMove { from: Coord, to: Coord },
    #[error("target {0} is not walkable")]
    Blocked(Coord),
    #[error("object {0} is not a piece")]
    NotAPiece(u64),
    #[error("object {id} is not at {from}")]
    StaleOrigin { id: u64, from: Coord },
    #[error("object {0} does not exist")]
    UnknownObject(u64),
}

/// A behavior callback failed while executing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CallbackError {
    pub message: String,
}

impl CallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(feature = "lua")]
impl From<mlua::Error> for CallbackError {
    fn from(err: mlua::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Result type returned by behavior callbacks.
pub type CallbackResult<T> = Result<T, CallbackError>;

/// Failures while loading or saving the INI configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config file {path}: {message}")]
    Load { path: String, message: String },
    #[error("failed to save config file {path}: {source}")]
    Save {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid value for [{section}] {key}: {message}")]
    Invalid {
        section: String,
        key: String,
        message: String,
    },
}

/// Failures while decoding object templates.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to parse templates: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read template file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("template '{0}' is declared twice")]
    Duplicate(String),
}
