use std::fmt;
use std::str::FromStr;

use bevy_ecs::prelude::Component;
use serde::{Deserialize, Serialize};

/// Side a piece belongs to.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceColor {
    White,
    Black,
    Neutral,
}

impl PieceColor {
    /// Direction pawns of this color advance along the y axis.
    ///
    /// Neutral has no forward direction.
    pub fn forward(&self) -> Option<i32> {
        match self {
            PieceColor::White => Some(1),
            PieceColor::Black => Some(-1),
            PieceColor::Neutral => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PieceColor::White => "white",
            PieceColor::Black => "black",
            PieceColor::Neutral => "neutral",
        }
    }
}

impl fmt::Display for PieceColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PieceColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "white" => Ok(PieceColor::White),
            "black" => Ok(PieceColor::Black),
            "neutral" => Ok(PieceColor::Neutral),
            other => Err(format!("unknown piece color '{other}'")),
        }
    }
}
