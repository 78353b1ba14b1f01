use std::fmt;
use std::str::FromStr;

use bevy_ecs::prelude::Component;
use serde::{Deserialize, Serialize};

/// What kind of board object an entity is.
///
/// The category decides which cell slot the object takes: tiles sit in the
/// background slot, pieces/hazards/props in the occupant slot, and UI objects
/// stay off the grid.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Tile,
    Hazard,
    Piece,
    Prop,
    Ui,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Tile => "tile",
            Category::Hazard => "hazard",
            Category::Piece => "piece",
            Category::Prop => "prop",
            Category::Ui => "ui",
        }
    }

    /// True for categories that take the cell's occupant slot.
    pub fn occupies_cell(&self) -> bool {
        matches!(self, Category::Hazard | Category::Piece | Category::Prop)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tile" => Ok(Category::Tile),
            "hazard" => Ok(Category::Hazard),
            "piece" => Ok(Category::Piece),
            "prop" => Ok(Category::Prop),
            "ui" => Ok(Category::Ui),
            other => Err(format!("unknown category '{other}'")),
        }
    }
}
