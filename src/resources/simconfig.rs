//! Simulation configuration resource.
//!
//! Settings loaded from an INI file. Defaults are safe to start with, and any
//! key missing from the file keeps its default.
//!
//! # Configuration File Format
//!
//! ```ini
//! [board]
//! width = 8
//! height = 8
//!
//! [simulation]
//! tick_seconds = 0.05
//! time_scale = 1.0
//!
//! [animation]
//! hitbycar = 1.0
//! drowning = 1.5
//! burning = 1.2
//! death = 0.8
//! captured = 0.5
//! ```

use std::path::PathBuf;

use bevy_ecs::prelude::*;
use configparser::ini::Ini;
use log::info;
use rustc_hash::FxHashMap;

use crate::components::animation::AnimationState;
use crate::error::ConfigError;
use crate::resources::board::{MAX_CELLS, cell_count};

const DEFAULT_BOARD_WIDTH: i32 = 8;
const DEFAULT_BOARD_HEIGHT: i32 = 8;
const DEFAULT_TICK_SECONDS: f32 = 0.05;
const DEFAULT_TIME_SCALE: f32 = 1.0;
const DEFAULT_CONFIG_PATH: &str = "./boardsim.ini";

/// Default durations for the terminal animation states, in seconds.
const DEFAULT_DURATIONS: [(&str, f32); 5] = [
    ("hitbycar", 1.0),
    ("drowning", 1.5),
    ("burning", 1.2),
    ("death", 0.8),
    ("captured", 0.5),
];

#[derive(Resource, Debug, Clone)]
pub struct SimConfig {
    pub board_width: i32,
    pub board_height: i32,
    /// Fixed step used by the CLI driver.
    pub tick_seconds: f32,
    pub time_scale: f32,
    /// Fallback animation durations keyed by state name.
    pub animation_durations: FxHashMap<String, f32>,
    pub config_path: PathBuf,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SimConfig {
    pub fn new() -> Self {
        Self {
            board_width: DEFAULT_BOARD_WIDTH,
            board_height: DEFAULT_BOARD_HEIGHT,
            tick_seconds: DEFAULT_TICK_SECONDS,
            time_scale: DEFAULT_TIME_SCALE,
            animation_durations: DEFAULT_DURATIONS
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    pub fn with_board_size(mut self, width: i32, height: i32) -> Self {
        self.board_width = width;
        self.board_height = height;
        self
    }

    /// Fallback duration for `state`, if one is configured.
    pub fn animation_duration(&self, state: &AnimationState) -> Option<f32> {
        self.animation_durations.get(state.name()).copied()
    }

    /// Load configuration from the INI file at `config_path`.
    pub fn load_from_file(&mut self) -> Result<(), ConfigError> {
        let path = self.config_path.display().to_string();
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|message| ConfigError::Load {
                path: path.clone(),
                message,
            })?;

        // [board] section
        if let Some(width) = get_int(&config, "board", "width")? {
            self.board_width = positive(width, "board", "width")?;
        }
        if let Some(height) = get_int(&config, "board", "height")? {
            self.board_height = positive(height, "board", "height")?;
        }
        if cell_count(self.board_width, self.board_height).is_none() {
            return Err(ConfigError::Invalid {
                section: "board".to_string(),
                key: "width".to_string(),
                message: format!(
                    "a {}x{} board exceeds {} cells",
                    self.board_width, self.board_height, MAX_CELLS
                ),
            });
        }

        // [simulation] section
        if let Some(tick) = get_float(&config, "simulation", "tick_seconds")? {
            self.tick_seconds = tick as f32;
        }
        if let Some(scale) = get_float(&config, "simulation", "time_scale")? {
            self.time_scale = scale as f32;
        }

        // [animation] section: any state name, including theme extensions
        if let Some(section) = config.get_map_ref().get("animation") {
            for key in section.keys() {
                if let Some(seconds) = get_float(&config, "animation", key)? {
                    self.animation_durations.insert(key.clone(), seconds as f32);
                }
            }
        }

        info!(
            "Loaded config from {}: board {}x{}, tick={}s, time_scale={}",
            path, self.board_width, self.board_height, self.tick_seconds, self.time_scale
        );

        Ok(())
    }

    /// Save configuration to the INI file at `config_path`.
    pub fn save_to_file(&self) -> Result<(), ConfigError> {
        let mut config = Ini::new();

        config.set("board", "width", Some(self.board_width.to_string()));
        config.set("board", "height", Some(self.board_height.to_string()));
        config.set("simulation", "tick_seconds", Some(self.tick_seconds.to_string()));
        config.set("simulation", "time_scale", Some(self.time_scale.to_string()));
        for (state, seconds) in &self.animation_durations {
            config.set("animation", state, Some(seconds.to_string()));
        }

        config
            .write(&self.config_path)
            .map_err(|source| ConfigError::Save {
                path: self.config_path.display().to_string(),
                source,
            })?;

        info!("Saved config to {:?}", self.config_path);

        Ok(())
    }
}

fn get_int(config: &Ini, section: &str, key: &str) -> Result<Option<i64>, ConfigError> {
    config.getint(section, key).map_err(|message| ConfigError::Invalid {
        section: section.to_string(),
        key: key.to_string(),
        message,
    })
}

fn get_float(config: &Ini, section: &str, key: &str) -> Result<Option<f64>, ConfigError> {
    config.getfloat(section, key).map_err(|message| ConfigError::Invalid {
        section: section.to_string(),
        key: key.to_string(),
        message,
    })
}

fn positive(value: i64, section: &str, key: &str) -> Result<i32, ConfigError> {
    i32::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| ConfigError::Invalid {
            section: section.to_string(),
            key: key.to_string(),
            message: format!("expected a positive integer, got {value}"),
        })
}
