//! World-level terrain configuration.
//!
//! Set once per world; every chunk of the world shares the same tile size and
//! grid resolution.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Largest accepted `view_distance`; a window of this radius already holds
/// 16641 chunks.
pub const MAX_VIEW_DISTANCE: u32 = 64;

/// Terrain configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// World units per chunk edge (default: 200).
    pub tile_size: f32,

    /// Grid samples per chunk edge (default: 129). Odd values put a vertex at the
    /// chunk center.
    pub resolution: usize,

    /// Chunks kept resident in each direction around the viewer's tile (default: 3).
    pub view_distance: u32,

    /// Heights are clamped to `[-max_height, max_height]` (default: 20).
    pub max_height: f32,

    /// Largest brush radius in world units; larger requests are clamped (default: 400).
    pub max_brush_radius: f32,

    /// Longest track slope in world units; longer tracks are clamped (default: 800).
    pub max_track_length: f32,

    /// Widest track slope in world units; wider tracks are clamped (default: 100).
    pub max_track_width: f32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            tile_size: 200.0,
            resolution: 129,
            view_distance: 3,
            max_height: 20.0,
            max_brush_radius: 400.0,
            max_track_length: 800.0,
            max_track_width: 100.0,
        }
    }
}

impl TerrainConfig {
    /// Distance in world units between adjacent grid vertices.
    pub fn grid_spacing(&self) -> f32 {
        self.tile_size / (self.resolution - 1) as f32
    }

    /// Check that the values describe a usable grid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tile_size.is_finite() && self.tile_size > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "tile_size must be positive, got {}",
                self.tile_size
            )));
        }
        if self.resolution < 2 {
            return Err(ConfigError::Invalid(format!(
                "resolution must be at least 2, got {}",
                self.resolution
            )));
        }
        if !(self.max_height.is_finite() && self.max_height > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "max_height must be positive, got {}",
                self.max_height
            )));
        }
        if self.view_distance > MAX_VIEW_DISTANCE {
            return Err(ConfigError::Invalid(format!(
                "view_distance must be at most {}, got {}",
                MAX_VIEW_DISTANCE, self.view_distance
            )));
        }
        let limits = [
            ("max_brush_radius", self.max_brush_radius),
            ("max_track_length", self.max_track_length),
            ("max_track_width", self.max_track_width),
        ];
        for (name, value) in limits {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Load and validate a JSON configuration file. Missing fields take defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: TerrainConfig =
            serde_json::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

/// Errors that can occur while loading a configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading the file
    Io(std::io::Error),
    /// JSON syntax or type error
    Parse(String),
    /// Values outside their valid range
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Invalid(e) => write!(f, "Invalid configuration: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}
