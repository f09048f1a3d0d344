use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Tunables shared by both scenes. Every field falls back to its default when
/// omitted from a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Sprite and map scale; one map pixel covers this many page pixels.
    pub scale_factor: f32,
    /// Player speed in page pixels per second.
    pub player_speed: f32,
    pub reveal_interval_ms: u64,
    /// The follow camera sits this far above the player.
    pub camera_offset_y: f32,
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Exclusive pointer angle thresholds, in degrees.
    pub angle_lower_bound: f32,
    pub angle_upper_bound: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            scale_factor: 4.0,
            player_speed: 250.0,
            reveal_interval_ms: 1,
            camera_offset_y: 100.0,
            canvas_width: 960,
            canvas_height: 540,
            angle_lower_bound: 50.0,
            angle_upper_bound: 125.0,
        }
    }
}

impl GameConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("invalid config JSON")
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("unable to read config {}", path.display()))?;
        Self::from_json(&text)
    }

    /// Edge length of one map tile in page pixels.
    pub fn tile_size(&self) -> f32 {
        16.0 * self.scale_factor
    }

    pub fn reveal_interval(&self) -> Duration {
        Duration::from_millis(self.reveal_interval_ms.max(1))
    }
}
