use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CoreConfig {
    pub tile_width: u32,
    pub tile_height: u32,
    pub target_tps: u32,
    pub orthogonal_walk_ms: u64,
    pub diagonal_walk_ms: u64,
    pub max_ticks_per_advance: u32,
    pub max_frame_delta_ms: u64,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Vertical distance between a character's tile anchor and the top of its sprite.
    pub character_lift_px: f32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            tile_width: 70,
            tile_height: 36,
            target_tps: 30,
            orthogonal_walk_ms: 500,
            diagonal_walk_ms: 750,
            max_ticks_per_advance: 5,
            max_frame_delta_ms: 250,
            viewport_width: 800,
            viewport_height: 600,
            character_lift_px: 88.0,
        }
    }
}

impl CoreConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Whole milliseconds per tick, truncated the same way the frame budget is.
    pub fn tick_ms(&self) -> u64 {
        (1000 / self.target_tps.max(1) as u64).max(1)
    }

    pub fn fixed_dt(&self) -> Duration {
        Duration::from_millis(self.tick_ms())
    }

    pub fn max_frame_delta(&self) -> Duration {
        if self.max_frame_delta_ms == 0 {
            return Duration::from_millis(250);
        }
        Duration::from_millis(self.max_frame_delta_ms)
    }

    pub fn walk_ticks(&self, diagonal: bool) -> u32 {
        let duration_ms = if diagonal {
            self.diagonal_walk_ms
        } else {
            self.orthogonal_walk_ms
        };
        let ticks = duration_ms.div_ceil(self.tick_ms());
        ticks.clamp(1, u32::MAX as u64) as u32
    }
}
