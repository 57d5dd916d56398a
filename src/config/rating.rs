//! Rating settlement configuration

use serde::{Deserialize, Serialize};

/// Point deltas applied when a game is settled
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingSettings {
    pub win_delta: i64,
    pub lose_delta: i64,
    pub draw_delta: i64,
    /// Rating points never drop below this value
    pub floor: u32,
}

impl Default for RatingSettings {
    fn default() -> Self {
        Self {
            win_delta: 20,
            lose_delta: -10,
            draw_delta: 5,
            floor: 0,
        }
    }
}
