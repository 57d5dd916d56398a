//! Rating tier classifier

use crate::types::Tier;

/// Points at which a player leaves BRONZE
pub const SILVER_THRESHOLD: u32 = 200;

/// Points at which a player leaves SILVER
pub const GOLD_THRESHOLD: u32 = 500;

/// Map rating points to a tier
pub fn classify(rating_points: u32) -> Tier {
    if rating_points < SILVER_THRESHOLD {
        Tier::Bronze
    } else if rating_points < GOLD_THRESHOLD {
        Tier::Silver
    } else {
        Tier::Gold
    }
}
