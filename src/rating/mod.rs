//! Rating tiers and rating settlement
//!
//! This module provides the tier classifier used to scope matchmaking and the
//! collaborator interfaces that apply win/lose/draw deltas to player records.

pub mod settlement;
pub mod tier;

// Re-export commonly used types
pub use settlement::{
    BattleRecord, InMemoryPlayerStore, PlayerDirectory, RatingRules, RatingSettlement,
    RosterEntry, RosterFile, SettlementRequest,
};
pub use tier::classify;
