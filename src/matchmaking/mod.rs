//! Matchmaking
//!
//! Tier queues plus the manager that pairs waiting players with each other
//! or, after a long wait, with a bot.

pub mod manager;
pub mod queue;

pub use manager::{CancelOutcome, MatchmakingManager, MatchmakingStats, ScanReport};
pub use queue::{TierQueues, WaitingEntry};
