//! Quiz Arena - real-time quiz duel matchmaking and room orchestration
//!
//! Players connect over WebSocket, queue by rating tier and are paired into
//! timed head-to-head quiz rooms, with a simulated opponent as fallback for
//! players who wait too long. Finished games settle rating points through an
//! external collaborator.

pub mod bot;
pub mod config;
pub mod duel;
pub mod error;
pub mod matchmaking;
pub mod metrics;
pub mod protocol;
pub mod questions;
pub mod rating;
pub mod service;
pub mod session;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{ArenaError, Result};
pub use types::*;

// Re-export key components
pub use duel::DuelArena;
pub use matchmaking::MatchmakingManager;
pub use protocol::{ClientMessage, ServerMessage};
pub use session::{ConnectionRegistry, SessionRouter};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
