//! Duel rooms
//!
//! `room` is the per-game state machine, `arena` runs live rooms: locking,
//! timers, bot answers, message delivery and settlement dispatch.

pub mod arena;
pub mod room;

pub use arena::{DuelArena, RoomSnapshot};
pub use room::{DuelRoom, ItemUse, RoomPhase, RoundResult, SeatInfo, SubmitOutcome};
