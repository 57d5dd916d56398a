//! Error types for the quiz arena service
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific arena scenarios
#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    #[error("Invalid client message: {reason}")]
    InvalidMessage { reason: String },

    #[error("Player already queued: {player_id}")]
    AlreadyQueued { player_id: String },

    #[error("Player already in a room: {player_id}")]
    AlreadyInRoom { player_id: String },

    #[error("Player not found: {player_id}")]
    PlayerNotFound { player_id: String },

    #[error("Room not found: {room_id}")]
    RoomNotFound { room_id: String },

    #[error("Question supply failed: {reason}")]
    QuestionSupplyFailed { reason: String },

    #[error("Rating settlement failed: {reason}")]
    SettlementFailed { reason: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}
