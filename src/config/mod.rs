//! Configuration management for the quiz-arena service
//!
//! This module handles all configuration loading from environment variables
//! and TOML files, validation, and default values for the arena service.

pub mod app;
pub mod duel;
pub mod rating;

// Re-export commonly used types
pub use app::{
    validate_config, AppConfig, MatchmakingSettings, PlayerSettings, QuestionSettings,
    ServiceSettings,
};
pub use duel::{BotSettings, DuelSettings};
pub use rating::RatingSettings;
