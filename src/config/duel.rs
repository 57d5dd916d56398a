//! Duel room and bot opponent configuration

use crate::types::QuestionType;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for the duel room state machine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DuelSettings {
    /// Number of questions (rounds) per game
    pub questions_per_game: usize,
    /// Question type requested from the supplier
    pub question_type: QuestionType,
    /// Delay between MATCH_SUCCESS and the first QUESTION
    pub start_delay_ms: u64,
    /// Time allowed per round
    pub round_timeout_seconds: u64,
    /// Time the round result stays on screen before the next transition
    pub result_view_seconds: u64,
    /// Points awarded per correct answer
    pub points_per_correct: u32,
    /// Starting stock of each item kind per real seat
    pub items_per_kind: u32,
    /// Duration of the FOG effect shown to the opponent
    pub fog_duration_ms: u64,
}

impl Default for DuelSettings {
    fn default() -> Self {
        Self {
            questions_per_game: 5,
            question_type: QuestionType::SingleChoice,
            start_delay_ms: 1000,
            round_timeout_seconds: 20,
            result_view_seconds: 3,
            points_per_correct: 20,
            items_per_kind: 1,
            fog_duration_ms: 3000,
        }
    }
}

impl DuelSettings {
    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    pub fn round_timeout(&self) -> Duration {
        Duration::from_secs(self.round_timeout_seconds)
    }

    pub fn result_view(&self) -> Duration {
        Duration::from_secs(self.result_view_seconds)
    }
}

/// Settings for the simulated bot opponent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotSettings {
    /// Lower bound of the answer delay
    pub min_delay_ms: u64,
    /// Upper bound of the answer delay, must stay below the round timeout
    pub max_delay_ms: u64,
    /// Probability of answering correctly
    pub accuracy: f64,
    /// Derive the accuracy from question difficulty when available
    pub difficulty_scaling: bool,
    /// Seed for reproducible bot behavior
    pub seed: Option<u64>,
    /// Display name of the synthetic opponent
    pub name: String,
    /// Avatar of the synthetic opponent
    pub avatar: Option<String>,
    /// Rating range the synthetic opponent is drawn from
    pub min_rating: u32,
    pub max_rating: u32,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            min_delay_ms: 3000,
            max_delay_ms: 15000,
            accuracy: 0.6,
            difficulty_scaling: false,
            seed: None,
            name: "AI Tutor".to_string(),
            avatar: Some("https://cdn.quiz-arena.local/avatars/ai-tutor.png".to_string()),
            min_rating: 500,
            max_rating: 700,
        }
    }
}
