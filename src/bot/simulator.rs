//! Bot opponent simulator
//!
//! Produces the synthetic identity of a bot seat and decides when and what the
//! bot answers in each round. Scheduling and submission live in the arena so
//! the bot goes through the same answer path as a real connection.

use crate::config::BotSettings;
use crate::types::{PlayerProfile, Question};
use crate::utils::wrong_option_labels;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Accuracy of the bot on a question of difficulty 0
const SCALED_BASE_ACCURACY: f64 = 0.95;
/// Accuracy lost per unit of difficulty
const SCALED_ACCURACY_SLOPE: f64 = 0.6;

/// Decides bot identities, answer delays and answers
#[derive(Debug)]
pub struct BotSimulator {
    settings: BotSettings,
    rng: Mutex<StdRng>,
}

impl BotSimulator {
    pub fn new(settings: BotSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            settings,
            rng: Mutex::new(rng),
        }
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        // a panic while sampling cannot leave the rng in a broken state
        self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn settings(&self) -> &BotSettings {
        &self.settings
    }

    /// Fresh synthetic opponent identity with a random rating in the configured range
    pub fn bot_profile(&self) -> PlayerProfile {
        let rating_points = self
            .rng()
            .gen_range(self.settings.min_rating..=self.settings.max_rating);

        PlayerProfile {
            id: format!("bot-{}", Uuid::new_v4()),
            name: self.settings.name.clone(),
            avatar: self.settings.avatar.clone(),
            rating_points,
        }
    }

    /// Delay before the bot answers, uniform over the configured bounds
    pub fn answer_delay(&self) -> Duration {
        let millis = self
            .rng()
            .gen_range(self.settings.min_delay_ms..=self.settings.max_delay_ms);
        Duration::from_millis(millis)
    }

    /// Probability of a correct answer on `question`
    pub fn accuracy_for(&self, question: &Question) -> f64 {
        match (self.settings.difficulty_scaling, question.difficulty) {
            (true, Some(difficulty)) if difficulty.is_finite() => (SCALED_BASE_ACCURACY
                - SCALED_ACCURACY_SLOPE * difficulty.clamp(0.0, 1.0))
            .clamp(0.0, 1.0),
            _ => self.settings.accuracy,
        }
    }

    /// Answer the bot submits: the correct label with the configured
    /// probability, otherwise a uniformly chosen wrong label.
    pub fn choose_answer(&self, question: &Question) -> String {
        let accuracy = self.accuracy_for(question);
        let mut rng = self.rng();

        if rng.gen_bool(accuracy) {
            return question.answer.trim().to_string();
        }

        let wrong = wrong_option_labels(question.options.len(), &question.answer);
        match wrong.choose(&mut *rng) {
            Some(label) => label.clone(),
            None => {
                debug!("Question {} has no wrong option, bot leaves it blank", question.id);
                String::new()
            }
        }
    }
}
