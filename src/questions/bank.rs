//! Question supplier interface and the static question bank

use crate::error::{ArenaError, Result};
use crate::types::{Question, QuestionType};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Supplies the ordered question set of a new room
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestionSupplier: Send + Sync {
    /// Return up to `count` questions of the given type; an empty set is an error
    async fn supply_questions(
        &self,
        question_type: QuestionType,
        count: usize,
    ) -> Result<Vec<Question>>;
}

/// On-disk layout of a question bank file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionBankFile {
    #[serde(rename = "question")]
    pub questions: Vec<Question>,
}

/// Question bank held in memory that samples questions at random
pub struct StaticQuestionBank {
    questions: Vec<Question>,
    rng: Mutex<StdRng>,
}

impl StaticQuestionBank {
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            questions,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Bank with a fixed sampling seed
    pub fn with_seed(questions: Vec<Question>, seed: u64) -> Self {
        Self {
            questions,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Load a bank from a TOML file with `[[question]]` tables
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| ArenaError::ConfigurationError {
            message: format!("Failed to read question bank {}: {}", path.display(), e),
        })?;
        let file: QuestionBankFile =
            toml::from_str(&raw).map_err(|e| ArenaError::ConfigurationError {
                message: format!("Failed to parse question bank {}: {}", path.display(), e),
            })?;

        info!(
            "Loaded {} questions from {}",
            file.questions.len(),
            path.display()
        );
        Ok(Self::new(file.questions))
    }

    /// Small built-in bank used when no bank file is configured
    pub fn builtin() -> Self {
        let q = |id: u64, content: &str, options: [&str; 4], answer: &str, difficulty: f64| {
            Question {
                id,
                content: content.to_string(),
                options: options.iter().map(|o| o.to_string()).collect(),
                answer: answer.to_string(),
                difficulty: Some(difficulty),
            }
        };

        Self::new(vec![
            q(1, "What is 7 x 8?", ["A. 54", "B. 56", "C. 64", "D. 48"], "B", 0.1),
            q(2, "Which planet is closest to the sun?", ["A. Venus", "B. Earth", "C. Mercury", "D. Mars"], "C", 0.2),
            q(3, "What is the chemical symbol for sodium?", ["A. Na", "B. So", "C. Sd", "D. S"], "A", 0.3),
            q(4, "How many sides does a hexagon have?", ["A. 5", "B. 7", "C. 8", "D. 6"], "D", 0.1),
            q(5, "What is the derivative of x^2?", ["A. x", "B. 2x", "C. x^3/3", "D. 2"], "B", 0.4),
            q(6, "Which gas do plants absorb for photosynthesis?", ["A. Oxygen", "B. Nitrogen", "C. Carbon dioxide", "D. Helium"], "C", 0.2),
            q(7, "What is the square root of 144?", ["A. 12", "B. 14", "C. 11", "D. 16"], "A", 0.1),
            q(8, "Which data structure is FIFO?", ["A. Stack", "B. Queue", "C. Tree", "D. Heap"], "B", 0.3),
            q(9, "What is the boiling point of water at sea level in Celsius?", ["A. 90", "B. 110", "C. 100", "D. 120"], "C", 0.1),
            q(10, "What is 15% of 200?", ["A. 25", "B. 35", "C. 20", "D. 30"], "D", 0.3),
        ])
    }

    /// Number of questions in the bank
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }
}

#[async_trait]
impl QuestionSupplier for StaticQuestionBank {
    async fn supply_questions(
        &self,
        question_type: QuestionType,
        count: usize,
    ) -> Result<Vec<Question>> {
        if self.questions.is_empty() || count == 0 {
            return Err(ArenaError::QuestionSupplyFailed {
                reason: format!("No {:?} questions available", question_type),
            }
            .into());
        }

        let mut rng = self.rng.lock().map_err(|_| ArenaError::InternalError {
            message: "Failed to acquire question bank rng lock".to_string(),
        })?;

        Ok(self
            .questions
            .choose_multiple(&mut *rng, count.min(self.questions.len()))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_supplies_distinct_questions() {
        let bank = StaticQuestionBank::with_seed(StaticQuestionBank::builtin().questions, 7);
        let questions = bank
            .supply_questions(QuestionType::SingleChoice, 5)
            .await
            .unwrap();

        assert_eq!(questions.len(), 5);
        let ids: HashSet<_> = questions.iter().map(|q| q.id).collect();
        assert_eq!(ids.len(), 5);
    }

    #[tokio::test]
    async fn test_small_bank_returns_what_it_has() {
        let bank = StaticQuestionBank::new(StaticQuestionBank::builtin().questions[..2].to_vec());
        let questions = bank
            .supply_questions(QuestionType::SingleChoice, 5)
            .await
            .unwrap();
        assert_eq!(questions.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_bank_fails() {
        let bank = StaticQuestionBank::new(Vec::new());
        assert!(bank
            .supply_questions(QuestionType::SingleChoice, 5)
            .await
            .is_err());
    }

    #[test]
    fn test_parse_bank_file() {
        let file: QuestionBankFile = toml::from_str(
            r#"
            [[question]]
            id = 1
            content = "2 + 2 = ?"
            options = ["A. 3", "B. 4"]
            answer = "B"

            [[question]]
            id = 2
            content = "Capital of France?"
            options = ["A. Paris", "B. Rome", "C. Madrid"]
            answer = "A"
            difficulty = 0.2
            "#,
        )
        .unwrap();

        assert_eq!(file.questions.len(), 2);
        assert_eq!(file.questions[0].difficulty, None);
        assert_eq!(file.questions[1].difficulty, Some(0.2));
    }
}
