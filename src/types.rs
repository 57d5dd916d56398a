//! Common types used throughout the quiz arena service

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for players
pub type PlayerId = String;

/// Opaque handle for one open client connection
pub type ConnectionId = Uuid;

/// Unique identifier for duel rooms
pub type RoomId = Uuid;

/// Coarse skill bucket derived from rating points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
}

impl Tier {
    /// All tiers in ascending order
    pub const ALL: [Tier; 3] = [Tier::Bronze, Tier::Silver, Tier::Gold];

    /// Position of the tier in ascending order
    pub fn index(self) -> usize {
        match self {
            Tier::Bronze => 0,
            Tier::Silver => 1,
            Tier::Gold => 2,
        }
    }

    /// Tiers directly below and above this one
    pub fn adjacent(self) -> Vec<Tier> {
        let idx = self.index();
        Tier::ALL
            .iter()
            .copied()
            .filter(|t| t.index().abs_diff(idx) == 1)
            .collect()
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Bronze => write!(f, "BRONZE"),
            Tier::Silver => write!(f, "SILVER"),
            Tier::Gold => write!(f, "GOLD"),
        }
    }
}

/// Player identity as known by the player directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub id: PlayerId,
    pub name: String,
    pub avatar: Option<String>,
    pub rating_points: u32,
}

/// Kind of question requested from the question supplier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleChoice,
}

/// A single quiz question as delivered by the question supplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: u64,
    pub content: String,
    pub options: Vec<String>,
    /// Correct option label, e.g. "B"
    pub answer: String,
    /// 0.0 (easy) to 1.0 (hard)
    #[serde(default)]
    pub difficulty: Option<f64>,
}

/// One of the two seats of a duel room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seat {
    A,
    B,
}

impl Seat {
    pub fn other(self) -> Seat {
        match self {
            Seat::A => Seat::B,
            Seat::B => Seat::A,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Seat::A => 0,
            Seat::B => 1,
        }
    }
}

/// Final result of a game from one seat's perspective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameOutcome {
    Win,
    Lose,
    Draw,
}

impl GameOutcome {
    /// Outcome for a seat given both final scores
    pub fn from_scores(own: u32, opponent: u32) -> Self {
        match own.cmp(&opponent) {
            std::cmp::Ordering::Greater => GameOutcome::Win,
            std::cmp::Ordering::Less => GameOutcome::Lose,
            std::cmp::Ordering::Equal => GameOutcome::Draw,
        }
    }
}

impl std::fmt::Display for GameOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameOutcome::Win => write!(f, "WIN"),
            GameOutcome::Lose => write!(f, "LOSE"),
            GameOutcome::Draw => write!(f, "DRAW"),
        }
    }
}

/// In-game items usable through USE_ITEM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemKind {
    Fog,
    Hint,
}

impl std::str::FromStr for ItemKind {
    type Err = crate::error::ArenaError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FOG" => Ok(ItemKind::Fog),
            "HINT" => Ok(ItemKind::Hint),
            other => Err(crate::error::ArenaError::InvalidMessage {
                reason: format!("Unknown item type: {}", other),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjacent_tiers() {
        assert_eq!(Tier::Bronze.adjacent(), vec![Tier::Silver]);
        assert_eq!(Tier::Silver.adjacent(), vec![Tier::Bronze, Tier::Gold]);
        assert_eq!(Tier::Gold.adjacent(), vec![Tier::Silver]);
    }

    #[test]
    fn test_outcome_from_scores() {
        assert_eq!(GameOutcome::from_scores(40, 20), GameOutcome::Win);
        assert_eq!(GameOutcome::from_scores(0, 20), GameOutcome::Lose);
        assert_eq!(GameOutcome::from_scores(60, 60), GameOutcome::Draw);
    }

    #[test]
    fn test_item_kind_parsing() {
        assert_eq!("fog".parse::<ItemKind>().unwrap(), ItemKind::Fog);
        assert_eq!(" HINT ".parse::<ItemKind>().unwrap(), ItemKind::Hint);
        assert!("SHIELD".parse::<ItemKind>().is_err());
    }
}
