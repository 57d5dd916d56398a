//! Client/server message envelopes for the duel socket
//!
//! Every frame is a small JSON object `{"type": ..., "data": ...}`.

use crate::error::{ArenaError, Result};
use crate::types::{GameOutcome, ItemKind, PlayerProfile, Tier};
use serde::{Deserialize, Serialize};

/// Messages sent by a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Enter matchmaking
    Match,
    /// Leave matchmaking
    Cancel,
    /// Answer for the current round
    Answer(String),
    /// Use an in-game item
    UseItem(String),
}

impl ClientMessage {
    /// Parse a text frame
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| {
            ArenaError::InvalidMessage {
                reason: format!("Failed to parse client message: {}", e),
            }
            .into()
        })
    }
}

/// Opponent display info sent on MATCH_SUCCESS
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpponentInfo {
    pub name: String,
    pub avatar: Option<String>,
    pub points: u32,
    pub tier: Tier,
    pub is_bot: bool,
}

impl OpponentInfo {
    pub fn from_profile(profile: &PlayerProfile, is_bot: bool) -> Self {
        Self {
            name: profile.name.clone(),
            avatar: profile.avatar.clone(),
            points: profile.rating_points,
            tier: crate::rating::classify(profile.rating_points),
            is_bot,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSuccess {
    pub room_id: String,
    pub opponent: OpponentInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPayload {
    pub content: String,
    pub options: Vec<String>,
    /// 1-based round number
    pub round: usize,
    pub total: usize,
}

/// Per-seat view of a resolved round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResultPayload {
    pub correct_answer: String,
    pub my_answer: Option<String>,
    pub opp_answer: Option<String>,
    pub my_score: u32,
    pub opp_score: u32,
    pub is_correct: bool,
    pub score_change: u32,
}

/// Game result from the recipient's perspective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Winner {
    You,
    Opponent,
    Draw,
}

impl From<GameOutcome> for Winner {
    fn from(outcome: GameOutcome) -> Self {
        match outcome {
            GameOutcome::Win => Winner::You,
            GameOutcome::Lose => Winner::Opponent,
            GameOutcome::Draw => Winner::Draw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOverPayload {
    pub result: Winner,
    pub my_score: u32,
    pub opp_score: u32,
    /// Rating delta applied by settlement
    pub score_change: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemEffect {
    Fog {
        duration: u64,
    },
    #[serde(rename_all = "camelCase")]
    Hint {
        wrong_option: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemUsed {
    pub item: ItemKind,
}

/// Messages pushed to a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    MatchSuccess(MatchSuccess),
    Question(QuestionPayload),
    RoundResult(RoundResultPayload),
    GameOver(GameOverPayload),
    OpponentLeft,
    ItemEffect(ItemEffect),
    ItemUsed(ItemUsed),
}

impl ServerMessage {
    /// Wire name of the message type
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::MatchSuccess(_) => "MATCH_SUCCESS",
            ServerMessage::Question(_) => "QUESTION",
            ServerMessage::RoundResult(_) => "ROUND_RESULT",
            ServerMessage::GameOver(_) => "GAME_OVER",
            ServerMessage::OpponentLeft => "OPPONENT_LEFT",
            ServerMessage::ItemEffect(_) => "ITEM_EFFECT",
            ServerMessage::ItemUsed(_) => "ITEM_USED",
        }
    }

    /// Serialize to a JSON text frame
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            ArenaError::InternalError {
                message: format!("Failed to serialize server message: {}", e),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_client_messages() {
        assert_eq!(
            ClientMessage::parse(r#"{"type":"MATCH"}"#).unwrap(),
            ClientMessage::Match
        );
        assert_eq!(
            ClientMessage::parse(r#"{"type":"ANSWER","data":"B"}"#).unwrap(),
            ClientMessage::Answer("B".to_string())
        );
        assert_eq!(
            ClientMessage::parse(r#"{"type":"USE_ITEM","data":"HINT"}"#).unwrap(),
            ClientMessage::UseItem("HINT".to_string())
        );
    }

    #[test]
    fn test_rejects_malformed_client_messages() {
        assert!(ClientMessage::parse("not json").is_err());
        assert!(ClientMessage::parse(r#"{"type":"DANCE"}"#).is_err());
        assert!(ClientMessage::parse(r#"{"type":"ANSWER"}"#).is_err());
    }

    #[test]
    fn test_server_message_shape() {
        let msg = ServerMessage::GameOver(GameOverPayload {
            result: Winner::You,
            my_score: 60,
            opp_score: 40,
            score_change: 20,
        });
        let value: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "GAME_OVER",
                "data": {"result": "YOU", "myScore": 60, "oppScore": 40, "scoreChange": 20}
            })
        );

        let left: serde_json::Value =
            serde_json::from_str(&ServerMessage::OpponentLeft.to_json().unwrap()).unwrap();
        assert_eq!(left, json!({"type": "OPPONENT_LEFT"}));
    }

    #[test]
    fn test_item_effect_shape() {
        let msg = ServerMessage::ItemEffect(ItemEffect::Hint {
            wrong_option: "C".to_string(),
        });
        let value: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"type": "ITEM_EFFECT", "data": {"effect": "HINT", "wrongOption": "C"}})
        );
    }
}
