//! Rating settlement and player directory interfaces
//!
//! Settlement applies a finished game's point delta to the persistent player
//! record. The in-memory store implements both the directory and settlement
//! sides and is used by the binaries and the tests.

use crate::config::RatingSettings;
use crate::error::{ArenaError, Result};
use crate::types::{GameOutcome, PlayerId, PlayerProfile, RoomId};
use crate::utils::current_timestamp;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::RwLock;
use tracing::{debug, info};

/// Facts handed to the settlement collaborator for one real seat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementRequest {
    /// Room the game was played in; together with `player_id` it identifies the settlement
    pub room_id: RoomId,
    pub player_id: PlayerId,
    /// `None` for a bot opponent
    pub opponent_id: Option<PlayerId>,
    pub opponent_name: String,
    pub outcome: GameOutcome,
    pub delta: i64,
}

/// Applies rating deltas to persistent player records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RatingSettlement: Send + Sync {
    /// Apply the delta of a finished game. A repeated request for the same
    /// room and player must not apply the delta twice.
    async fn settle_rating(&self, request: SettlementRequest) -> Result<()>;
}

/// Resolves connections to authenticated players
#[async_trait]
pub trait PlayerDirectory: Send + Sync {
    /// Look up the player owning an access token
    async fn authenticate(&self, token: &str) -> Result<Option<PlayerProfile>>;

    /// Fetch the current profile of a player
    async fn find_player(&self, player_id: &PlayerId) -> Result<Option<PlayerProfile>>;
}

/// Win/lose/draw point deltas with a lower bound on rating points
#[derive(Debug, Clone)]
pub struct RatingRules {
    settings: RatingSettings,
}

impl RatingRules {
    pub fn new(settings: RatingSettings) -> Self {
        Self { settings }
    }

    /// Delta applied for an outcome
    pub fn delta_for(&self, outcome: GameOutcome) -> i64 {
        match outcome {
            GameOutcome::Win => self.settings.win_delta,
            GameOutcome::Lose => self.settings.lose_delta,
            GameOutcome::Draw => self.settings.draw_delta,
        }
    }

    /// New rating points after applying `delta`, never below the floor
    pub fn apply(&self, points: u32, delta: i64) -> u32 {
        let updated = (points as i64 + delta).max(self.settings.floor as i64);
        updated.min(u32::MAX as i64) as u32
    }
}

impl Default for RatingRules {
    fn default() -> Self {
        Self::new(RatingSettings::default())
    }
}

/// History entry written for every settled seat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleRecord {
    pub room_id: RoomId,
    pub player_id: PlayerId,
    pub opponent_id: Option<PlayerId>,
    pub opponent_name: String,
    pub outcome: GameOutcome,
    pub delta: i64,
    pub points_after: u32,
    pub created_at: DateTime<Utc>,
}

/// One player of a roster file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub rating_points: u32,
    /// Access token the player connects with
    pub token: String,
}

/// On-disk layout of a roster file with `[[player]]` tables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterFile {
    #[serde(rename = "player", default)]
    pub players: Vec<RosterEntry>,
}

/// In-memory player store backing both the directory and settlement
#[derive(Debug)]
pub struct InMemoryPlayerStore {
    players: RwLock<HashMap<PlayerId, PlayerProfile>>,
    tokens: RwLock<HashMap<String, PlayerId>>,
    records: RwLock<Vec<BattleRecord>>,
    settled: RwLock<HashSet<(RoomId, PlayerId)>>,
    rules: RatingRules,
}

impl InMemoryPlayerStore {
    pub fn new(rules: RatingRules) -> Self {
        Self {
            players: RwLock::new(HashMap::new()),
            tokens: RwLock::new(HashMap::new()),
            records: RwLock::new(Vec::new()),
            settled: RwLock::new(HashSet::new()),
            rules,
        }
    }

    fn lock_error(what: &str) -> ArenaError {
        ArenaError::InternalError {
            message: format!("Failed to acquire {} lock", what),
        }
    }

    /// Register a player reachable through `token`
    pub fn insert_player(&self, profile: PlayerProfile, token: impl Into<String>) -> Result<()> {
        let mut tokens = self.tokens.write().map_err(|_| Self::lock_error("tokens"))?;
        let mut players = self
            .players
            .write()
            .map_err(|_| Self::lock_error("players"))?;

        tokens.insert(token.into(), profile.id.clone());
        players.insert(profile.id.clone(), profile);
        Ok(())
    }

    /// Build a store from a TOML roster file
    pub fn from_file(path: &Path, rules: RatingRules) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| ArenaError::ConfigurationError {
            message: format!("Failed to read player roster {}: {}", path.display(), e),
        })?;
        let roster: RosterFile =
            toml::from_str(&raw).map_err(|e| ArenaError::ConfigurationError {
                message: format!("Failed to parse player roster {}: {}", path.display(), e),
            })?;

        let store = Self::new(rules);
        for entry in roster.players {
            store.insert_player(
                PlayerProfile {
                    id: entry.id,
                    name: entry.name,
                    avatar: entry.avatar,
                    rating_points: entry.rating_points,
                },
                entry.token,
            )?;
        }
        info!("Loaded player roster from {}", path.display());
        Ok(store)
    }

    /// Current rating points of a player
    pub fn rating_points(&self, player_id: &str) -> Result<Option<u32>> {
        let players = self
            .players
            .read()
            .map_err(|_| Self::lock_error("players"))?;
        Ok(players.get(player_id).map(|p| p.rating_points))
    }

    /// Battle records written for a player, oldest first
    pub fn records_for(&self, player_id: &str) -> Result<Vec<BattleRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| Self::lock_error("records"))?;
        Ok(records
            .iter()
            .filter(|r| r.player_id == player_id)
            .cloned()
            .collect())
    }

    /// Every player profile (for reporting)
    pub fn all_players(&self) -> Result<Vec<PlayerProfile>> {
        let players = self
            .players
            .read()
            .map_err(|_| Self::lock_error("players"))?;
        let mut all: Vec<_> = players.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }
}

impl Default for InMemoryPlayerStore {
    fn default() -> Self {
        Self::new(RatingRules::default())
    }
}

#[async_trait]
impl PlayerDirectory for InMemoryPlayerStore {
    async fn authenticate(&self, token: &str) -> Result<Option<PlayerProfile>> {
        let player_id = {
            let tokens = self.tokens.read().map_err(|_| Self::lock_error("tokens"))?;
            tokens.get(token).cloned()
        };

        match player_id {
            Some(id) => self.find_player(&id).await,
            None => Ok(None),
        }
    }

    async fn find_player(&self, player_id: &PlayerId) -> Result<Option<PlayerProfile>> {
        let players = self
            .players
            .read()
            .map_err(|_| Self::lock_error("players"))?;
        Ok(players.get(player_id).cloned())
    }
}

#[async_trait]
impl RatingSettlement for InMemoryPlayerStore {
    async fn settle_rating(&self, request: SettlementRequest) -> Result<()> {
        let points_after = {
            let mut players = self
                .players
                .write()
                .map_err(|_| Self::lock_error("players"))?;
            let player =
                players
                    .get_mut(&request.player_id)
                    .ok_or_else(|| ArenaError::PlayerNotFound {
                        player_id: request.player_id.clone(),
                    })?;

            let mut settled = self
                .settled
                .write()
                .map_err(|_| Self::lock_error("settlement"))?;
            if !settled.insert((request.room_id, request.player_id.clone())) {
                debug!(
                    "Settlement for player '{}' in room {} already applied",
                    request.player_id, request.room_id
                );
                return Ok(());
            }

            player.rating_points = self.rules.apply(player.rating_points, request.delta);
            player.rating_points
        };

        {
            let mut records = self
                .records
                .write()
                .map_err(|_| Self::lock_error("records"))?;
            records.push(BattleRecord {
                room_id: request.room_id,
                player_id: request.player_id.clone(),
                opponent_id: request.opponent_id.clone(),
                opponent_name: request.opponent_name.clone(),
                outcome: request.outcome,
                delta: request.delta,
                points_after,
                created_at: current_timestamp(),
            });
        }

        info!(
            "Settled player '{}' in room {} - outcome: {}, delta: {:+}, points: {}",
            request.player_id, request.room_id, request.outcome, request.delta, points_after
        );
        Ok(())
    }
}
