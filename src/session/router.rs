//! Inbound message routing
//!
//! Every client frame goes through [`SessionRouter::handle_text`]. Protocol
//! errors never reach the client: they are logged at debug level, counted,
//! and dropped.

use crate::duel::DuelArena;
use crate::error::{ArenaError, Result};
use crate::matchmaking::{CancelOutcome, MatchmakingManager};
use crate::metrics::MetricsCollector;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::rating::PlayerDirectory;
use crate::session::registry::{Binding, ConnectionRegistry};
use crate::types::{ConnectionId, ItemKind, PlayerProfile, RoomId, Seat};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Routes client frames to matchmaking or to the player's room
#[derive(Clone)]
pub struct SessionRouter {
    registry: Arc<ConnectionRegistry>,
    matchmaking: MatchmakingManager,
    arena: DuelArena,
    directory: Arc<dyn PlayerDirectory>,
    metrics: Arc<MetricsCollector>,
}

impl SessionRouter {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        matchmaking: MatchmakingManager,
        arena: DuelArena,
        directory: Arc<dyn PlayerDirectory>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            registry,
            matchmaking,
            arena,
            directory,
            metrics,
        }
    }

    /// Open a session for an authenticated player
    pub fn connect(
        &self,
        profile: PlayerProfile,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<ServerMessage>) {
        info!("Player '{}' connected", profile.id);
        self.metrics.connection_opened();
        self.registry.register(profile)
    }

    /// Handle one text frame from `connection`
    pub async fn handle_text(&self, connection: ConnectionId, text: &str) {
        let message = match ClientMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                debug!("Ignoring malformed frame from {}: {}", connection, e);
                self.metrics.record_protocol_error("malformed");
                return;
            }
        };

        if let Err(e) = self.dispatch(connection, message).await {
            debug!("Ignoring message from {}: {}", connection, e);
            self.metrics.record_protocol_error("rejected");
        }
    }

    /// Handle a parsed client message
    pub async fn dispatch(&self, connection: ConnectionId, message: ClientMessage) -> Result<()> {
        let profile = self
            .registry
            .profile(connection)
            .ok_or_else(|| ArenaError::InvalidMessage {
                reason: format!("Unknown connection {}", connection),
            })?;

        match message {
            ClientMessage::Match => {
                let current = self.refresh_profile(profile).await;
                self.matchmaking.enqueue(connection, current)?;
            }
            ClientMessage::Cancel => {
                self.matchmaking.cancel(connection, &profile.id)?;
            }
            ClientMessage::Answer(answer) => {
                let (room_id, seat) = self.seat_of(connection, &profile)?;
                if !self.arena.submit(room_id, seat, &answer, None).await {
                    return Err(ArenaError::InvalidMessage {
                        reason: format!("Answer not accepted in room {}", room_id),
                    }
                    .into());
                }
            }
            ClientMessage::UseItem(item) => {
                let kind: ItemKind = item.parse()?;
                let (room_id, seat) = self.seat_of(connection, &profile)?;
                self.arena.use_item(room_id, seat, kind).await?;
            }
        }
        Ok(())
    }

    /// Current rating from the directory, falling back to the connection profile
    async fn refresh_profile(&self, profile: PlayerProfile) -> PlayerProfile {
        match self.directory.find_player(&profile.id).await {
            Ok(Some(current)) => current,
            Ok(None) => {
                debug!("Player '{}' missing from directory, using session profile", profile.id);
                profile
            }
            Err(e) => {
                warn!("Failed to refresh player '{}': {}", profile.id, e);
                profile
            }
        }
    }

    fn seat_of(&self, connection: ConnectionId, profile: &PlayerProfile) -> Result<(RoomId, Seat)> {
        match self.registry.binding_of(connection, &profile.id) {
            Some(Binding::InRoom { room_id, seat, .. }) => Ok((room_id, seat)),
            _ => Err(ArenaError::InvalidMessage {
                reason: format!("Player '{}' is not in a room", profile.id),
            }
            .into()),
        }
    }

    /// Tear down a closed connection: leave the queue or abandon the room
    pub async fn handle_disconnect(&self, connection: ConnectionId) {
        let Some(profile) = self.registry.unregister(connection) else {
            return;
        };
        self.metrics.connection_closed();

        match self.matchmaking.cancel(connection, &profile.id) {
            Ok(CancelOutcome::Seated { room_id, seat }) => {
                if !self.arena.abandon(room_id, seat).await {
                    // room already finished; drop a leftover binding
                    self.registry.release(&profile.id, connection);
                }
            }
            Ok(CancelOutcome::Dequeued | CancelOutcome::Unbound) => {}
            Err(e) => warn!("Failed to dequeue disconnected player '{}': {}", profile.id, e),
        }

        info!("Player '{}' disconnected", profile.id);
    }
}
