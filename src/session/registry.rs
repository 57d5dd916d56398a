//! Connection registry
//!
//! Thread-safe bookkeeping of open connections, their outbound channels and
//! what each player is currently bound to. A player holds at most one binding:
//! either a waiting entry in a tier queue or a seat in a room.

use crate::protocol::ServerMessage;
use crate::types::{ConnectionId, PlayerId, PlayerProfile, RoomId, Seat, Tier};
use crate::utils::generate_connection_id;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

/// What a player is currently bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Waiting {
        connection: ConnectionId,
        tier: Tier,
    },
    InRoom {
        connection: ConnectionId,
        room_id: RoomId,
        seat: Seat,
    },
}

impl Binding {
    /// Connection that owns the binding
    pub fn connection(&self) -> ConnectionId {
        match self {
            Binding::Waiting { connection, .. } | Binding::InRoom { connection, .. } => *connection,
        }
    }
}

/// An open client connection
#[derive(Debug)]
struct Connection {
    profile: PlayerProfile,
    outbound: mpsc::UnboundedSender<ServerMessage>,
}

/// Registry of connections and player bindings
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, Connection>,
    bindings: DashMap<PlayerId, Binding>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection for an authenticated player.
    ///
    /// Returns the connection handle and the stream of messages to deliver to it.
    pub fn register(
        &self,
        profile: PlayerProfile,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = generate_connection_id();
        debug!("Registered connection {} for player '{}'", id, profile.id);
        self.connections.insert(
            id,
            Connection {
                profile,
                outbound: tx,
            },
        );
        (id, rx)
    }

    /// Forget a connection. Its binding, if any, is left for the caller to tear down.
    pub fn unregister(&self, connection: ConnectionId) -> Option<PlayerProfile> {
        self.connections
            .remove(&connection)
            .map(|(_, conn)| conn.profile)
    }

    /// Profile of the player behind a connection
    pub fn profile(&self, connection: ConnectionId) -> Option<PlayerProfile> {
        self.connections
            .get(&connection)
            .map(|conn| conn.profile.clone())
    }

    /// Push a message to a connection; closed or unknown connections are skipped
    pub fn send(&self, connection: ConnectionId, message: ServerMessage) -> bool {
        match self.connections.get(&connection) {
            Some(conn) => conn.outbound.send(message).is_ok(),
            None => false,
        }
    }

    /// Current binding of a player
    pub fn binding(&self, player_id: &str) -> Option<Binding> {
        self.bindings.get(player_id).map(|b| *b)
    }

    /// Current binding owned by a connection
    pub fn binding_of(&self, connection: ConnectionId, player_id: &str) -> Option<Binding> {
        self.binding(player_id)
            .filter(|binding| binding.connection() == connection)
    }

    /// Bind a player as waiting unless it already holds a binding.
    ///
    /// Returns the existing binding when the player is already queued or seated.
    pub fn try_bind_waiting(
        &self,
        player_id: &str,
        connection: ConnectionId,
        tier: Tier,
    ) -> std::result::Result<(), Binding> {
        self.try_bind_waiting_with(player_id, connection, tier, || {})
    }

    /// Like [`ConnectionRegistry::try_bind_waiting`], running `on_bound` while
    /// the new binding is still locked. Nothing can read or remove the binding
    /// before `on_bound` returns.
    pub fn try_bind_waiting_with(
        &self,
        player_id: &str,
        connection: ConnectionId,
        tier: Tier,
        on_bound: impl FnOnce(),
    ) -> std::result::Result<(), Binding> {
        match self.bindings.entry(player_id.to_string()) {
            Entry::Occupied(existing) => Err(*existing.get()),
            Entry::Vacant(slot) => {
                let bound = slot.insert(Binding::Waiting { connection, tier });
                on_bound();
                drop(bound);
                Ok(())
            }
        }
    }

    /// Drop the player's waiting binding on `connection`, running `on_released`
    /// while the binding is still locked. Seats and foreign bindings are kept.
    pub fn release_waiting_with(
        &self,
        player_id: &str,
        connection: ConnectionId,
        on_released: impl FnOnce(),
    ) -> bool {
        match self.bindings.entry(player_id.to_string()) {
            Entry::Occupied(existing)
                if matches!(
                    existing.get(),
                    Binding::Waiting { connection: c, .. } if *c == connection
                ) =>
            {
                on_released();
                existing.remove();
                true
            }
            _ => false,
        }
    }

    /// Whether the player is still waiting on this connection
    pub fn is_waiting(&self, player_id: &str, connection: ConnectionId) -> bool {
        matches!(
            self.binding(player_id),
            Some(Binding::Waiting { connection: c, .. }) if c == connection
        )
    }

    /// Move a waiting player into a room seat
    pub fn bind_room(&self, player_id: &str, connection: ConnectionId, room_id: RoomId, seat: Seat) {
        self.bindings.insert(
            player_id.to_string(),
            Binding::InRoom {
                connection,
                room_id,
                seat,
            },
        );
    }

    /// Drop the player's binding if it still belongs to `connection`
    pub fn release(&self, player_id: &str, connection: ConnectionId) -> Option<Binding> {
        self.bindings
            .remove_if(player_id, |_, binding| binding.connection() == connection)
            .map(|(_, binding)| binding)
    }

    /// Number of open connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of players currently waiting in a queue
    pub fn waiting_count(&self) -> usize {
        self.bindings
            .iter()
            .filter(|b| matches!(*b.value(), Binding::Waiting { .. }))
            .count()
    }

    /// Number of players currently seated in a room
    pub fn seated_count(&self) -> usize {
        self.bindings
            .iter()
            .filter(|b| matches!(*b.value(), Binding::InRoom { .. }))
            .count()
    }
}
