//! Per-tier waiting lists
//!
//! Each tier keeps its own FIFO under its own lock, so enqueueing into one
//! tier never contends with a scan of another.

use crate::types::{ConnectionId, PlayerId, PlayerProfile, Tier};
use std::collections::VecDeque;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::time::{Duration, Instant};

/// A player waiting for an opponent
#[derive(Debug, Clone)]
pub struct WaitingEntry {
    pub connection: ConnectionId,
    pub profile: PlayerProfile,
    pub tier: Tier,
    pub enqueued_at: Instant,
}

impl WaitingEntry {
    pub fn new(connection: ConnectionId, profile: PlayerProfile, tier: Tier) -> Self {
        Self {
            connection,
            profile,
            tier,
            enqueued_at: Instant::now(),
        }
    }

    pub fn player_id(&self) -> &PlayerId {
        &self.profile.id
    }

    pub fn rating_points(&self) -> u32 {
        self.profile.rating_points
    }

    /// Time spent waiting as of `now`
    pub fn waited(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.enqueued_at)
    }
}

/// FIFO waiting lists, one per tier
#[derive(Debug, Default)]
pub struct TierQueues {
    queues: [RwLock<VecDeque<WaitingEntry>>; 3],
}

impl TierQueues {
    pub fn new() -> Self {
        Self::default()
    }

    // Poisoning only happens if a panic interrupted a push or a retain, both
    // of which leave the deque consistent.
    fn read(&self, tier: Tier) -> RwLockReadGuard<'_, VecDeque<WaitingEntry>> {
        self.queues[tier.index()]
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self, tier: Tier) -> RwLockWriteGuard<'_, VecDeque<WaitingEntry>> {
        self.queues[tier.index()]
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append an entry to its tier queue
    pub fn push(&self, entry: WaitingEntry) {
        self.write(entry.tier).push_back(entry);
    }

    /// Remove the entry of `connection` from `tier`
    pub fn remove(&self, tier: Tier, connection: ConnectionId) -> Option<WaitingEntry> {
        let mut queue = self.write(tier);
        let position = queue.iter().position(|e| e.connection == connection)?;
        queue.remove(position)
    }

    /// Remove the entry of `connection` from whichever tier holds it
    pub fn remove_connection(&self, connection: ConnectionId) -> Option<WaitingEntry> {
        Tier::ALL
            .iter()
            .find_map(|tier| self.remove(*tier, connection))
    }

    /// Copy of a tier queue in FIFO order
    pub fn snapshot(&self, tier: Tier) -> Vec<WaitingEntry> {
        self.read(tier).iter().cloned().collect()
    }

    /// Entries waiting in `tier`
    pub fn len_of(&self, tier: Tier) -> usize {
        self.read(tier).len()
    }

    /// Entries waiting across all tiers
    pub fn len(&self) -> usize {
        Tier::ALL.iter().map(|tier| self.len_of(*tier)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `connection` is queued in any tier
    pub fn contains(&self, connection: ConnectionId) -> bool {
        Tier::ALL
            .iter()
            .any(|tier| self.read(*tier).iter().any(|e| e.connection == connection))
    }
}
