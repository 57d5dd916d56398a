//! Matchmaking queue manager
//!
//! Players enter a tier queue and are paired by a periodic scan. The search
//! widens to adjacent tiers after a medium wait and to every tier after a
//! long wait; with the bot fallback enabled a long wait pairs the player with
//! a bot instead.
//!
//! Pairing fetches the question set first and then claims both entries under
//! the claim lock. Claiming re-checks that both players are still waiting, so
//! concurrent scans can never consume the same entry twice.
//!
//! Enqueueing never takes the claim lock: the queue entry is pushed while the
//! player's binding is held, so a waiting binding always has its entry.
//! Cancelling does take it, which makes "still waiting" versus "already
//! seated" a single decision.

use crate::bot::BotSimulator;
use crate::config::{DuelSettings, MatchmakingSettings};
use crate::duel::{DuelArena, DuelRoom, SeatInfo};
use crate::error::{ArenaError, Result};
use crate::matchmaking::queue::{TierQueues, WaitingEntry};
use crate::metrics::MetricsCollector;
use crate::questions::QuestionSupplier;
use crate::rating::classify;
use crate::session::{Binding, ConnectionRegistry};
use crate::types::{ConnectionId, PlayerProfile, Question, RoomId, Seat, Tier};
use crate::utils::generate_room_id;
use std::sync::{Arc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Statistics about matchmaking operations
#[derive(Debug, Clone, Default)]
pub struct MatchmakingStats {
    /// Total number of accepted enqueue requests
    pub players_queued: u64,
    /// Total number of cancelled waiting entries
    pub players_cancelled: u64,
    /// Rooms created between two players
    pub human_matches: u64,
    /// Rooms created against a bot
    pub bot_matches: u64,
    /// Pairings dropped because the question supplier failed
    pub supply_failures: u64,
    /// Pairings dropped because an entry was consumed concurrently
    pub races_lost: u64,
}

/// Outcome of one scan pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub human_matches: usize,
    pub bot_matches: usize,
    pub supply_failures: usize,
    pub races_lost: usize,
}

impl ScanReport {
    pub fn rooms_created(&self) -> usize {
        self.human_matches + self.bot_matches
    }
}

/// What [`MatchmakingManager::cancel`] found for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The waiting entry was removed
    Dequeued,
    /// A scan seated the player before the cancel
    Seated { room_id: RoomId, seat: Seat },
    /// Nothing was bound to the connection
    Unbound,
}

/// Result of one pairing attempt
enum PairingAttempt {
    Created,
    RaceLost,
    SupplyFailed,
}

/// The matchmaking queue manager
#[derive(Clone)]
pub struct MatchmakingManager {
    /// Waiting lists by tier
    queues: Arc<TierQueues>,
    /// Connection registry holding player bindings
    registry: Arc<ConnectionRegistry>,
    /// Owner of live rooms
    arena: DuelArena,
    /// Source of room question sets
    questions: Arc<dyn QuestionSupplier>,
    /// Bot identities for the long-wait fallback
    bot: Arc<BotSimulator>,
    /// Thresholds and scan interval
    settings: MatchmakingSettings,
    /// Question count, type and room parameters
    duel_settings: DuelSettings,
    /// Serializes every transition out of the waiting state
    claim_lock: Arc<Mutex<()>>,
    /// Manager statistics
    stats: Arc<RwLock<MatchmakingStats>>,
    /// Metrics collector for recording performance data
    metrics: Arc<MetricsCollector>,
}

impl MatchmakingManager {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        arena: DuelArena,
        questions: Arc<dyn QuestionSupplier>,
        bot: Arc<BotSimulator>,
        settings: MatchmakingSettings,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        let duel_settings = arena.settings().clone();
        Self {
            queues: Arc::new(TierQueues::new()),
            registry,
            arena,
            questions,
            bot,
            settings,
            duel_settings,
            claim_lock: Arc::new(Mutex::new(())),
            stats: Arc::new(RwLock::new(MatchmakingStats::default())),
            metrics,
        }
    }

    pub fn settings(&self) -> &MatchmakingSettings {
        &self.settings
    }

    pub fn queues(&self) -> &TierQueues {
        &self.queues
    }

    /// Arena that receives the rooms this manager creates
    pub fn arena(&self) -> &DuelArena {
        &self.arena
    }

    fn lock_claims(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.claim_lock.lock().map_err(|_| {
            ArenaError::InternalError {
                message: "Failed to acquire matchmaking claim lock".to_string(),
            }
            .into()
        })
    }

    fn update_stats(&self, update: impl FnOnce(&mut MatchmakingStats)) {
        match self.stats.write() {
            Ok(mut stats) => update(&mut stats),
            Err(_) => warn!("Failed to acquire matchmaking stats lock"),
        }
    }

    /// Put a player into the queue of its tier.
    ///
    /// Fails if the player is already queued or seated in a room.
    pub fn enqueue(&self, connection: ConnectionId, profile: PlayerProfile) -> Result<Tier> {
        let tier = classify(profile.rating_points);
        let player_id = profile.id.clone();

        let entry = WaitingEntry::new(connection, profile.clone(), tier);
        self.registry
            .try_bind_waiting_with(&player_id, connection, tier, || self.queues.push(entry))
            .map_err(|existing| match existing {
                Binding::Waiting { .. } => ArenaError::AlreadyQueued {
                    player_id: player_id.clone(),
                },
                Binding::InRoom { .. } => ArenaError::AlreadyInRoom {
                    player_id: player_id.clone(),
                },
            })?;

        self.update_stats(|stats| stats.players_queued += 1);
        self.metrics.record_player_queued(&tier.to_string());
        self.metrics.set_players_waiting(self.queues.len());

        info!(
            "Player '{}' queued - rating: {}, tier: {}",
            player_id, profile.rating_points, tier
        );
        Ok(tier)
    }

    /// Remove the waiting entry of `connection`. Idempotent.
    ///
    /// A player a scan has already seated is left in the room and reported
    /// as [`CancelOutcome::Seated`].
    pub fn cancel(&self, connection: ConnectionId, player_id: &str) -> Result<CancelOutcome> {
        let outcome = {
            let _claims = self.lock_claims()?;
            match self.registry.binding_of(connection, player_id) {
                Some(Binding::Waiting { .. }) => {
                    let released = self.registry.release_waiting_with(player_id, connection, || {
                        self.queues.remove_connection(connection);
                    });
                    if released {
                        CancelOutcome::Dequeued
                    } else {
                        CancelOutcome::Unbound
                    }
                }
                Some(Binding::InRoom { room_id, seat, .. }) => CancelOutcome::Seated { room_id, seat },
                None => CancelOutcome::Unbound,
            }
        };

        if outcome == CancelOutcome::Dequeued {
            self.update_stats(|stats| stats.players_cancelled += 1);
            self.metrics.set_players_waiting(self.queues.len());
            info!("Player '{}' left the queue", player_id);
        }
        Ok(outcome)
    }

    /// Tiers searched for an entry of `tier` that has waited `waited`
    pub fn search_tiers(&self, tier: Tier, waited: std::time::Duration) -> Vec<Tier> {
        let mut tiers = if waited >= self.settings.bot_after() {
            Tier::ALL.to_vec()
        } else if waited >= self.settings.widen_after() {
            let mut tiers = tier.adjacent();
            tiers.push(tier);
            tiers
        } else {
            vec![tier]
        };
        tiers.sort();
        tiers.dedup();
        tiers
    }

    /// First still-waiting entry other than `seeker` in the searched tiers
    pub fn find_opponent(&self, seeker: &WaitingEntry, tiers: &[Tier]) -> Option<WaitingEntry> {
        tiers
            .iter()
            .flat_map(|tier| self.queues.snapshot(*tier))
            .find(|candidate| {
                candidate.connection != seeker.connection
                    && candidate.player_id() != seeker.player_id()
                    && self
                        .registry
                        .is_waiting(candidate.player_id(), candidate.connection)
            })
    }

    /// One pass over every tier queue
    pub async fn run_scan(&self) -> ScanReport {
        let timer = self.metrics.start_timer();
        let mut report = ScanReport::default();
        let now = Instant::now();

        for tier in Tier::ALL {
            for seeker in self.queues.snapshot(tier) {
                if !self
                    .registry
                    .is_waiting(seeker.player_id(), seeker.connection)
                {
                    continue;
                }

                let waited = seeker.waited(now);
                let against_bot =
                    self.settings.enable_bot_fallback && waited >= self.settings.bot_after();
                let attempt = if against_bot {
                    self.create_bot_match(&seeker, now).await
                } else {
                    let tiers = self.search_tiers(seeker.tier, waited);
                    match self.find_opponent(&seeker, &tiers) {
                        Some(opponent) => self.create_room(&seeker, &opponent, now).await,
                        None => continue,
                    }
                };

                match attempt {
                    Ok(PairingAttempt::Created) if against_bot => report.bot_matches += 1,
                    Ok(PairingAttempt::Created) => report.human_matches += 1,
                    Ok(PairingAttempt::RaceLost) => report.races_lost += 1,
                    Ok(PairingAttempt::SupplyFailed) => report.supply_failures += 1,
                    Err(e) => error!("Pairing for player '{}' failed: {}", seeker.player_id(), e),
                }
            }
        }

        self.metrics.record_scan(timer.stop());
        self.metrics.set_players_waiting(self.queues.len());
        report
    }

    async fn fetch_questions(&self) -> Option<Vec<Question>> {
        match self
            .questions
            .supply_questions(
                self.duel_settings.question_type,
                self.duel_settings.questions_per_game,
            )
            .await
        {
            Ok(questions) if !questions.is_empty() => Some(questions),
            Ok(_) => {
                warn!("Question supplier returned an empty set");
                None
            }
            Err(e) => {
                warn!("Question supplier failed: {}", e);
                None
            }
        }
    }

    fn record_supply_failure(&self) {
        self.update_stats(|stats| stats.supply_failures += 1);
        self.metrics.record_question_supply_failure();
    }

    /// Move every entry in `seats` from waiting into the room, or nothing if
    /// any of them is no longer waiting.
    fn claim(&self, room: DuelRoom, seats: &[(&WaitingEntry, Seat)]) -> Result<bool> {
        let _claims = self.lock_claims()?;

        let all_waiting = seats
            .iter()
            .all(|(entry, _)| self.registry.is_waiting(entry.player_id(), entry.connection));
        if !all_waiting {
            return Ok(false);
        }

        let room_id = room.id();
        for (entry, seat) in seats {
            self.queues.remove(entry.tier, entry.connection);
            self.registry
                .bind_room(entry.player_id(), entry.connection, room_id, *seat);
        }
        self.arena.insert_room(room);
        Ok(true)
    }

    /// Pair two waiting players in a new room
    async fn create_room(
        &self,
        first: &WaitingEntry,
        second: &WaitingEntry,
        now: Instant,
    ) -> Result<PairingAttempt> {
        let Some(questions) = self.fetch_questions().await else {
            self.record_supply_failure();
            return Ok(PairingAttempt::SupplyFailed);
        };

        let room_id = generate_room_id();
        let room = DuelRoom::new(
            room_id,
            SeatInfo::player(first.profile.clone(), first.connection),
            SeatInfo::player(second.profile.clone(), second.connection),
            questions,
            self.duel_settings.points_per_correct,
            self.duel_settings.items_per_kind,
        )?;

        if !self.claim(room, &[(first, Seat::A), (second, Seat::B)])? {
            debug!(
                "Pairing '{}' with '{}' lost a race",
                first.player_id(),
                second.player_id()
            );
            self.update_stats(|stats| stats.races_lost += 1);
            return Ok(PairingAttempt::RaceLost);
        }

        self.update_stats(|stats| stats.human_matches += 1);
        self.metrics
            .record_match(false, &[first.waited(now), second.waited(now)]);
        info!(
            "Matched '{}' ({}) with '{}' ({}) in room {}",
            first.player_id(),
            first.tier,
            second.player_id(),
            second.tier,
            room_id
        );

        self.arena.launch(room_id).await?;
        Ok(PairingAttempt::Created)
    }

    /// Pair a long-waiting player with a fresh bot
    async fn create_bot_match(&self, entry: &WaitingEntry, now: Instant) -> Result<PairingAttempt> {
        let Some(questions) = self.fetch_questions().await else {
            self.record_supply_failure();
            return Ok(PairingAttempt::SupplyFailed);
        };

        let bot_profile = self.bot.bot_profile();
        let room_id = generate_room_id();
        let room = DuelRoom::new(
            room_id,
            SeatInfo::player(entry.profile.clone(), entry.connection),
            SeatInfo::bot(bot_profile.clone()),
            questions,
            self.duel_settings.points_per_correct,
            self.duel_settings.items_per_kind,
        )?;

        if !self.claim(room, &[(entry, Seat::A)])? {
            debug!("Bot pairing for '{}' lost a race", entry.player_id());
            self.update_stats(|stats| stats.races_lost += 1);
            return Ok(PairingAttempt::RaceLost);
        }

        self.update_stats(|stats| stats.bot_matches += 1);
        self.metrics.record_match(true, &[entry.waited(now)]);
        info!(
            "Player '{}' waited {:?}, paired with bot '{}' (rating {}) in room {}",
            entry.player_id(),
            entry.waited(now),
            bot_profile.name,
            bot_profile.rating_points,
            room_id
        );

        self.arena.launch(room_id).await?;
        Ok(PairingAttempt::Created)
    }

    /// Start the periodic scan loop
    pub fn start_scan_task(&self) -> JoinHandle<()> {
        let manager = self.clone();

        tokio::spawn(async move {
            let mut scan_interval = interval(manager.settings.scan_interval());
            scan_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                scan_interval.tick().await;

                let report = manager.run_scan().await;
                if report.rooms_created() > 0 || report.supply_failures > 0 {
                    debug!(
                        "Scan finished - human: {}, bot: {}, supply failures: {}, races lost: {}",
                        report.human_matches,
                        report.bot_matches,
                        report.supply_failures,
                        report.races_lost
                    );
                }
            }
        })
    }

    /// Get current manager statistics
    pub fn get_stats(&self) -> Result<MatchmakingStats> {
        let stats = self.stats.read().map_err(|_| ArenaError::InternalError {
            message: "Failed to acquire stats lock".to_string(),
        })?;
        Ok(stats.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BotSettings;
    use crate::protocol::ServerMessage;
    use crate::questions::bank::MockQuestionSupplier;
    use crate::questions::StaticQuestionBank;
    use crate::rating::{InMemoryPlayerStore, RatingRules};
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn setup(
        questions: Arc<dyn QuestionSupplier>,
        enable_bot_fallback: bool,
    ) -> (MatchmakingManager, Arc<ConnectionRegistry>) {
        let registry = Arc::new(ConnectionRegistry::new());
        let metrics = Arc::new(MetricsCollector::new().unwrap());
        let bot = Arc::new(BotSimulator::new(BotSettings {
            seed: Some(1),
            ..BotSettings::default()
        }));
        let arena = DuelArena::new(
            registry.clone(),
            bot.clone(),
            Arc::new(InMemoryPlayerStore::default()),
            RatingRules::default(),
            DuelSettings::default(),
            metrics.clone(),
        );
        let settings = MatchmakingSettings {
            enable_bot_fallback,
            ..MatchmakingSettings::default()
        };
        let manager = MatchmakingManager::new(registry.clone(), arena, questions, bot, settings, metrics);
        (manager, registry)
    }

    fn bank() -> Arc<dyn QuestionSupplier> {
        Arc::new(StaticQuestionBank::builtin())
    }

    fn connect(
        registry: &ConnectionRegistry,
        id: &str,
        rating_points: u32,
    ) -> (ConnectionId, PlayerProfile, UnboundedReceiver<ServerMessage>) {
        let profile = PlayerProfile {
            id: id.to_string(),
            name: format!("Player {}", id),
            avatar: None,
            rating_points,
        };
        let (conn, rx) = registry.register(profile.clone());
        (conn, profile, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_tier_players_are_paired() {
        let (manager, registry) = setup(bank(), true);
        let (conn_a, a, mut rx_a) = connect(&registry, "a", 50);
        let (conn_b, b, mut rx_b) = connect(&registry, "b", 80);

        manager.enqueue(conn_a, a).unwrap();
        manager.enqueue(conn_b, b).unwrap();

        let report = manager.run_scan().await;
        assert_eq!(report.human_matches, 1);
        assert!(manager.queues().is_empty());
        assert!(matches!(registry.binding("a"), Some(Binding::InRoom { seat: Seat::A, .. })));
        assert!(matches!(registry.binding("b"), Some(Binding::InRoom { seat: Seat::B, .. })));

        match rx_a.recv().await {
            Some(ServerMessage::MatchSuccess(m)) => assert_eq!(m.opponent.name, "Player b"),
            other => panic!("unexpected message {:?}", other),
        }
        match rx_b.recv().await {
            Some(ServerMessage::MatchSuccess(m)) => assert_eq!(m.opponent.name, "Player a"),
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_enqueue_rejected() {
        let (manager, registry) = setup(bank(), true);
        let (conn_a, a, _rx_a) = connect(&registry, "a", 50);
        let (conn_b, b, _rx_b) = connect(&registry, "b", 60);

        manager.enqueue(conn_a, a.clone()).unwrap();
        let err = manager.enqueue(conn_a, a.clone()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ArenaError>(),
            Some(ArenaError::AlreadyQueued { .. })
        ));
        assert_eq!(manager.queues().len(), 1);

        manager.enqueue(conn_b, b).unwrap();
        manager.run_scan().await;

        let err = manager.enqueue(conn_a, a).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ArenaError>(),
            Some(ArenaError::AlreadyInRoom { .. })
        ));
        assert!(manager.queues().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_supply_failure_keeps_players_queued() {
        let mut supplier = MockQuestionSupplier::new();
        supplier.expect_supply_questions().returning(|_, _| {
            Err(ArenaError::QuestionSupplyFailed {
                reason: "bank offline".to_string(),
            }
            .into())
        });
        let (manager, registry) = setup(Arc::new(supplier), true);
        let (conn_a, a, _rx_a) = connect(&registry, "a", 50);
        let (conn_b, b, _rx_b) = connect(&registry, "b", 60);
        manager.enqueue(conn_a, a).unwrap();
        manager.enqueue(conn_b, b).unwrap();

        let report = manager.run_scan().await;
        assert_eq!(report.rooms_created(), 0);
        assert!(report.supply_failures >= 1);
        assert_eq!(manager.queues().len(), 2);
        assert!(registry.is_waiting("a", conn_a));
        assert!(registry.is_waiting("b", conn_b));
        assert_eq!(manager.arena.room_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_widens_with_wait() {
        let (manager, registry) = setup(bank(), true);
        let (conn_a, a, _rx_a) = connect(&registry, "a", 50);
        let (conn_b, b, _rx_b) = connect(&registry, "b", 300);
        manager.enqueue(conn_a, a).unwrap();
        manager.enqueue(conn_b, b).unwrap();

        assert_eq!(manager.run_scan().await.rooms_created(), 0);

        tokio::time::advance(Duration::from_secs(5)).await;
        let report = manager.run_scan().await;
        assert_eq!(report.human_matches, 1);
        assert!(manager.queues().is_empty());
    }

    #[test]
    fn test_search_tiers() {
        let (manager, _) = setup(bank(), true);
        let widen = manager.settings().widen_after();
        let bot_after = manager.settings().bot_after();

        assert_eq!(manager.search_tiers(Tier::Gold, Duration::ZERO), vec![Tier::Gold]);
        assert_eq!(
            manager.search_tiers(Tier::Gold, widen),
            vec![Tier::Silver, Tier::Gold]
        );
        assert_eq!(
            manager.search_tiers(Tier::Silver, widen),
            vec![Tier::Bronze, Tier::Silver, Tier::Gold]
        );
        assert_eq!(manager.search_tiers(Tier::Bronze, bot_after), Tier::ALL.to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_wait_gets_a_bot() {
        let (manager, registry) = setup(bank(), true);
        let (conn_a, a, mut rx_a) = connect(&registry, "a", 50);
        manager.enqueue(conn_a, a).unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(manager.run_scan().await.rooms_created(), 0);

        tokio::time::advance(Duration::from_secs(1)).await;
        let report = manager.run_scan().await;
        assert_eq!(report.bot_matches, 1);

        match rx_a.recv().await {
            Some(ServerMessage::MatchSuccess(m)) => {
                assert!(m.opponent.is_bot);
                assert!((500..=700).contains(&m.opponent.points));
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_without_bot_fallback_all_tiers_are_searched() {
        let (manager, registry) = setup(bank(), false);
        let (conn_a, a, _rx_a) = connect(&registry, "a", 10);
        let (conn_b, b, _rx_b) = connect(&registry, "b", 900);
        manager.enqueue(conn_a, a).unwrap();
        manager.enqueue(conn_b, b).unwrap();

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(manager.run_scan().await.rooms_created(), 0);

        tokio::time::advance(Duration::from_secs(4)).await;
        let report = manager.run_scan().await;
        assert_eq!(report.human_matches, 1);
        assert_eq!(report.bot_matches, 0);
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let (manager, registry) = setup(bank(), true);
        let (conn_a, a, _rx_a) = connect(&registry, "a", 50);
        manager.enqueue(conn_a, a).unwrap();

        assert_eq!(manager.cancel(conn_a, "a").unwrap(), CancelOutcome::Dequeued);
        assert_eq!(manager.cancel(conn_a, "a").unwrap(), CancelOutcome::Unbound);
        assert!(manager.queues().is_empty());
        assert!(registry.binding("a").is_none());
        assert_eq!(manager.get_stats().unwrap().players_cancelled, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_claim_reports_seat() {
        let (manager, registry) = setup(bank(), true);
        let (conn_a, a, _rx_a) = connect(&registry, "a", 50);
        let (conn_b, b, _rx_b) = connect(&registry, "b", 60);
        manager.enqueue(conn_a, a).unwrap();
        manager.enqueue(conn_b, b).unwrap();

        // the scan wins the race against a's cancel
        assert_eq!(manager.run_scan().await.human_matches, 1);

        let Some(Binding::InRoom { room_id, .. }) = registry.binding("a") else {
            panic!("a should be seated");
        };
        assert_eq!(
            manager.cancel(conn_a, "a").unwrap(),
            CancelOutcome::Seated {
                room_id,
                seat: Seat::A
            }
        );
        assert!(manager.arena.contains(room_id));
        assert_eq!(manager.get_stats().unwrap().players_cancelled, 0);
    }

    #[tokio::test]
    async fn test_enqueue_pushes_with_binding() {
        let (manager, registry) = setup(bank(), true);
        let (conn_a, a, _rx_a) = connect(&registry, "a", 450);

        assert_eq!(manager.enqueue(conn_a, a).unwrap(), Tier::Silver);
        assert!(registry.is_waiting("a", conn_a));
        assert_eq!(manager.queues().len_of(Tier::Silver), 1);
    }
}
