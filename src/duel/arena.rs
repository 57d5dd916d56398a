//! Live room orchestration
//!
//! The arena owns every live [`DuelRoom`] behind its own lock, drives the
//! start delay, round timers, result-view delay and bot answers, delivers
//! messages to the seats and dispatches rating settlement when a game ends.
//!
//! Every timer carries the sequence number it was armed with. A callback that
//! finds a different sequence (or a different round) in the room was
//! superseded and does nothing.

use crate::bot::BotSimulator;
use crate::config::DuelSettings;
use crate::duel::room::{DuelRoom, ItemUse, RoomPhase, RoundResult, SubmitOutcome};
use crate::error::{ArenaError, Result};
use crate::metrics::MetricsCollector;
use crate::protocol::{
    GameOverPayload, ItemEffect, ItemUsed, MatchSuccess, OpponentInfo, QuestionPayload,
    ServerMessage,
};
use crate::rating::{RatingRules, RatingSettlement, SettlementRequest};
use crate::session::ConnectionRegistry;
use crate::types::{GameOutcome, ItemKind, RoomId, Seat};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

type SharedRoom = Arc<Mutex<RoomSlot>>;

/// A room plus the timers armed for it
struct RoomSlot {
    room: DuelRoom,
    /// Start delay, round timeout or result-view delay
    timer: Option<JoinHandle<()>>,
    timer_seq: u64,
    bot_timer: Option<JoinHandle<()>>,
}

impl RoomSlot {
    fn new(room: DuelRoom) -> Self {
        Self {
            room,
            timer: None,
            timer_seq: 0,
            bot_timer: None,
        }
    }

    fn cancel_timers(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        if let Some(timer) = self.bot_timer.take() {
            timer.abort();
        }
    }
}

/// What a phase timer does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerAction {
    /// Push the first question
    Begin,
    /// Close the round with whatever answers are present
    RoundTimeout,
    /// Move on after the result-view delay
    AfterResult,
}

/// Read-only view of a live room
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub phase: RoomPhase,
    pub round_index: usize,
    pub total_rounds: usize,
    pub scores: [u32; 2],
    pub is_bot_game: bool,
}

/// Owner of all live rooms
#[derive(Clone)]
pub struct DuelArena {
    rooms: Arc<DashMap<RoomId, SharedRoom>>,
    registry: Arc<ConnectionRegistry>,
    bot: Arc<BotSimulator>,
    settlement: Arc<dyn RatingSettlement>,
    rules: RatingRules,
    settings: DuelSettings,
    metrics: Arc<MetricsCollector>,
}

impl DuelArena {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        bot: Arc<BotSimulator>,
        settlement: Arc<dyn RatingSettlement>,
        rules: RatingRules,
        settings: DuelSettings,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            registry,
            bot,
            settlement,
            rules,
            settings,
            metrics,
        }
    }

    pub fn settings(&self) -> &DuelSettings {
        &self.settings
    }

    fn room(&self, room_id: RoomId) -> Option<SharedRoom> {
        self.rooms.get(&room_id).map(|entry| entry.value().clone())
    }

    /// Number of live rooms
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn contains(&self, room_id: RoomId) -> bool {
        self.rooms.contains_key(&room_id)
    }

    /// Register a freshly paired room. Nothing is sent until [`DuelArena::launch`].
    pub fn insert_room(&self, room: DuelRoom) -> RoomId {
        let room_id = room.id();
        self.rooms
            .insert(room_id, Arc::new(Mutex::new(RoomSlot::new(room))));
        room_id
    }

    /// Notify both seats of the pairing and arm the start delay
    pub async fn launch(&self, room_id: RoomId) -> Result<()> {
        let Some(shared) = self.room(room_id) else {
            // a seat left between pairing and launch
            debug!("Room {} closed before launch", room_id);
            return Ok(());
        };
        let mut slot = shared.lock().await;

        if slot.room.phase() != RoomPhase::Preparing {
            return Ok(());
        }

        for (seat, connection) in slot.room.real_seats() {
            let opponent = slot.room.seat(seat.other());
            let message = ServerMessage::MatchSuccess(MatchSuccess {
                room_id: room_id.to_string(),
                opponent: OpponentInfo::from_profile(&opponent.profile, opponent.is_bot()),
            });
            self.registry.send(connection, message);
        }

        info!(
            "Room {} launched - '{}' vs '{}', {} rounds{}",
            room_id,
            slot.room.seat(Seat::A).profile.id,
            slot.room.seat(Seat::B).profile.id,
            slot.room.total_rounds(),
            if slot.room.is_bot_game() { " (bot)" } else { "" }
        );

        let delay = self.settings.start_delay();
        self.schedule(&mut slot, room_id, delay, TimerAction::Begin);
        Ok(())
    }

    fn schedule(&self, slot: &mut RoomSlot, room_id: RoomId, delay: Duration, action: TimerAction) {
        if let Some(previous) = slot.timer.take() {
            previous.abort();
        }
        slot.timer_seq += 1;
        let seq = slot.timer_seq;

        let arena = self.clone();
        slot.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            arena.fire(room_id, seq, action).await;
        }));
    }

    async fn fire(&self, room_id: RoomId, seq: u64, action: TimerAction) {
        let Some(shared) = self.room(room_id) else {
            debug!("Timer {:?} fired for closed room {}", action, room_id);
            return;
        };
        let mut slot = shared.lock().await;

        if slot.timer_seq != seq {
            debug!("Superseded timer {:?} in room {} ignored", action, room_id);
            return;
        }
        // this task owns the handle; detach it so rescheduling does not abort us
        slot.timer = None;

        match action {
            TimerAction::Begin => {
                if slot.room.begin() {
                    self.open_round(&mut slot, room_id);
                }
            }
            TimerAction::RoundTimeout => {
                if slot.room.phase() == RoomPhase::AwaitingAnswers {
                    debug!(
                        "Round {} of room {} timed out",
                        slot.room.round_index() + 1,
                        room_id
                    );
                    self.resolve(&mut slot, room_id, true);
                }
            }
            TimerAction::AfterResult => {
                if slot.room.advance() {
                    self.open_round(&mut slot, room_id);
                } else if slot.room.finish() {
                    self.finish_game(&mut slot, room_id);
                }
            }
        }
    }

    /// Push the current question and arm the round timeout and the bot answer
    fn open_round(&self, slot: &mut RoomSlot, room_id: RoomId) {
        let round = slot.room.round_index();
        let question = slot.room.current_question().clone();
        let payload = QuestionPayload {
            content: question.content.clone(),
            options: question.options.clone(),
            round: round + 1,
            total: slot.room.total_rounds(),
        };

        for (_, connection) in slot.room.real_seats() {
            self.registry
                .send(connection, ServerMessage::Question(payload.clone()));
        }

        self.schedule(
            slot,
            room_id,
            self.settings.round_timeout(),
            TimerAction::RoundTimeout,
        );

        if let Some(bot_seat) = slot.room.bot_seat() {
            let delay = self.bot.answer_delay();
            let answer = self.bot.choose_answer(&question);
            debug!(
                "Bot in room {} answers round {} in {:?}",
                room_id,
                round + 1,
                delay
            );

            let arena = self.clone();
            if let Some(previous) = slot.bot_timer.replace(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                arena.submit_bot_answer(room_id, bot_seat, answer, round).await;
            })) {
                previous.abort();
            }
        }
    }

    async fn submit_bot_answer(&self, room_id: RoomId, seat: Seat, answer: String, round: usize) {
        let Some(shared) = self.room(room_id) else {
            return;
        };
        let mut slot = shared.lock().await;

        if slot.room.phase() == RoomPhase::AwaitingAnswers && slot.room.round_index() == round {
            slot.bot_timer = None;
        }
        self.submit_locked(&mut slot, room_id, seat, &answer, Some(round));
    }

    /// Submit an answer for `seat`. Returns whether it was accepted.
    ///
    /// `expected_round` pins the answer to a round; `None` means the current one.
    pub async fn submit(
        &self,
        room_id: RoomId,
        seat: Seat,
        answer: &str,
        expected_round: Option<usize>,
    ) -> bool {
        let Some(shared) = self.room(room_id) else {
            debug!("Answer for closed room {} ignored", room_id);
            return false;
        };
        let mut slot = shared.lock().await;
        self.submit_locked(&mut slot, room_id, seat, answer, expected_round)
    }

    fn submit_locked(
        &self,
        slot: &mut RoomSlot,
        room_id: RoomId,
        seat: Seat,
        answer: &str,
        expected_round: Option<usize>,
    ) -> bool {
        match slot.room.submit_answer(seat, answer, expected_round) {
            SubmitOutcome::Rejected => {
                debug!(
                    "Answer from seat {:?} in room {} rejected in phase {:?}",
                    seat,
                    room_id,
                    slot.room.phase()
                );
                false
            }
            SubmitOutcome::Recorded => true,
            SubmitOutcome::RoundComplete => {
                self.resolve(slot, room_id, false);
                true
            }
        }
    }

    /// Score the open round, broadcast the per-seat results and arm the result-view delay
    fn resolve(&self, slot: &mut RoomSlot, room_id: RoomId, timed_out: bool) {
        let Some(result) = slot.room.resolve_round(timed_out) else {
            return;
        };
        slot.cancel_timers();
        self.metrics.record_round_resolved(timed_out);
        self.broadcast_result(slot, &result);

        info!(
            "Room {} round {}/{} resolved{} - scores {}:{}",
            room_id,
            result.round_index + 1,
            slot.room.total_rounds(),
            if timed_out { " by timeout" } else { "" },
            result.scores[0],
            result.scores[1]
        );

        self.schedule(
            slot,
            room_id,
            self.settings.result_view(),
            TimerAction::AfterResult,
        );
    }

    fn broadcast_result(&self, slot: &RoomSlot, result: &RoundResult) {
        for (seat, connection) in slot.room.real_seats() {
            self.registry
                .send(connection, ServerMessage::RoundResult(result.view_for(seat)));
        }
    }

    /// Drop the finished room, unbind its players, send GAME_OVER and settle every real seat
    fn finish_game(&self, slot: &mut RoomSlot, room_id: RoomId) {
        slot.cancel_timers();
        self.rooms.remove(&room_id);

        let room = &slot.room;
        let mut requests = Vec::new();

        for (seat, connection) in room.real_seats() {
            let player = &room.seat(seat).profile;
            let opponent = room.seat(seat.other());
            let outcome = room.outcome_for(seat);
            let delta = self.rules.delta_for(outcome);

            self.registry.release(&player.id, connection);
            self.registry.send(
                connection,
                ServerMessage::GameOver(GameOverPayload {
                    result: outcome.into(),
                    my_score: room.score(seat),
                    opp_score: room.score(seat.other()),
                    score_change: delta,
                }),
            );

            requests.push(SettlementRequest {
                room_id,
                player_id: player.id.clone(),
                opponent_id: (!opponent.is_bot()).then(|| opponent.profile.id.clone()),
                opponent_name: opponent.profile.name.clone(),
                outcome,
                delta,
            });
        }

        let draw = room.outcome_for(Seat::A) == GameOutcome::Draw;
        self.metrics.record_game_finished(draw);
        info!(
            "Room {} finished - final score {}:{}",
            room_id,
            room.score(Seat::A),
            room.score(Seat::B)
        );

        for request in requests {
            self.dispatch_settlement(request);
        }
    }

    fn dispatch_settlement(&self, request: SettlementRequest) {
        let settlement = self.settlement.clone();
        let metrics = self.metrics.clone();

        tokio::spawn(async move {
            let player_id = request.player_id.clone();
            let room_id = request.room_id;
            if let Err(e) = settlement.settle_rating(request).await {
                error!(
                    "Rating settlement failed for player '{}' in room {}: {}",
                    player_id, room_id, e
                );
                metrics.record_settlement_failure();
            }
        });
    }

    /// Discard a room because `leaver` disconnected. The remaining real seat
    /// receives OPPONENT_LEFT; nobody is settled.
    pub async fn abandon(&self, room_id: RoomId, leaver: Seat) -> bool {
        let Some(shared) = self.room(room_id) else {
            return false;
        };
        let mut slot = shared.lock().await;

        if slot.room.phase() == RoomPhase::GameOver {
            return false;
        }
        slot.room.abandon();
        slot.cancel_timers();
        self.rooms.remove(&room_id);

        for (seat, connection) in slot.room.real_seats() {
            self.registry
                .release(&slot.room.seat(seat).profile.id, connection);
            if seat != leaver {
                self.registry.send(connection, ServerMessage::OpponentLeft);
            }
        }

        self.metrics.record_game_abandoned();
        info!(
            "Room {} abandoned by seat {:?} ('{}')",
            room_id,
            leaver,
            slot.room.seat(leaver).profile.id
        );
        true
    }

    /// Use an item on behalf of `seat`
    pub async fn use_item(&self, room_id: RoomId, seat: Seat, kind: ItemKind) -> Result<()> {
        let shared = self.room(room_id).ok_or_else(|| ArenaError::RoomNotFound {
            room_id: room_id.to_string(),
        })?;
        let mut slot = shared.lock().await;

        let effect = {
            let mut rng = rand::thread_rng();
            slot.room.use_item(seat, kind, &mut rng)?
        };

        let user = slot.room.seat(seat).connection;
        let opponent = slot.room.seat(seat.other()).connection;

        match effect {
            ItemUse::Hint { wrong_option } => {
                if let Some(connection) = user {
                    self.registry.send(
                        connection,
                        ServerMessage::ItemEffect(ItemEffect::Hint { wrong_option }),
                    );
                }
            }
            ItemUse::Fog => {
                if let Some(connection) = opponent {
                    self.registry.send(
                        connection,
                        ServerMessage::ItemEffect(ItemEffect::Fog {
                            duration: self.settings.fog_duration_ms,
                        }),
                    );
                }
            }
        }

        if let Some(connection) = user {
            self.registry
                .send(connection, ServerMessage::ItemUsed(ItemUsed { item: kind }));
        }
        self.metrics.record_item_used(&format!("{:?}", kind).to_lowercase());
        debug!("Seat {:?} in room {} used {:?}", seat, room_id, kind);
        Ok(())
    }

    /// Current state of a live room
    pub async fn snapshot(&self, room_id: RoomId) -> Option<RoomSnapshot> {
        let shared = self.room(room_id)?;
        let slot = shared.lock().await;
        let room = &slot.room;

        Some(RoomSnapshot {
            room_id,
            phase: room.phase(),
            round_index: room.round_index(),
            total_rounds: room.total_rounds(),
            scores: [room.score(Seat::A), room.score(Seat::B)],
            is_bot_game: room.is_bot_game(),
        })
    }

    /// Cancel every timer and drop all rooms
    pub async fn shutdown(&self) {
        let rooms: Vec<_> = self
            .rooms
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        self.rooms.clear();

        for shared in rooms {
            let mut slot = shared.lock().await;
            slot.cancel_timers();
            slot.room.abandon();
        }
        if !self.rooms.is_empty() {
            warn!("Rooms created during shutdown: {}", self.rooms.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BotSettings;
    use crate::duel::room::SeatInfo;
    use crate::rating::settlement::MockRatingSettlement;
    use crate::types::{PlayerProfile, Question, Tier};
    use crate::utils::generate_room_id;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn profile(id: &str) -> PlayerProfile {
        PlayerProfile {
            id: id.to_string(),
            name: id.to_string(),
            avatar: None,
            rating_points: 100,
        }
    }

    fn questions(n: usize) -> Vec<Question> {
        (0..n)
            .map(|i| Question {
                id: i as u64,
                content: format!("Question {}", i),
                options: vec!["A. x".into(), "B. y".into(), "C. z".into(), "D. w".into()],
                answer: "A".to_string(),
                difficulty: None,
            })
            .collect()
    }

    fn arena_with(settlement: MockRatingSettlement, bot: BotSettings) -> (DuelArena, Arc<ConnectionRegistry>) {
        let registry = Arc::new(ConnectionRegistry::new());
        let arena = DuelArena::new(
            registry.clone(),
            Arc::new(BotSimulator::new(bot)),
            Arc::new(settlement),
            RatingRules::default(),
            DuelSettings::default(),
            Arc::new(MetricsCollector::new().unwrap()),
        );
        (arena, registry)
    }

    fn seated(
        registry: &ConnectionRegistry,
        id: &str,
        room_id: RoomId,
        seat: Seat,
    ) -> (SeatInfo, UnboundedReceiver<ServerMessage>) {
        let (conn, rx) = registry.register(profile(id));
        registry.try_bind_waiting(id, conn, Tier::Bronze).unwrap();
        registry.bind_room(id, conn, room_id, seat);
        (SeatInfo::player(profile(id), conn), rx)
    }

    fn drain(rx: &mut UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_game_settles_each_seat_once() {
        let mut settlement = MockRatingSettlement::new();
        settlement.expect_settle_rating().times(2).returning(|_| Ok(()));
        let (arena, registry) = arena_with(settlement, BotSettings::default());

        let room_id = generate_room_id();
        let (a, mut rx_a) = seated(&registry, "a", room_id, Seat::A);
        let (b, mut rx_b) = seated(&registry, "b", room_id, Seat::B);
        arena.insert_room(DuelRoom::new(room_id, a, b, questions(2), 20, 1).unwrap());
        arena.launch(room_id).await.unwrap();

        assert!(matches!(rx_a.recv().await, Some(ServerMessage::MatchSuccess(_))));
        assert!(matches!(rx_b.recv().await, Some(ServerMessage::MatchSuccess(_))));
        assert!(matches!(rx_a.recv().await, Some(ServerMessage::Question(q)) if q.round == 1));
        drain(&mut rx_b);

        for _ in 0..2 {
            assert!(arena.submit(room_id, Seat::A, "A", None).await);
            assert!(arena.submit(room_id, Seat::B, "C", None).await);
            tokio::time::sleep(Duration::from_secs(4)).await;
        }

        let messages = drain(&mut rx_a);
        let over = messages
            .iter()
            .find_map(|m| match m {
                ServerMessage::GameOver(payload) => Some(payload.clone()),
                _ => None,
            })
            .expect("game over sent");
        assert_eq!((over.my_score, over.opp_score, over.score_change), (40, 0, 20));
        assert!(!arena.contains(room_id));
        assert!(registry.binding("a").is_none());

        // let the settlement tasks run
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_resolves_with_missing_answer() {
        let (arena, registry) = arena_with(MockRatingSettlement::new(), BotSettings::default());
        let room_id = generate_room_id();
        let (a, mut rx_a) = seated(&registry, "a", room_id, Seat::A);
        let (b, mut rx_b) = seated(&registry, "b", room_id, Seat::B);
        arena.insert_room(DuelRoom::new(room_id, a, b, questions(3), 20, 1).unwrap());
        arena.launch(room_id).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(arena.submit(room_id, Seat::A, "A", None).await);
        tokio::time::sleep(Duration::from_secs(20)).await;

        let result = drain(&mut rx_b)
            .into_iter()
            .find_map(|m| match m {
                ServerMessage::RoundResult(r) => Some(r),
                _ => None,
            })
            .expect("round result sent");
        assert_eq!(result.my_answer, None);
        assert!(!result.is_correct);
        assert_eq!(result.opp_score, 20);
        drain(&mut rx_a);

        tokio::time::sleep(Duration::from_secs(3)).await;
        let snapshot = arena.snapshot(room_id).await.unwrap();
        assert_eq!(snapshot.round_index, 1);
        assert_eq!(snapshot.phase, RoomPhase::AwaitingAnswers);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandon_notifies_opponent_without_settlement() {
        let (arena, registry) = arena_with(MockRatingSettlement::new(), BotSettings::default());
        let room_id = generate_room_id();
        let (a, mut rx_a) = seated(&registry, "a", room_id, Seat::A);
        let (b, _rx_b) = seated(&registry, "b", room_id, Seat::B);
        arena.insert_room(DuelRoom::new(room_id, a, b, questions(3), 20, 1).unwrap());
        arena.launch(room_id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        drain(&mut rx_a);

        assert!(arena.abandon(room_id, Seat::B).await);
        assert_eq!(rx_a.recv().await, Some(ServerMessage::OpponentLeft));
        assert!(!arena.submit(room_id, Seat::A, "A", None).await);
        assert!(registry.binding("a").is_none());

        // no timer survives the room
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(drain(&mut rx_a).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bot_answers_every_round() {
        let mut settlement = MockRatingSettlement::new();
        settlement.expect_settle_rating().times(1).returning(|_| Ok(()));
        let bot = BotSettings {
            accuracy: 1.0,
            seed: Some(5),
            ..BotSettings::default()
        };
        let (arena, registry) = arena_with(settlement, bot.clone());

        let room_id = generate_room_id();
        let (a, mut rx_a) = seated(&registry, "a", room_id, Seat::A);
        let bot_seat = SeatInfo::bot(BotSimulator::new(bot).bot_profile());
        arena.insert_room(DuelRoom::new(room_id, a, bot_seat, questions(2), 20, 1).unwrap());
        arena.launch(room_id).await.unwrap();

        // the human never answers; the bot always does before the timeout
        tokio::time::sleep(Duration::from_secs(60)).await;

        let messages = drain(&mut rx_a);
        let results: Vec<_> = messages
            .iter()
            .filter_map(|m| match m {
                ServerMessage::RoundResult(r) => Some(r.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.opp_answer.as_deref() == Some("A")));
        assert!(messages.iter().any(|m| matches!(
            m,
            ServerMessage::GameOver(over) if over.opp_score == 40 && over.score_change == -10
        )));
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_items_reach_the_right_seat() {
        let (arena, registry) = arena_with(MockRatingSettlement::new(), BotSettings::default());
        let room_id = generate_room_id();
        let (a, mut rx_a) = seated(&registry, "a", room_id, Seat::A);
        let (b, mut rx_b) = seated(&registry, "b", room_id, Seat::B);
        arena.insert_room(DuelRoom::new(room_id, a, b, questions(3), 20, 1).unwrap());
        arena.launch(room_id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        drain(&mut rx_a);
        drain(&mut rx_b);

        arena.use_item(room_id, Seat::A, ItemKind::Fog).await.unwrap();
        assert!(matches!(
            rx_b.recv().await,
            Some(ServerMessage::ItemEffect(ItemEffect::Fog { duration: 3000 }))
        ));
        assert!(matches!(rx_a.recv().await, Some(ServerMessage::ItemUsed(_))));
        assert!(arena.use_item(room_id, Seat::A, ItemKind::Fog).await.is_err());

        arena.use_item(room_id, Seat::B, ItemKind::Hint).await.unwrap();
        match rx_b.recv().await {
            Some(ServerMessage::ItemEffect(ItemEffect::Hint { wrong_option })) => {
                assert_ne!(wrong_option, "A")
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_launch_after_abandon_is_quiet() {
        let (arena, registry) = arena_with(MockRatingSettlement::new(), BotSettings::default());
        let room_id = generate_room_id();
        let (a, mut rx_a) = seated(&registry, "a", room_id, Seat::A);
        let (b, _rx_b) = seated(&registry, "b", room_id, Seat::B);
        arena.insert_room(DuelRoom::new(room_id, a, b, questions(3), 20, 1).unwrap());

        // seat B leaves between pairing and launch
        assert!(arena.abandon(room_id, Seat::B).await);
        assert!(arena.launch(room_id).await.is_ok());

        assert_eq!(rx_a.recv().await, Some(ServerMessage::OpponentLeft));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(drain(&mut rx_a).is_empty());
        assert_eq!(arena.room_count(), 0);
    }

    #[tokio::test]
    async fn test_item_in_unknown_room_is_rejected() {
        let (arena, _registry) = arena_with(MockRatingSettlement::new(), BotSettings::default());
        let room_id = generate_room_id();

        let err = arena
            .use_item(room_id, Seat::A, ItemKind::Hint)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ArenaError>(),
            Some(ArenaError::RoomNotFound { room_id: id }) if *id == room_id.to_string()
        ));
    }
}
