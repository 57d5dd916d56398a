//! Duel room state machine
//!
//! A room holds exactly two seats and a fixed, ordered question set. It only
//! tracks state; timers, locking and message delivery are driven by the arena.

use crate::error::{ArenaError, Result};
use crate::protocol::RoundResultPayload;
use crate::types::{ConnectionId, GameOutcome, ItemKind, PlayerProfile, Question, RoomId, Seat};
use crate::utils::{answer_matches, wrong_option_labels};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Lifecycle of a duel room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomPhase {
    /// Pairing confirmed, first question not pushed yet
    Preparing,
    /// Current question is open for answers
    AwaitingAnswers,
    /// Current round scored, result on screen
    RoundResolved,
    /// Terminal state
    GameOver,
}

/// Who sits in a seat
#[derive(Debug, Clone)]
pub struct SeatInfo {
    pub profile: PlayerProfile,
    /// `None` for the bot seat
    pub connection: Option<ConnectionId>,
}

impl SeatInfo {
    pub fn player(profile: PlayerProfile, connection: ConnectionId) -> Self {
        Self {
            profile,
            connection: Some(connection),
        }
    }

    pub fn bot(profile: PlayerProfile) -> Self {
        Self {
            profile,
            connection: None,
        }
    }

    pub fn is_bot(&self) -> bool {
        self.connection.is_none()
    }
}

/// Remaining item stock of one seat
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ItemStock {
    fog: u32,
    hint: u32,
}

impl ItemStock {
    fn slot(&mut self, kind: ItemKind) -> &mut u32 {
        match kind {
            ItemKind::Fog => &mut self.fog,
            ItemKind::Hint => &mut self.hint,
        }
    }
}

/// Effect of a successfully used item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemUse {
    /// Shown to the user: one option that is certainly wrong
    Hint { wrong_option: String },
    /// Shown to the opponent
    Fog,
}

/// What happened to a submitted answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Not accepted: wrong phase or stale round
    Rejected,
    /// Stored, the other seat has not answered yet
    Recorded,
    /// Stored, both seats have answered
    RoundComplete,
}

/// Scored round, derived from room state when the round closes
#[derive(Debug, Clone, PartialEq)]
pub struct RoundResult {
    pub round_index: usize,
    pub correct_answer: String,
    pub answers: [Option<String>; 2],
    pub correct: [bool; 2],
    pub score_change: [u32; 2],
    pub scores: [u32; 2],
    pub timed_out: bool,
}

impl RoundResult {
    /// Result as seen from `seat`
    pub fn view_for(&self, seat: Seat) -> RoundResultPayload {
        let own = seat.index();
        let opp = seat.other().index();

        RoundResultPayload {
            correct_answer: self.correct_answer.clone(),
            my_answer: self.answers[own].clone(),
            opp_answer: self.answers[opp].clone(),
            my_score: self.scores[own],
            opp_score: self.scores[opp],
            is_correct: self.correct[own],
            score_change: self.score_change[own],
        }
    }
}

/// One live game between two seats
#[derive(Debug, Clone)]
pub struct DuelRoom {
    id: RoomId,
    seats: [SeatInfo; 2],
    questions: Vec<Question>,
    round_index: usize,
    phase: RoomPhase,
    answers: [Option<String>; 2],
    scores: [u32; 2],
    items: [ItemStock; 2],
    points_per_correct: u32,
}

impl DuelRoom {
    /// Create a room in the `Preparing` phase
    pub fn new(
        id: RoomId,
        seat_a: SeatInfo,
        seat_b: SeatInfo,
        questions: Vec<Question>,
        points_per_correct: u32,
        items_per_kind: u32,
    ) -> Result<Self> {
        if questions.is_empty() {
            return Err(ArenaError::QuestionSupplyFailed {
                reason: format!("Room {} created without questions", id),
            }
            .into());
        }

        let stock = |seat: &SeatInfo| {
            if seat.is_bot() {
                ItemStock::default()
            } else {
                ItemStock {
                    fog: items_per_kind,
                    hint: items_per_kind,
                }
            }
        };
        let items = [stock(&seat_a), stock(&seat_b)];

        Ok(Self {
            id,
            seats: [seat_a, seat_b],
            questions,
            round_index: 0,
            phase: RoomPhase::Preparing,
            answers: [None, None],
            scores: [0, 0],
            items,
            points_per_correct,
        })
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn phase(&self) -> RoomPhase {
        self.phase
    }

    /// 0-based index of the current round
    pub fn round_index(&self) -> usize {
        self.round_index
    }

    pub fn total_rounds(&self) -> usize {
        self.questions.len()
    }

    pub fn current_question(&self) -> &Question {
        // index never passes the last question
        &self.questions[self.round_index]
    }

    pub fn seat(&self, seat: Seat) -> &SeatInfo {
        &self.seats[seat.index()]
    }

    pub fn score(&self, seat: Seat) -> u32 {
        self.scores[seat.index()]
    }

    pub fn answer(&self, seat: Seat) -> Option<&str> {
        self.answers[seat.index()].as_deref()
    }

    pub fn is_bot_game(&self) -> bool {
        self.seats.iter().any(SeatInfo::is_bot)
    }

    /// Seat taken by the bot, if any
    pub fn bot_seat(&self) -> Option<Seat> {
        [Seat::A, Seat::B]
            .into_iter()
            .find(|seat| self.seat(*seat).is_bot())
    }

    /// Seats held by real connections
    pub fn real_seats(&self) -> impl Iterator<Item = (Seat, ConnectionId)> + '_ {
        [Seat::A, Seat::B]
            .into_iter()
            .filter_map(|seat| self.seat(seat).connection.map(|conn| (seat, conn)))
    }

    /// Open the first round
    pub fn begin(&mut self) -> bool {
        if self.phase != RoomPhase::Preparing {
            return false;
        }
        self.phase = RoomPhase::AwaitingAnswers;
        true
    }

    /// Record an answer for the current round, overwriting an earlier one.
    ///
    /// `expected_round` lets delayed submitters (the bot) refuse to answer a
    /// round other than the one they were scheduled for.
    pub fn submit_answer(
        &mut self,
        seat: Seat,
        answer: &str,
        expected_round: Option<usize>,
    ) -> SubmitOutcome {
        if self.phase != RoomPhase::AwaitingAnswers {
            return SubmitOutcome::Rejected;
        }
        if expected_round.is_some_and(|round| round != self.round_index) {
            return SubmitOutcome::Rejected;
        }

        self.answers[seat.index()] = Some(answer.trim().to_string());

        if self.answers.iter().all(Option::is_some) {
            SubmitOutcome::RoundComplete
        } else {
            SubmitOutcome::Recorded
        }
    }

    /// Score the current round with whatever answers are present
    pub fn resolve_round(&mut self, timed_out: bool) -> Option<RoundResult> {
        if self.phase != RoomPhase::AwaitingAnswers {
            return None;
        }

        let correct_answer = self.current_question().answer.clone();
        let correct = [
            answer_matches(self.answers[0].as_deref(), &correct_answer),
            answer_matches(self.answers[1].as_deref(), &correct_answer),
        ];
        let score_change = correct.map(|ok| if ok { self.points_per_correct } else { 0 });

        for (score, change) in self.scores.iter_mut().zip(score_change) {
            *score += change;
        }
        self.phase = RoomPhase::RoundResolved;

        Some(RoundResult {
            round_index: self.round_index,
            correct_answer,
            answers: self.answers.clone(),
            correct,
            score_change,
            scores: self.scores,
            timed_out,
        })
    }

    pub fn has_next_round(&self) -> bool {
        self.round_index + 1 < self.questions.len()
    }

    /// Move from a resolved round to the next one, clearing both answers
    pub fn advance(&mut self) -> bool {
        if self.phase != RoomPhase::RoundResolved || !self.has_next_round() {
            return false;
        }
        self.round_index += 1;
        self.answers = [None, None];
        self.phase = RoomPhase::AwaitingAnswers;
        true
    }

    /// Close the game after its last round
    pub fn finish(&mut self) -> bool {
        if self.phase != RoomPhase::RoundResolved || self.has_next_round() {
            return false;
        }
        self.phase = RoomPhase::GameOver;
        true
    }

    /// Close the game regardless of phase
    pub fn abandon(&mut self) {
        self.phase = RoomPhase::GameOver;
    }

    /// Final outcome for `seat`
    pub fn outcome_for(&self, seat: Seat) -> GameOutcome {
        GameOutcome::from_scores(self.score(seat), self.score(seat.other()))
    }

    /// Spend one item while the round is open
    pub fn use_item<R: Rng + ?Sized>(
        &mut self,
        seat: Seat,
        kind: ItemKind,
        rng: &mut R,
    ) -> Result<ItemUse> {
        if self.phase != RoomPhase::AwaitingAnswers {
            return Err(ArenaError::InvalidMessage {
                reason: format!("Item {:?} used outside an open round", kind),
            }
            .into());
        }

        let effect = match kind {
            ItemKind::Fog => ItemUse::Fog,
            ItemKind::Hint => {
                let question = self.current_question();
                let wrong = wrong_option_labels(question.options.len(), &question.answer);
                let wrong_option =
                    wrong
                        .choose(rng)
                        .cloned()
                        .ok_or_else(|| ArenaError::InvalidMessage {
                            reason: format!("Question {} has no wrong option", question.id),
                        })?;
                ItemUse::Hint { wrong_option }
            }
        };

        let stock = self.items[seat.index()].slot(kind);
        if *stock == 0 {
            return Err(ArenaError::InvalidMessage {
                reason: format!("No {:?} left", kind),
            }
            .into());
        }
        *stock -= 1;

        Ok(effect)
    }
}
