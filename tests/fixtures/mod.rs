//! Test fixtures and collaborator doubles for integration testing

#![allow(dead_code)]

use async_trait::async_trait;
use quiz_arena::config::AppConfig;
use quiz_arena::error::{ArenaError, Result};
use quiz_arena::protocol::{ClientMessage, ServerMessage};
use quiz_arena::questions::QuestionSupplier;
use quiz_arena::rating::{InMemoryPlayerStore, RatingRules, RatingSettlement, SettlementRequest};
use quiz_arena::service::ServiceContext;
use quiz_arena::types::{ConnectionId, PlayerProfile, Question, QuestionType};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{timeout, Duration};

/// Settlement double that records every request
#[derive(Debug, Default)]
pub struct RecordingSettlement {
    requests: Mutex<Vec<SettlementRequest>>,
    fail: bool,
}

impl RecordingSettlement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records every request, then reports the rating store as unavailable
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<SettlementRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    pub fn count_for(&self, player_id: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.player_id == player_id)
            .count()
    }
}

#[async_trait]
impl RatingSettlement for RecordingSettlement {
    async fn settle_rating(&self, request: SettlementRequest) -> Result<()> {
        let room_id = request.room_id;
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        if self.fail {
            return Err(ArenaError::SettlementFailed {
                reason: format!("rating store unavailable for room {}", room_id),
            }
            .into());
        }
        Ok(())
    }
}

/// Supplier that always hands out the same ordered questions
pub struct ScriptedSupplier {
    questions: Vec<Question>,
}

impl ScriptedSupplier {
    /// `count` questions whose correct answer is always "A"
    pub fn with_answers_a(count: usize) -> Self {
        Self {
            questions: (0..count)
                .map(|i| Question {
                    id: i as u64,
                    content: format!("Scripted question {}", i + 1),
                    options: vec![
                        "A. right".to_string(),
                        "B. wrong".to_string(),
                        "C. wrong".to_string(),
                        "D. wrong".to_string(),
                    ],
                    answer: "A".to_string(),
                    difficulty: None,
                })
                .collect(),
        }
    }
}

#[async_trait]
impl QuestionSupplier for ScriptedSupplier {
    async fn supply_questions(
        &self,
        _question_type: QuestionType,
        count: usize,
    ) -> Result<Vec<Question>> {
        Ok(self.questions.iter().take(count).cloned().collect())
    }
}

/// Supplier whose backend is down
pub struct FailingSupplier;

#[async_trait]
impl QuestionSupplier for FailingSupplier {
    async fn supply_questions(
        &self,
        _question_type: QuestionType,
        _count: usize,
    ) -> Result<Vec<Question>> {
        Err(ArenaError::QuestionSupplyFailed {
            reason: "question service unavailable".to_string(),
        }
        .into())
    }
}

/// A connected player as seen from the socket side
pub struct TestClient {
    pub connection: ConnectionId,
    pub profile: PlayerProfile,
    pub inbox: UnboundedReceiver<ServerMessage>,
}

impl TestClient {
    /// Next pushed message, failing the test if nothing arrives in time
    pub async fn next(&mut self) -> ServerMessage {
        match timeout(Duration::from_secs(120), self.inbox.recv()).await {
            Ok(Some(message)) => message,
            Ok(None) => panic!("connection {} closed", self.profile.id),
            Err(_) => panic!("no message for {} within 120s", self.profile.id),
        }
    }

    /// Messages already queued for this client
    pub fn drain(&mut self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.inbox.try_recv() {
            messages.push(message);
        }
        messages
    }

    pub async fn send(&self, context: &ServiceContext, message: ClientMessage) {
        let text = serde_json::to_string(&message).unwrap();
        context.router.handle_text(self.connection, &text).await;
    }

    pub async fn answer(&self, context: &ServiceContext, answer: &str) {
        self.send(context, ClientMessage::Answer(answer.to_string()))
            .await;
    }
}

/// Engine wired around test collaborators
pub struct TestArena {
    pub context: ServiceContext,
    pub store: Arc<InMemoryPlayerStore>,
    pub settlement: Arc<RecordingSettlement>,
}

impl TestArena {
    pub fn new(config: AppConfig, questions: Arc<dyn QuestionSupplier>) -> Self {
        Self::with_settlement(config, questions, RecordingSettlement::new())
    }

    pub fn with_settlement(
        config: AppConfig,
        questions: Arc<dyn QuestionSupplier>,
        settlement: RecordingSettlement,
    ) -> Self {
        let store = Arc::new(InMemoryPlayerStore::new(RatingRules::new(
            config.rating.clone(),
        )));
        let settlement = Arc::new(settlement);
        let context =
            ServiceContext::build(&config, questions, store.clone(), settlement.clone()).unwrap();
        Self {
            context,
            store,
            settlement,
        }
    }

    /// Defaults with a seeded bot and the scripted question set
    pub fn scripted() -> Self {
        Self::new(test_config(), Arc::new(ScriptedSupplier::with_answers_a(10)))
    }

    /// Register a player in the directory and open a session for them
    pub fn connect(&self, id: &str, rating_points: u32) -> TestClient {
        let profile = PlayerProfile {
            id: id.to_string(),
            name: format!("Player {}", id),
            avatar: None,
            rating_points,
        };
        self.store
            .insert_player(profile.clone(), format!("token-{}", id))
            .unwrap();
        let (connection, inbox) = self.context.router.connect(profile.clone());
        TestClient {
            connection,
            profile,
            inbox,
        }
    }

    /// Let spawned settlement tasks run
    pub async fn settle(&self) {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.bot.seed = Some(42);
    config
}
