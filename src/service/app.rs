//! Main application state and service coordination
//!
//! This module wires the arena components together and owns the background
//! tasks of the running service: the matchmaking scan, the HTTP/WebSocket
//! server and the uptime reporter.

use crate::bot::BotSimulator;
use crate::config::AppConfig;
use crate::duel::DuelArena;
use crate::matchmaking::MatchmakingManager;
use crate::metrics::MetricsCollector;
use crate::questions::{QuestionSupplier, StaticQuestionBank};
use crate::rating::{InMemoryPlayerStore, PlayerDirectory, RatingRules, RatingSettlement};
use crate::service::http::{HttpServer, HttpServerConfig};
use crate::session::{ConnectionRegistry, SessionRouter};
use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Wired engine components shared by the HTTP handlers and the binaries
#[derive(Clone)]
pub struct ServiceContext {
    pub service_name: String,
    pub registry: Arc<ConnectionRegistry>,
    pub arena: DuelArena,
    pub matchmaking: MatchmakingManager,
    pub router: SessionRouter,
    pub directory: Arc<dyn PlayerDirectory>,
    pub metrics: Arc<MetricsCollector>,
    is_running: Arc<RwLock<bool>>,
    started_at: Instant,
}

impl ServiceContext {
    /// Wire the engine around the given collaborators
    pub fn build(
        config: &AppConfig,
        questions: Arc<dyn QuestionSupplier>,
        directory: Arc<dyn PlayerDirectory>,
        settlement: Arc<dyn RatingSettlement>,
    ) -> Result<Self, ServiceError> {
        let metrics = Arc::new(MetricsCollector::new().map_err(|e| {
            ServiceError::Initialization {
                message: format!("Failed to create metrics collector: {}", e),
            }
        })?);

        let registry = Arc::new(ConnectionRegistry::new());
        let bot = Arc::new(BotSimulator::new(config.bot.clone()));
        let arena = DuelArena::new(
            registry.clone(),
            bot.clone(),
            settlement,
            RatingRules::new(config.rating.clone()),
            config.duel.clone(),
            metrics.clone(),
        );
        let matchmaking = MatchmakingManager::new(
            registry.clone(),
            arena.clone(),
            questions,
            bot,
            config.matchmaking.clone(),
            metrics.clone(),
        );
        let router = SessionRouter::new(
            registry.clone(),
            matchmaking.clone(),
            arena.clone(),
            directory.clone(),
            metrics.clone(),
        );

        Ok(Self {
            service_name: config.service.name.clone(),
            registry,
            arena,
            matchmaking,
            router,
            directory,
            metrics,
            is_running: Arc::new(RwLock::new(false)),
            started_at: Instant::now(),
        })
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub async fn set_running(&self, running: bool) {
        *self.is_running.write().await = running;
    }

    /// Time since the context was built
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Engine components
    context: ServiceContext,

    /// HTTP/WebSocket server
    http_server: Arc<HttpServer>,

    /// Background task handles
    background_tasks: Vec<JoinHandle<()>>,
}

impl AppState {
    /// Initialize the application with the built-in collaborators
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing quiz-arena service");

        let questions = Self::initialize_questions(&config)?;
        let store = Self::initialize_player_store(&config)?;

        Self::with_collaborators(config, questions, store.clone(), store)
    }

    /// Initialize the application around external collaborators
    pub fn with_collaborators(
        config: AppConfig,
        questions: Arc<dyn QuestionSupplier>,
        directory: Arc<dyn PlayerDirectory>,
        settlement: Arc<dyn RatingSettlement>,
    ) -> Result<Self, ServiceError> {
        info!(
            "Configuration: service={}, listen={}:{}, questions/game={}, bot fallback={}",
            config.service.name,
            config.service.host,
            config.service.port,
            config.duel.questions_per_game,
            config.matchmaking.enable_bot_fallback
        );

        let context = ServiceContext::build(&config, questions, directory, settlement)?;
        let http_server = Arc::new(HttpServer::new(
            HttpServerConfig {
                host: config.service.host.clone(),
                port: config.service.port,
            },
            context.clone(),
        ));

        Ok(Self {
            config,
            context,
            http_server,
            background_tasks: Vec::new(),
        })
    }

    fn initialize_questions(config: &AppConfig) -> Result<Arc<dyn QuestionSupplier>, ServiceError> {
        let bank = match &config.questions.bank_path {
            Some(path) => {
                StaticQuestionBank::from_file(path).map_err(|e| ServiceError::Configuration {
                    message: e.to_string(),
                })?
            }
            None => {
                info!("No question bank configured, using the built-in bank");
                StaticQuestionBank::builtin()
            }
        };

        if bank.len() < config.duel.questions_per_game {
            warn!(
                "Question bank holds {} questions, games will be shorter than {} rounds",
                bank.len(),
                config.duel.questions_per_game
            );
        }
        Ok(Arc::new(bank))
    }

    fn initialize_player_store(config: &AppConfig) -> Result<Arc<InMemoryPlayerStore>, ServiceError> {
        let rules = RatingRules::new(config.rating.clone());
        let store = match &config.players.roster_path {
            Some(path) => InMemoryPlayerStore::from_file(path, rules).map_err(|e| {
                ServiceError::Configuration {
                    message: e.to_string(),
                }
            })?,
            None => {
                warn!("No player roster configured, every connection will be rejected");
                InMemoryPlayerStore::new(rules)
            }
        };
        Ok(Arc::new(store))
    }

    /// Start all background services
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting quiz-arena service");

        self.context.set_running(true).await;

        self.start_http_server();
        self.start_background_tasks();

        info!("✅ Quiz-arena service started successfully");
        Ok(())
    }

    fn start_http_server(&mut self) {
        let server = self.http_server.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = server.start().await {
                error!("HTTP server failed: {}", e);
            } else {
                info!("HTTP server task completed");
            }
        });
        self.background_tasks.push(handle);
    }

    fn start_background_tasks(&mut self) {
        info!(
            "Starting matchmaking scan every {}ms",
            self.config.matchmaking.scan_interval_ms
        );
        self.background_tasks
            .push(self.context.matchmaking.start_scan_task());

        let context = self.context.clone();
        self.background_tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(15));
            loop {
                ticker.tick().await;
                context.metrics.update_uptime(context.uptime());
                let status = if context.is_running().await { 2 } else { 0 };
                context.metrics.update_health_status(status);
            }
        }));
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of quiz-arena service");

        self.context.set_running(false).await;

        if let Err(e) = self.http_server.stop().await {
            warn!("Failed to stop HTTP server: {}", e);
        }

        for task in self.background_tasks.drain(..) {
            task.abort();
        }

        self.context.arena.shutdown().await;

        let final_stats = self.context.matchmaking.get_stats().map_err(|e| {
            ServiceError::BackgroundTask {
                message: format!("Failed to get final stats: {}", e),
            }
        })?;

        info!("Final matchmaking statistics: {:?}", final_stats);
        info!("✅ Quiz-arena service shutdown completed");
        Ok(())
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Get the engine components
    pub fn context(&self) -> &ServiceContext {
        &self.context
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        self.context.is_running().await
    }
}
