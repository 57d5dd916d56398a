//! Main application configuration
//!
//! This module defines the primary configuration structures for the quiz-arena
//! service, including environment variable loading, TOML files and validation.

use crate::config::duel::{BotSettings, DuelSettings};
use crate::config::rating::RatingSettings;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub matchmaking: MatchmakingSettings,
    pub duel: DuelSettings,
    pub bot: BotSettings,
    pub rating: RatingSettings,
    pub questions: QuestionSettings,
    pub players: PlayerSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Host the HTTP/WebSocket server binds to
    pub host: String,
    /// Port the HTTP/WebSocket server binds to
    pub port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// Matchmaking-specific settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakingSettings {
    /// Interval between two matchmaking scans
    pub scan_interval_ms: u64,
    /// Wait after which adjacent tiers are searched too
    pub widen_after_seconds: u64,
    /// Wait after which the player is paired with a bot
    pub bot_after_seconds: u64,
    /// Pair long-waiting players with a bot opponent
    pub enable_bot_fallback: bool,
}

/// Question bank settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionSettings {
    /// Optional TOML file with the question bank; the built-in bank is used otherwise
    pub bank_path: Option<PathBuf>,
}

/// Player directory settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    /// Optional TOML roster of players and their access tokens
    pub roster_path: Option<PathBuf>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "quiz-arena".to_string(),
            log_level: "info".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for MatchmakingSettings {
    fn default() -> Self {
        Self {
            scan_interval_ms: 1000,
            widen_after_seconds: 5,
            bot_after_seconds: 10,
            enable_bot_fallback: true,
        }
    }
}

impl MatchmakingSettings {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    pub fn widen_after(&self) -> Duration {
        Duration::from_secs(self.widen_after_seconds)
    }

    pub fn bot_after(&self) -> Duration {
        Duration::from_secs(self.bot_after_seconds)
    }
}

/// Parse an environment variable into `target` if it is set
fn env_override<T: std::str::FromStr>(key: &str, target: &mut T) -> Result<()> {
    if let Ok(raw) = env::var(key) {
        *target = raw
            .parse()
            .map_err(|_| anyhow!("Invalid {} value: {}", key, raw))?;
    }
    Ok(())
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Service settings
        env_override("SERVICE_NAME", &mut config.service.name)?;
        env_override("LOG_LEVEL", &mut config.service.log_level)?;
        env_override("HOST", &mut config.service.host)?;
        env_override("PORT", &mut config.service.port)?;
        env_override(
            "SHUTDOWN_TIMEOUT_SECONDS",
            &mut config.service.shutdown_timeout_seconds,
        )?;

        // Matchmaking settings
        env_override("SCAN_INTERVAL_MS", &mut config.matchmaking.scan_interval_ms)?;
        env_override(
            "WIDEN_AFTER_SECONDS",
            &mut config.matchmaking.widen_after_seconds,
        )?;
        env_override("BOT_AFTER_SECONDS", &mut config.matchmaking.bot_after_seconds)?;
        env_override(
            "ENABLE_BOT_FALLBACK",
            &mut config.matchmaking.enable_bot_fallback,
        )?;

        // Duel settings
        env_override("QUESTIONS_PER_GAME", &mut config.duel.questions_per_game)?;
        env_override("START_DELAY_MS", &mut config.duel.start_delay_ms)?;
        env_override(
            "ROUND_TIMEOUT_SECONDS",
            &mut config.duel.round_timeout_seconds,
        )?;
        env_override("RESULT_VIEW_SECONDS", &mut config.duel.result_view_seconds)?;
        env_override("POINTS_PER_CORRECT", &mut config.duel.points_per_correct)?;

        // Bot settings
        env_override("BOT_MIN_DELAY_MS", &mut config.bot.min_delay_ms)?;
        env_override("BOT_MAX_DELAY_MS", &mut config.bot.max_delay_ms)?;
        env_override("BOT_ACCURACY", &mut config.bot.accuracy)?;
        if let Ok(seed) = env::var("BOT_SEED") {
            config.bot.seed = Some(
                seed.parse()
                    .map_err(|_| anyhow!("Invalid BOT_SEED value: {}", seed))?,
            );
        }

        // Question bank
        if let Ok(path) = env::var("QUESTION_BANK_PATH") {
            config.questions.bank_path = Some(PathBuf::from(path));
        }

        if let Ok(path) = env::var("PLAYER_ROSTER_PATH") {
            config.players.roster_path = Some(PathBuf::from(path));
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file; missing keys take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        validate_config(&config)?;
        Ok(config)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.port == 0 {
        return Err(anyhow!("Port cannot be 0"));
    }
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }

    // Validate matchmaking settings
    let matchmaking = &config.matchmaking;
    if matchmaking.scan_interval_ms == 0 {
        return Err(anyhow!("Scan interval must be greater than 0"));
    }
    if matchmaking.widen_after_seconds >= matchmaking.bot_after_seconds {
        return Err(anyhow!(
            "Tier widening ({}s) must happen before the bot fallback ({}s)",
            matchmaking.widen_after_seconds,
            matchmaking.bot_after_seconds
        ));
    }

    // Validate duel settings
    let duel = &config.duel;
    if duel.questions_per_game == 0 {
        return Err(anyhow!("Questions per game must be at least 1"));
    }
    if duel.round_timeout_seconds == 0 {
        return Err(anyhow!("Round timeout must be greater than 0"));
    }

    // Validate bot settings
    let bot = &config.bot;
    if bot.min_delay_ms > bot.max_delay_ms {
        return Err(anyhow!("Bot min delay cannot exceed max delay"));
    }
    if bot.max_delay_ms >= duel.round_timeout_seconds * 1000 {
        return Err(anyhow!(
            "Bot max delay ({}ms) must be shorter than the round timeout ({}s)",
            bot.max_delay_ms,
            duel.round_timeout_seconds
        ));
    }
    if !(0.0..=1.0).contains(&bot.accuracy) {
        return Err(anyhow!("Bot accuracy must be between 0 and 1"));
    }
    if bot.min_rating > bot.max_rating {
        return Err(anyhow!("Bot min rating cannot exceed max rating"));
    }

    Ok(())
}
