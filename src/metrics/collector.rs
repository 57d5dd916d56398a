//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the quiz-arena matchmaking
//! and duel engine using Prometheus metrics.

use anyhow::Result;
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the arena service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Queue and pairing metrics
    matchmaking_metrics: MatchmakingMetrics,

    /// Room and settlement metrics
    duel_metrics: DuelMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Currently open client connections
    pub connections_open: IntGauge,

    /// Ignored client messages by reason
    pub protocol_errors_total: IntCounterVec,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,
}

/// Queue and pairing metrics
#[derive(Clone)]
pub struct MatchmakingMetrics {
    /// Total players entering a tier queue
    pub players_queued_total: IntCounterVec,

    /// Players currently waiting
    pub players_waiting: IntGauge,

    /// Time spent waiting before a pairing
    pub queue_wait_seconds: HistogramVec,

    /// Rooms created by opponent kind
    pub matches_total: IntCounterVec,

    /// Pairings aborted because no questions could be supplied
    pub question_supply_failures_total: IntCounter,

    /// Duration of one scan over all tier queues
    pub scan_duration_seconds: Histogram,
}

/// Room and settlement metrics
#[derive(Clone)]
pub struct DuelMetrics {
    /// Rooms currently alive
    pub active_rooms: IntGauge,

    /// Resolved rounds by what closed them
    pub rounds_resolved_total: IntCounterVec,

    /// Finished or abandoned games
    pub games_finished_total: IntCounterVec,

    /// Settlement calls that returned an error
    pub settlement_failures_total: IntCounter,

    /// Items used by kind
    pub items_used_total: IntCounterVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let matchmaking_metrics = MatchmakingMetrics::new(&registry)?;
        let duel_metrics = DuelMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            matchmaking_metrics,
            duel_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Get service metrics
    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    /// Get matchmaking metrics
    pub fn matchmaking(&self) -> &MatchmakingMetrics {
        &self.matchmaking_metrics
    }

    /// Get duel metrics
    pub fn duel(&self) -> &DuelMetrics {
        &self.duel_metrics
    }

    /// Render every registered metric in the Prometheus text format
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Record a player entering a tier queue
    pub fn record_player_queued(&self, tier: &str) {
        self.matchmaking_metrics
            .players_queued_total
            .with_label_values(&[tier])
            .inc();
    }

    /// Set the number of waiting players
    pub fn set_players_waiting(&self, count: usize) {
        self.matchmaking_metrics
            .players_waiting
            .set(count as i64);
    }

    /// Record a room being created from a pairing
    pub fn record_match(&self, against_bot: bool, waits: &[Duration]) {
        let kind = if against_bot { "bot" } else { "human" };

        self.matchmaking_metrics
            .matches_total
            .with_label_values(&[kind])
            .inc();

        for wait in waits {
            self.matchmaking_metrics
                .queue_wait_seconds
                .with_label_values(&[kind])
                .observe(wait.as_secs_f64());
        }

        self.duel_metrics.active_rooms.inc();
    }

    /// Record a pairing dropped because the question supplier failed
    pub fn record_question_supply_failure(&self) {
        self.matchmaking_metrics
            .question_supply_failures_total
            .inc();
    }

    /// Record the duration of one scan pass
    pub fn record_scan(&self, duration: Duration) {
        self.matchmaking_metrics
            .scan_duration_seconds
            .observe(duration.as_secs_f64());
    }

    /// Record a resolved round
    pub fn record_round_resolved(&self, timed_out: bool) {
        let trigger = if timed_out { "timeout" } else { "answers" };
        self.duel_metrics
            .rounds_resolved_total
            .with_label_values(&[trigger])
            .inc();
    }

    /// Record a game reaching GAME_OVER
    pub fn record_game_finished(&self, draw: bool) {
        let result = if draw { "draw" } else { "decided" };
        self.duel_metrics
            .games_finished_total
            .with_label_values(&[result])
            .inc();
        self.duel_metrics.active_rooms.dec();
    }

    /// Record a room discarded because a participant left
    pub fn record_game_abandoned(&self) {
        self.duel_metrics
            .games_finished_total
            .with_label_values(&["abandoned"])
            .inc();
        self.duel_metrics.active_rooms.dec();
    }

    /// Record a failed settlement call
    pub fn record_settlement_failure(&self) {
        self.duel_metrics.settlement_failures_total.inc();
    }

    /// Record an item use
    pub fn record_item_used(&self, item: &str) {
        self.duel_metrics
            .items_used_total
            .with_label_values(&[item])
            .inc();
    }

    /// Record an ignored client message
    pub fn record_protocol_error(&self, reason: &str) {
        self.service_metrics
            .protocol_errors_total
            .with_label_values(&[reason])
            .inc();
    }

    /// Record a client connection opening
    pub fn connection_opened(&self) {
        self.service_metrics.connections_open.inc();
    }

    /// Record a client connection closing
    pub fn connection_closed(&self) {
        self.service_metrics.connections_open.dec();
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }

    /// Update uptime
    pub fn update_uptime(&self, uptime: Duration) {
        self.service_metrics
            .uptime_seconds
            .set(uptime.as_secs() as i64);
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds =
            IntGauge::new("quiz_arena_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let connections_open = IntGauge::new(
            "quiz_arena_connections_open",
            "Currently open client connections",
        )?;
        registry.register(Box::new(connections_open.clone()))?;

        let protocol_errors_total = IntCounterVec::new(
            Opts::new(
                "quiz_arena_protocol_errors_total",
                "Client messages ignored as protocol errors",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(protocol_errors_total.clone()))?;

        let health_status = IntGauge::new(
            "quiz_arena_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        Ok(Self {
            uptime_seconds,
            connections_open,
            protocol_errors_total,
            health_status,
        })
    }
}

impl MatchmakingMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let players_queued_total = IntCounterVec::new(
            Opts::new("quiz_arena_players_queued_total", "Total players queued"),
            &["tier"],
        )?;
        registry.register(Box::new(players_queued_total.clone()))?;

        let players_waiting = IntGauge::new(
            "quiz_arena_players_waiting",
            "Players currently waiting in a tier queue",
        )?;
        registry.register(Box::new(players_waiting.clone()))?;

        let queue_wait_seconds = HistogramVec::new(
            HistogramOpts::new(
                "quiz_arena_queue_wait_seconds",
                "Time a player waited before being paired",
            )
            .buckets(vec![0.5, 1.0, 2.0, 3.0, 5.0, 7.5, 10.0, 12.5, 15.0]),
            &["kind"],
        )?;
        registry.register(Box::new(queue_wait_seconds.clone()))?;

        let matches_total = IntCounterVec::new(
            Opts::new("quiz_arena_matches_total", "Total rooms created"),
            &["kind"],
        )?;
        registry.register(Box::new(matches_total.clone()))?;

        let question_supply_failures_total = IntCounter::new(
            "quiz_arena_question_supply_failures_total",
            "Pairings aborted because no questions were supplied",
        )?;
        registry.register(Box::new(question_supply_failures_total.clone()))?;

        let scan_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "quiz_arena_scan_duration_seconds",
                "Duration of one matchmaking scan",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
        )?;
        registry.register(Box::new(scan_duration_seconds.clone()))?;

        Ok(Self {
            players_queued_total,
            players_waiting,
            queue_wait_seconds,
            matches_total,
            question_supply_failures_total,
            scan_duration_seconds,
        })
    }
}

impl DuelMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let active_rooms = IntGauge::new("quiz_arena_active_rooms", "Rooms currently alive")?;
        registry.register(Box::new(active_rooms.clone()))?;

        let rounds_resolved_total = IntCounterVec::new(
            Opts::new("quiz_arena_rounds_resolved_total", "Total rounds resolved"),
            &["trigger"],
        )?;
        registry.register(Box::new(rounds_resolved_total.clone()))?;

        let games_finished_total = IntCounterVec::new(
            Opts::new("quiz_arena_games_finished_total", "Total games ended"),
            &["result"],
        )?;
        registry.register(Box::new(games_finished_total.clone()))?;

        let settlement_failures_total = IntCounter::new(
            "quiz_arena_settlement_failures_total",
            "Rating settlements that failed",
        )?;
        registry.register(Box::new(settlement_failures_total.clone()))?;

        let items_used_total = IntCounterVec::new(
            Opts::new("quiz_arena_items_used_total", "Total items used"),
            &["item"],
        )?;
        registry.register(Box::new(items_used_total.clone()))?;

        Ok(Self {
            active_rooms,
            rounds_resolved_total,
            games_finished_total,
            settlement_failures_total,
            items_used_total,
        })
    }
}
