//! Health check endpoints and monitoring
//!
//! This module provides health check functionality for the quiz-arena
//! service, including readiness and liveness probes.

use crate::service::app::ServiceContext;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::error;

/// Health check status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "✅ healthy"),
            HealthStatus::Degraded => write!(f, "⚠️  degraded"),
            HealthStatus::Unhealthy => write!(f, "❌ unhealthy"),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    /// Service name
    pub service: String,
    /// Crate version
    pub version: String,
    /// Current timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
    /// Service statistics
    pub stats: ServiceStats,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional error message if unhealthy
    pub message: Option<String>,
}

/// Service statistics for health reporting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceStats {
    pub connections: usize,
    pub players_waiting: usize,
    pub players_in_rooms: usize,
    pub active_rooms: usize,
    pub human_matches: u64,
    pub bot_matches: u64,
    pub uptime_seconds: u64,
}

impl HealthCheck {
    /// Perform a full health check of the service
    pub async fn check(context: &ServiceContext) -> Result<Self> {
        let mut checks = Vec::new();
        let mut overall_status = HealthStatus::Healthy;

        let service_check = Self::check_service_running(context).await;
        if service_check.status != HealthStatus::Healthy {
            overall_status = HealthStatus::Unhealthy;
        }
        checks.push(service_check);

        let matchmaking_check = Self::check_matchmaking(context);
        if matchmaking_check.status == HealthStatus::Unhealthy {
            overall_status = HealthStatus::Unhealthy;
        } else if matchmaking_check.status == HealthStatus::Degraded
            && overall_status == HealthStatus::Healthy
        {
            overall_status = HealthStatus::Degraded;
        }
        checks.push(matchmaking_check);

        Ok(HealthCheck {
            status: overall_status,
            service: context.service_name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now(),
            checks,
            stats: Self::gather_service_stats(context),
        })
    }

    /// Simple liveness check - just verify service is running
    pub async fn liveness_check(context: &ServiceContext) -> HealthStatus {
        if context.is_running().await {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }

    /// Readiness check - verify service can handle requests
    pub async fn readiness_check(context: &ServiceContext) -> HealthStatus {
        if !context.is_running().await {
            return HealthStatus::Unhealthy;
        }
        Self::check_matchmaking(context).status
    }

    async fn check_service_running(context: &ServiceContext) -> ComponentCheck {
        let (status, message) = if context.is_running().await {
            (HealthStatus::Healthy, None)
        } else {
            (
                HealthStatus::Unhealthy,
                Some("Service is not running".to_string()),
            )
        };

        ComponentCheck {
            name: "service_running".to_string(),
            status,
            message,
        }
    }

    fn check_matchmaking(context: &ServiceContext) -> ComponentCheck {
        let (status, message) = match context.matchmaking.get_stats() {
            Ok(stats) if stats.supply_failures > 0 && stats.human_matches + stats.bot_matches == 0 => (
                HealthStatus::Degraded,
                Some(format!(
                    "{} pairings failed for lack of questions",
                    stats.supply_failures
                )),
            ),
            Ok(_) => (HealthStatus::Healthy, None),
            Err(e) => {
                error!("Matchmaking stats check failed: {}", e);
                (
                    HealthStatus::Unhealthy,
                    Some(format!("Stats check failed: {}", e)),
                )
            }
        };

        ComponentCheck {
            name: "matchmaking".to_string(),
            status,
            message,
        }
    }

    fn gather_service_stats(context: &ServiceContext) -> ServiceStats {
        let matches = context.matchmaking.get_stats().unwrap_or_default();

        ServiceStats {
            connections: context.registry.connection_count(),
            players_waiting: context.registry.waiting_count(),
            players_in_rooms: context.registry.seated_count(),
            active_rooms: context.arena.room_count(),
            human_matches: matches.human_matches,
            bot_matches: matches.bot_matches,
            uptime_seconds: context.uptime().as_secs(),
        }
    }

    /// Convert health check to JSON string
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize health check: {}", e))
    }
}
