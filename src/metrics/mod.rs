//! Metrics for the quiz-arena service
//!
//! Prometheus counters, gauges and histograms for matchmaking, rooms and
//! the client protocol. They are exposed over HTTP by the service module.

pub mod collector;

pub use collector::{DuelMetrics, MatchmakingMetrics, MetricsCollector, MetricsTimer, ServiceMetrics};
