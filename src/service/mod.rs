//! Service layer for the quiz-arena service
//!
//! This module contains the application state, the HTTP/WebSocket server,
//! health checks and background task management.

pub mod app;
pub mod health;
pub mod http;
pub mod ws;

pub use app::{AppState, ServiceContext, ServiceError};
pub use health::{HealthCheck, HealthStatus};
pub use http::{create_router, HttpServer, HttpServerConfig};
