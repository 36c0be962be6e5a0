//! # tokenpool - single-use access code dispenser
//!
//! tokenpool hands out one-time access codes from a durable SQLite pool.
//! Every `GET /code` takes exactly one code out of the pool inside an
//! exclusive transaction, so concurrent callers never receive the same code.
//!
//! ## Features
//!
//! - **Exclusive dispensing**: `BEGIN IMMEDIATE` select-then-delete, bounded lock wait
//! - **Provisioning**: generate or import codes from the command line
//! - **CORS**: configurable origin echo for pages served elsewhere
//! - **Metrics**: Prometheus counters per dispense outcome
//! - **Health Checks**: liveness and storage-backed readiness endpoints
//! - **Rate limiting**: optional global quota on the dispense endpoint
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokenpool::adapters::metrics_handler::MetricsCollector;
//! use tokenpool::config::Settings;
//! use tokenpool::persistence::{ConnectionPool, SqlxTokenRepository};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::new()?;
//!     let pool = ConnectionPool::open(&settings.storage).await?;
//!     let repository = Arc::new(SqlxTokenRepository::from_config(pool, &settings.storage)?);
//!
//!     let app = tokenpool::create_app(repository, Arc::new(MetricsCollector::new()?), &settings)?;
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod persistence;

use crate::adapters::cors::cors_layer;
use crate::adapters::dispense_handler::{self, DispenseState};
use crate::adapters::health_handler::HealthHandler;
use crate::adapters::message::MessageRenderer;
use crate::adapters::metrics_handler::{MetricsCollector, MetricsHandler};
use crate::adapters::rate_limit::{rate_limit_middleware, RateLimitState};
use crate::config::Settings;
use crate::persistence::SharedTokenRepository;
use axum::{routing::get, Router};
use std::sync::Arc;

/// Creates the Axum application router with all endpoints configured.
///
/// # Arguments
///
/// * `repository` - Token pool the `/code` endpoint dispenses from
/// * `metrics` - Prometheus collector shared with the `/metrics` endpoint
/// * `settings` - Application settings (message template, CORS, rate limit)
///
/// # Errors
///
/// Fails if the configured message template does not render a token.
pub fn create_app(
    repository: SharedTokenRepository,
    metrics: Arc<MetricsCollector>,
    settings: &Settings,
) -> anyhow::Result<Router> {
    let message = Arc::new(MessageRenderer::new(&settings.dispenser.message_template)?);
    let health_handler = Arc::new(HealthHandler::new(repository.clone()));
    let metrics_handler = Arc::new(MetricsHandler::new(metrics.clone(), repository.clone()));

    let dispense_state = DispenseState {
        repository,
        metrics: metrics.clone(),
        message,
    };

    let mut code_router = Router::new()
        .route(
            "/code",
            get(dispense_handler::dispense_code).post(dispense_handler::dispense_code),
        )
        .with_state(dispense_state);

    if let Some(rate_limit) = &settings.rate_limit {
        if rate_limit.enabled {
            tracing::info!(
                requests_per_second = rate_limit.requests_per_second,
                burst_size = rate_limit.burst_size,
                "Rate limiting /code"
            );
            code_router = code_router.route_layer(axum::middleware::from_fn_with_state(
                RateLimitState::new(rate_limit, metrics),
                rate_limit_middleware,
            ));
        }
    }

    let ops_router = Router::new()
        // Health check endpoints
        .route("/health", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.health().await }
            }
        }))
        .route("/health/ready", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.ready().await }
            }
        }))
        .route("/health/live", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.live().await }
            }
        }))
        // Metrics endpoint
        .route("/metrics", get({
            let handler = metrics_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.metrics().await }
            }
        }));

    Ok(code_router
        .merge(ops_router)
        .layer(cors_layer(&settings.cors)))
}
