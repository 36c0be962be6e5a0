use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::persistence::SharedTokenRepository;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthChecks {
    pub storage: String,
}

pub struct HealthHandler {
    repository: SharedTokenRepository,
    start_time: std::time::Instant,
}

impl HealthHandler {
    pub fn new(repository: SharedTokenRepository) -> Self {
        Self {
            repository,
            start_time: std::time::Instant::now(),
        }
    }

    /// Basic health check - returns 200 while the process is serving,
    /// reporting the storage check in the body
    pub async fn health(&self) -> impl IntoResponse {
        let storage = match self.repository.health_check().await {
            Ok(()) => "ok".to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Storage health check failed");
                "unavailable".to_string()
            }
        };

        let status = HealthStatus {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            checks: HealthChecks { storage },
        };

        (StatusCode::OK, Json(status))
    }

    /// Readiness check - 200 only if the token store answers
    pub async fn ready(&self) -> impl IntoResponse {
        match self.repository.count().await {
            Ok(remaining) => (
                StatusCode::OK,
                Json(serde_json::json!({
                    "status": "ready",
                    "remaining": remaining
                })),
            ),
            Err(e) => {
                tracing::warn!(error = %e, "Readiness check failed");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(serde_json::json!({
                        "status": "not_ready",
                        "message": "Token store is unavailable"
                    })),
                )
            }
        }
    }

    /// Liveness check - returns 200 if server is alive
    pub async fn live(&self) -> impl IntoResponse {
        (StatusCode::OK, Json(serde_json::json!({
            "status": "alive",
            "message": "Server is alive"
        })))
    }
}
