use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::adapters::message::MessageRenderer;
use crate::adapters::metrics_handler::{MetricsCollector, OUTCOME_DISPENSED, OUTCOME_EMPTY};
use crate::domain::DispenseOutcome;
use crate::persistence::SharedTokenRepository;

#[derive(Clone)]
pub struct DispenseState {
    pub repository: SharedTokenRepository,
    pub metrics: Arc<MetricsCollector>,
    pub message: Arc<MessageRenderer>,
}

/// `GET|POST /code`
///
/// - 200 `text/plain` message containing the token
/// - 204 when the pool is empty
/// - 503 when storage is unavailable or the lock could not be taken
///
/// Neither failure carries a body; only the status and the logs tell them
/// apart.
///
/// The transaction runs on its own task, so a client that disconnects
/// mid-request cannot cancel a commit in flight.
pub async fn dispense_code(State(state): State<DispenseState>) -> Response {
    let dispense = tokio::spawn(dispense_and_record(
        state.repository.clone(),
        state.metrics.clone(),
    ));

    match dispense.await {
        Ok(Some(DispenseOutcome::Dispensed(token))) => {
            let body = state.message.render(&token);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
                    (header::CACHE_CONTROL, "no-store"),
                ],
                body,
            )
                .into_response()
        }
        Ok(Some(DispenseOutcome::Empty)) => StatusCode::NO_CONTENT.into_response(),
        Ok(None) => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Dispense task failed");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

/// One dispense with its metrics and logs. `None` means it failed.
async fn dispense_and_record(
    repository: SharedTokenRepository,
    metrics: Arc<MetricsCollector>,
) -> Option<DispenseOutcome> {
    let timer = metrics.dispense_duration.start_timer();
    let result = repository.dispense().await;
    timer.observe_duration();

    match result {
        Ok(outcome @ DispenseOutcome::Dispensed(_)) => {
            metrics.record_outcome(OUTCOME_DISPENSED);
            tracing::info!("Access code dispensed");
            Some(outcome)
        }
        Ok(DispenseOutcome::Empty) => {
            metrics.record_outcome(OUTCOME_EMPTY);
            tracing::warn!("Token pool is exhausted");
            Some(DispenseOutcome::Empty)
        }
        Err(e) => {
            metrics.record_error(&e);
            tracing::error!(error = %e, kind = e.kind(), retryable = e.is_retryable(), "Dispense failed");
            None
        }
    }
}
