use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::failure::Severity;
use crate::health::HealthStatus;
use crate::reporting::{ClassifiedError, ErrorStats};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub base_url: String,
    pub backend_online: bool,
    pub queued_errors: usize,
    pub queue_capacity: usize,
    pub retry_max_attempts: u32,
    pub retry_delay_ms: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ErrorQuery {
    /// Only errors at or above this severity.
    pub min_severity: Option<Severity>,
    /// Most recent N errors.
    pub limit: Option<usize>,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let retry = state.retry_policy().config();
    let online = state.health().is_backend_online();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: if online { "operational" } else { "degraded" },
        base_url: state.client().base_url().to_string(),
        backend_online: online,
        queued_errors: state.reporter().stats().total,
        queue_capacity: state.reporter().queue_capacity(),
        retry_max_attempts: retry.max_attempts,
        retry_delay_ms: retry.delay_ms,
    })
}

pub async fn get_health(State(state): State<AdminState>) -> Json<HealthStatus> {
    Json(state.health().current_status())
}

pub async fn post_health_check(State(state): State<AdminState>) -> Json<HealthStatus> {
    state.health().check_health().await;
    Json(state.health().current_status())
}

pub async fn get_errors(
    State(state): State<AdminState>,
    Query(query): Query<ErrorQuery>,
) -> Json<Vec<ClassifiedError>> {
    let mut errors: Vec<_> = state
        .reporter()
        .queued_errors()
        .into_iter()
        .filter(|e| query.min_severity.map_or(true, |min| e.severity >= min))
        .collect();

    if let Some(limit) = query.limit {
        let skip = errors.len().saturating_sub(limit);
        errors.drain(..skip);
    }
    Json(errors)
}

pub async fn clear_errors(State(state): State<AdminState>) -> StatusCode {
    state.reporter().clear_queue();
    tracing::info!("Error queue cleared via admin API");
    StatusCode::NO_CONTENT
}

pub async fn get_error_stats(State(state): State<AdminState>) -> Json<ErrorStats> {
    Json(state.reporter().stats())
}
