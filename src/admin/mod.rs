//! Admin API.
//!
//! Bearer-key protected JSON endpoints over the running `GuardContext`:
//! backend health, the error queue and its statistics.

pub mod auth;
pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::lifecycle::GuardContext;

pub type AdminState = Arc<GuardContext>;

/// Bounds `POST /admin/health/check`, which waits on a live probe.
const ADMIN_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[allow(deprecated)]
pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/health", get(get_health))
        .route("/admin/health/check", post(post_health_check))
        .route("/admin/errors", get(get_errors).delete(clear_errors))
        .route("/admin/errors/stats", get(get_error_stats))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .layer(TimeoutLayer::new(ADMIN_REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
