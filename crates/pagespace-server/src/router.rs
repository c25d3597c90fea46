//! Assembles the axum application: route table, per-route auth/CSRF
//! middleware, and the cross-cutting tower layers (spec.md §6).

use axum::routing::{get, post};
use axum::Router;
use pagespace_auth::AllowedCredentials;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::{auth, csrf};
use crate::routes;
use crate::state::AppState;

/// Build the full application router over `state`.
pub fn build(state: AppState) -> Router {
    let guarded = |allowed: AllowedCredentials, router: Router<AppState>| -> Router<AppState> {
        router
            .layer(axum::middleware::from_fn_with_state(state.clone(), csrf::guard))
            .layer(axum::middleware::from_fn_with_state(state.clone(), auth::require(allowed)))
    };

    let activities = guarded(AllowedCredentials::session_and_mcp(), Router::new().route("/api/activities", get(routes::activities::list)));
    let upload = guarded(AllowedCredentials::session_and_mcp(), Router::new().route("/api/upload", post(routes::upload::upload)));
    let chat = guarded(AllowedCredentials::session_only(), Router::new().route("/api/ai/chat", post(routes::chat::chat)));
    let abort = guarded(AllowedCredentials::session_only(), Router::new().route("/api/ai/abort", post(routes::abort::abort)));

    let timed = activities
        .merge(upload)
        .merge(abort)
        .layer(TimeoutLayer::new(state.config.server.request_timeout));

    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .merge(timed)
        .merge(chat)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
