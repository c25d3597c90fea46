//! C2's origin/CSRF guard, run after [`super::auth`] has attached a
//! [`Principal`] extension. Only cookie-bound, mutating requests pay
//! either check (spec.md §8 testable property 10).

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use pagespace_auth::origin_csrf::{check_origin, is_mutating_method, requires_csrf_guard, OriginDecision, OriginMode};
use pagespace_auth::{CsrfError, Principal};

use crate::error::ApiError;
use crate::state::AppState;

/// Enforce origin and CSRF checks for this request, given an already
/// authenticated principal in the request extensions.
pub async fn guard(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    let origin_header = req.headers().get(http::header::ORIGIN).and_then(|v| v.to_str().ok());
    let method = req.method().clone();

    if is_mutating_method(&method) {
        let mode = match state.config.security.origin_validation_mode {
            pagespace_core::config::OriginValidationMode::Warn => OriginMode::Warn,
            pagespace_core::config::OriginValidationMode::Block => OriginMode::Block,
        };
        let mut allowed: Vec<String> = state.config.security.web_app_url.iter().cloned().collect();
        allowed.extend(state.config.security.additional_allowed_origins.iter().cloned());
        if check_origin(origin_header, &allowed, mode) == OriginDecision::Reject {
            return ApiError::Csrf(CsrfError::OriginInvalid).into_response();
        }
    }

    let Some(principal) = req.extensions().get::<Principal>() else {
        return next.run(req).await;
    };

    if !requires_csrf_guard(principal, &method) {
        return next.run(req).await;
    }

    let Principal::Session(session) = principal else {
        return ApiError::Csrf(CsrfError::NoSession).into_response();
    };
    let session_id = session.session_id.clone();

    let Some(token) = req.headers().get("x-csrf-token").and_then(|v| v.to_str().ok()) else {
        return ApiError::Csrf(CsrfError::TokenMissing).into_response();
    };

    if let Err(e) = state.csrf.validate(token, &session_id) {
        return ApiError::Csrf(e).into_response();
    }

    next.run(req).await
}
