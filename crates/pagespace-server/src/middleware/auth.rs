//! Wires C1's [`Authenticator`] into axum as per-route middleware. Each
//! route declares its own [`AllowedCredentials`] via [`require`]; the
//! resulting [`Principal`] is attached as a request extension for
//! handlers and the CSRF layer to read.

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;
use pagespace_auth::{AllowedCredentials, IncomingCredentials, Principal};

use crate::error::ApiError;
use crate::state::AppState;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers.get(http::header::AUTHORIZATION)?.to_str().ok()?.strip_prefix("Bearer ")
}

fn session_cookie<'a>(headers: &'a HeaderMap) -> Option<&'a str> {
    let raw = headers.get(http::header::COOKIE)?.to_str().ok()?;
    raw.split(';').map(str::trim).find_map(|kv| kv.strip_prefix("session="))
}

/// Build a middleware closure that enforces `allowed` on every request
/// it wraps, inserting the resulting [`Principal`] into the request's
/// extensions.
pub fn require(allowed: AllowedCredentials) -> impl Clone + Fn(State<AppState>, Request<Body>, Next) -> BoxAuthFuture {
    move |state, req, next| Box::pin(authenticate(state, allowed, req, next))
}

/// Boxed future type `axum::middleware::from_fn_with_state` needs from a
/// closure rather than a free function item.
pub type BoxAuthFuture = std::pin::Pin<Box<dyn std::future::Future<Output = Response> + Send>>;

async fn authenticate(
    State(state): State<AppState>,
    allowed: AllowedCredentials,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    use axum::response::IntoResponse;

    let creds = IncomingCredentials { bearer: bearer_token(req.headers()), cookie: session_cookie(req.headers()) };

    let principal: Principal = match state.authenticator.authenticate(creds, allowed).await {
        Ok(p) => p,
        Err(e) => return ApiError::from(e).into_response(),
    };

    req.extensions_mut().insert(principal);
    next.run(req).await
}
