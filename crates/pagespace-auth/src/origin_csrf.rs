//! Origin/CSRF Guard (C2, spec.md §4.2).
//!
//! Applied only to cookie-bound requests with a mutating method; bearer
//! callers skip both checks because bearer tokens are never auto-attached
//! by a browser, so there is nothing for a forged cross-site request to
//! ride along on.
//!
//! ## Origin check
//!
//! Defense-in-depth, not the primary control. Absent `Origin` header always
//! allows (covers non-browser clients that never send one). Otherwise both
//! the header and every configured allowed origin are normalized to
//! `scheme://host[:port]` with default ports collapsed, then compared for
//! an exact match — no subdomain or suffix rules.
//!
//! ## CSRF check
//!
//! The token is an HMAC over `(sessionId, timestamp, nonce)`, carried in
//! `X-CSRF-Token`. Validation re-derives the HMAC and compares in constant
//! time via [`subtle::ConstantTimeEq`]; origin is checked first and CSRF is
//! never consulted if origin already failed.

use std::time::{SystemTime, UNIX_EPOCH};

use http::Method;
use ring::hmac;
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use url::Url;

use crate::error::CsrfError;

/// How old a CSRF token may be before it is rejected as expired.
pub const CSRF_TOKEN_MAX_AGE_SECS: u64 = 60 * 60;

/// Origin-check enforcement mode (spec.md §4.2, mirrors
/// [`pagespace_core::config::OriginValidationMode`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginMode {
    /// Log a mismatch but allow the request through.
    Warn,
    /// Reject a mismatch with 403 `ORIGIN_INVALID`.
    Block,
}

/// Result of the origin check: whether to proceed, and whether the caller
/// should also consult CSRF (an allowed-but-failed `warn` still runs CSRF).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginDecision {
    /// Origin matched, or no origin configured/sent, or mode is `warn`.
    Allow,
    /// Mode is `block` and the origin did not match any allowed entry.
    Reject,
}

/// `true` if this HTTP method mutates state and therefore needs origin/CSRF
/// checks at all (spec.md §4.2: "method is not in {GET, HEAD, OPTIONS}").
#[must_use]
pub fn is_mutating_method(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// `true` if this request needs the origin/CSRF guard at all: the caller
/// must be cookie-bound and the method must mutate state. Bearer-token
/// callers (native clients presenting `ps_sess_*` or `mcp_*` directly) are
/// exempt — browsers never auto-attach a bearer header, so there is no
/// cross-site request to forge (spec.md §8 testable property 10).
#[must_use]
pub fn requires_csrf_guard(principal: &crate::principal::Principal, method: &Method) -> bool {
    principal.is_cookie_bound() && is_mutating_method(method)
}

/// Normalize a URL-ish string to `scheme://host[:port]`, collapsing the
/// scheme's default port. Returns `None` if the value does not parse as a
/// URL with a host.
fn normalize_origin(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    let scheme = url.scheme();
    let host = url.host_str()?;
    let port = url.port_or_known_default();
    match (scheme, port) {
        ("https", Some(443)) | ("http", Some(80)) | (_, None) => {
            Some(format!("{scheme}://{host}"))
        }
        (_, Some(p)) => Some(format!("{scheme}://{host}:{p}")),
    }
}

/// Check an incoming `Origin` header against the configured allow-list.
///
/// `allowed` is `{WEB_APP_URL} ∪ ADDITIONAL_ALLOWED_ORIGINS`, already
/// collected by the caller. A missing or unparsable allow-list entry is
/// skipped, not fatal.
#[must_use]
pub fn check_origin(origin_header: Option<&str>, allowed: &[String], mode: OriginMode) -> OriginDecision {
    let Some(origin) = origin_header else {
        return OriginDecision::Allow;
    };

    if allowed.is_empty() {
        tracing::warn!("origin check has no configured allowed origins; allowing by default");
        return OriginDecision::Allow;
    }

    let Some(normalized) = normalize_origin(origin) else {
        return reject_or_warn(mode, origin);
    };

    let matches = allowed
        .iter()
        .filter_map(|a| normalize_origin(a))
        .any(|a| a == normalized);

    if matches {
        OriginDecision::Allow
    } else {
        reject_or_warn(mode, origin)
    }
}

fn reject_or_warn(mode: OriginMode, origin: &str) -> OriginDecision {
    match mode {
        OriginMode::Warn => {
            tracing::warn!(origin, "origin did not match allow-list (warn mode)");
            OriginDecision::Allow
        }
        OriginMode::Block => OriginDecision::Reject,
    }
}

/// Issues and validates CSRF tokens bound to a session id via HMAC-SHA256.
#[derive(Clone)]
pub struct CsrfGuard {
    key: hmac::Key,
}

impl CsrfGuard {
    /// Construct a guard from the server's CSRF HMAC secret.
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, secret.expose_secret().as_bytes()),
        }
    }

    /// Issue a fresh token bound to `session_id` at the current time.
    #[must_use]
    pub fn issue(&self, session_id: &str) -> String {
        let timestamp = now_unix();
        let nonce = generate_nonce();
        self.encode(session_id, timestamp, &nonce)
    }

    fn encode(&self, session_id: &str, timestamp: u64, nonce: &str) -> String {
        let signature = self.sign(session_id, timestamp, nonce);
        format!("{timestamp}.{nonce}.{signature}")
    }

    fn sign(&self, session_id: &str, timestamp: u64, nonce: &str) -> String {
        let payload = format!("{session_id}:{timestamp}:{nonce}");
        let tag = hmac::sign(&self.key, payload.as_bytes());
        hex_encode(tag.as_ref())
    }

    /// Validate a presented token against the session it claims to bind to.
    ///
    /// # Errors
    /// - [`CsrfError::TokenInvalid`] for a malformed token, an HMAC
    ///   mismatch, or an expired timestamp.
    pub fn validate(&self, token: &str, session_id: &str) -> Result<(), CsrfError> {
        let mut parts = token.splitn(3, '.');
        let (Some(ts_raw), Some(nonce), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CsrfError::TokenInvalid);
        };

        let timestamp: u64 = ts_raw.parse().map_err(|_| CsrfError::TokenInvalid)?;
        let now = now_unix();
        if now.saturating_sub(timestamp) > CSRF_TOKEN_MAX_AGE_SECS {
            return Err(CsrfError::TokenInvalid);
        }

        let expected = self.sign(session_id, timestamp, nonce);
        if expected.as_bytes().ct_eq(signature.as_bytes()).unwrap_u8() == 1 {
            Ok(())
        } else {
            Err(CsrfError::TokenInvalid)
        }
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn generate_nonce() -> String {
    let bytes: [u8; 16] = uuid::Uuid::new_v4().into_bytes();
    hex_encode(&bytes)
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use pagespace_core::UserId;

    use super::*;
    use crate::principal::{Role, SessionPrincipal, VersionClaims};

    fn guard() -> CsrfGuard {
        CsrfGuard::new(&SecretString::new("test-hmac-secret".into()))
    }

    #[test]
    fn issued_token_round_trips() {
        let g = guard();
        let token = g.issue("sess-1");
        assert!(g.validate(&token, "sess-1").is_ok());
    }

    #[test]
    fn token_rejected_for_wrong_session() {
        let g = guard();
        let token = g.issue("sess-1");
        assert!(matches!(
            g.validate(&token, "sess-2"),
            Err(CsrfError::TokenInvalid)
        ));
    }

    #[test]
    fn malformed_token_rejected() {
        let g = guard();
        assert!(matches!(
            g.validate("not-a-token", "sess-1"),
            Err(CsrfError::TokenInvalid)
        ));
    }

    #[test]
    fn expired_token_rejected() {
        let g = guard();
        let nonce = generate_nonce();
        let ancient_ts = now_unix() - CSRF_TOKEN_MAX_AGE_SECS - 1;
        let token = g.encode("sess-1", ancient_ts, &nonce);
        assert!(matches!(
            g.validate(&token, "sess-1"),
            Err(CsrfError::TokenInvalid)
        ));
    }

    #[test]
    fn mutating_methods_require_the_check() {
        assert!(is_mutating_method(&Method::POST));
        assert!(is_mutating_method(&Method::DELETE));
        assert!(!is_mutating_method(&Method::GET));
        assert!(!is_mutating_method(&Method::HEAD));
        assert!(!is_mutating_method(&Method::OPTIONS));
    }

    #[test]
    fn origin_exact_match_allows() {
        let allowed = vec!["https://app.example.com".to_string()];
        assert_eq!(
            check_origin(Some("https://app.example.com"), &allowed, OriginMode::Block),
            OriginDecision::Allow
        );
    }

    #[test]
    fn origin_default_port_collapses() {
        let allowed = vec!["https://app.example.com:443".to_string()];
        assert_eq!(
            check_origin(Some("https://app.example.com"), &allowed, OriginMode::Block),
            OriginDecision::Allow
        );
    }

    #[test]
    fn origin_mismatch_blocks_in_block_mode() {
        let allowed = vec!["https://app.example.com".to_string()];
        assert_eq!(
            check_origin(Some("https://evil.example.com"), &allowed, OriginMode::Block),
            OriginDecision::Reject
        );
    }

    #[test]
    fn origin_mismatch_allows_in_warn_mode() {
        let allowed = vec!["https://app.example.com".to_string()];
        assert_eq!(
            check_origin(Some("https://evil.example.com"), &allowed, OriginMode::Warn),
            OriginDecision::Allow
        );
    }

    #[test]
    fn missing_origin_header_allows() {
        let allowed = vec!["https://app.example.com".to_string()];
        assert_eq!(
            check_origin(None, &allowed, OriginMode::Block),
            OriginDecision::Allow
        );
    }

    #[test]
    fn subdomains_do_not_match() {
        let allowed = vec!["https://app.example.com".to_string()];
        assert_eq!(
            check_origin(
                Some("https://evil.app.example.com"),
                &allowed,
                OriginMode::Block
            ),
            OriginDecision::Reject
        );
    }

    fn session_principal(source: SessionSource) -> crate::principal::Principal {
        crate::principal::Principal::Session(SessionPrincipal {
            session_id: "sess-1".into(),
            user_id: UserId::new(),
            role: Role::User,
            versions: VersionClaims {
                token_version: 1,
                admin_role_version: 1,
            },
            is_service: false,
            source,
        })
    }

    #[test]
    fn bearer_session_skips_csrf_guard() {
        let principal = session_principal(SessionSource::Header);
        assert!(!requires_csrf_guard(&principal, &Method::POST));
    }

    #[test]
    fn cookie_session_needs_csrf_guard_on_mutating_method() {
        let principal = session_principal(SessionSource::Cookie);
        assert!(requires_csrf_guard(&principal, &Method::POST));
        assert!(!requires_csrf_guard(&principal, &Method::GET));
    }
}
