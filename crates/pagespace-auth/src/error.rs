//! Error types for authentication, origin/CSRF defense, and MCP scope
//! enforcement.
//!
//! Variants map 1:1 onto the HTTP error taxonomy in spec.md §7. The server
//! crate's `IntoResponse` impl is the only place that turns these into a
//! status code + body; this crate never touches HTTP types directly.

/// Result alias for this crate.
pub type AuthResult<T> = Result<T, AuthError>;

/// Authentication failures (spec.md §4.1). All variants render the same way
/// to callers — "never leak whether the token existed vs. was revoked vs.
/// had a version mismatch" — the distinct variants exist so the server can
/// log the real cause while returning a uniform message.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AuthError {
    /// No bearer token and no session cookie were presented.
    #[error("Authentication required")]
    NoCredentials,

    /// The bearer token did not match `ps_sess_*` or `mcp_*`.
    #[error("Invalid token format")]
    InvalidTokenFormat,

    /// A session cookie or `ps_sess_*` bearer failed lookup or version check.
    #[error("Invalid or expired session")]
    InvalidSession,

    /// An `mcp_*` token failed lookup, version check, or scope check.
    #[error("Invalid or expired session")]
    InvalidMcpToken,

    /// The route does not permit MCP bearer tokens.
    #[error("MCP tokens are not permitted for this endpoint")]
    McpNotPermitted,

    /// The route declared no permitted auth methods (misconfiguration).
    #[error("No authentication methods permitted")]
    NoMethodsPermitted,
}

/// Origin/CSRF defense failures (spec.md §4.2), each with the `code` the
/// response body must carry.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[non_exhaustive]
pub enum CsrfError {
    /// `Origin` header present but normalized value not in the allow-list.
    #[error("origin not allowed")]
    OriginInvalid,
    /// Mutating cookie-bound request missing `X-CSRF-Token`.
    #[error("csrf token missing")]
    TokenMissing,
    /// HMAC mismatch or token expired.
    #[error("csrf token invalid")]
    TokenInvalid,
    /// CSRF validation needs a session but none was found.
    #[error("no session for csrf validation")]
    NoSession,
    /// Session lookup for CSRF validation failed version checks.
    #[error("invalid session for csrf validation")]
    InvalidSession,
}

impl CsrfError {
    /// The machine-readable `code` field spec.md §4.2/§7 requires in the
    /// JSON error body.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::OriginInvalid => "ORIGIN_INVALID",
            Self::TokenMissing => "CSRF_TOKEN_MISSING",
            Self::TokenInvalid => "CSRF_TOKEN_INVALID",
            Self::NoSession => "CSRF_NO_SESSION",
            Self::InvalidSession => "CSRF_INVALID_SESSION",
        }
    }
}

/// MCP drive/page scope failures (spec.md §4.3).
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[non_exhaustive]
pub enum ScopeError {
    /// `driveId` (or the page's owning drive) is not in `allowedDriveIds`.
    #[error("This token does not have access to this drive")]
    DriveNotInScope,
    /// A scoped token attempted to create a new drive.
    #[error("This token does not have access to this drive")]
    CannotCreateDrive,
    /// The referenced page does not exist.
    #[error("page not found")]
    PageNotFound,
}
