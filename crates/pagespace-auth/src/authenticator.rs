//! C1 — the Authenticator (spec.md §4.1).

use std::sync::Arc;

use crate::error::{AuthError, AuthResult};
use crate::mcp_token::McpTokenStore;
use crate::principal::{McpPrincipal, Principal, SessionPrincipal, SessionSource, VersionClaims};
use crate::session::SessionStore;
use crate::token::{classify_bearer, TokenKind};

/// Which credential families a route accepts. Declared per-endpoint by the
/// server crate's router, per spec.md §4.1.3 ("Route-allowed types are
/// declared per endpoint").
#[derive(Debug, Clone, Copy)]
pub struct AllowedCredentials {
    /// Accept `ps_sess_*` via cookie or bearer header.
    pub session: bool,
    /// Accept `mcp_*` bearer tokens.
    pub mcp: bool,
}

impl AllowedCredentials {
    /// Most endpoints: browsers and native clients, no MCP.
    #[must_use]
    pub const fn session_only() -> Self {
        Self {
            session: true,
            mcp: false,
        }
    }

    /// Endpoints reachable by both human sessions and MCP machine clients.
    #[must_use]
    pub const fn session_and_mcp() -> Self {
        Self {
            session: true,
            mcp: true,
        }
    }
}

/// What the transport layer extracted from the request, before any
/// validation. The server crate is responsible for pulling these out of
/// the actual `Authorization` header and `session` cookie.
#[derive(Debug, Clone, Copy)]
pub struct IncomingCredentials<'a> {
    /// Raw value of `Authorization: Bearer <t>`, if present.
    pub bearer: Option<&'a str>,
    /// Raw value of the `session` cookie, if present.
    pub cookie: Option<&'a str>,
}

/// Authenticates requests against the session and MCP-token stores.
pub struct Authenticator {
    session_store: Arc<dyn SessionStore>,
    mcp_token_store: Arc<dyn McpTokenStore>,
}

impl Authenticator {
    /// Construct an authenticator over the given stores.
    #[must_use]
    pub fn new(session_store: Arc<dyn SessionStore>, mcp_token_store: Arc<dyn McpTokenStore>) -> Self {
        Self {
            session_store,
            mcp_token_store,
        }
    }

    /// Classify and validate the request's credentials, per spec.md §4.1.
    ///
    /// # Errors
    /// Returns [`AuthError`] per the mapping in spec.md §4.1's error list.
    /// The specific variant is for server-side logging only — every
    /// variant maps to the same uniform 401 response body.
    pub async fn authenticate(
        &self,
        creds: IncomingCredentials<'_>,
        allowed: AllowedCredentials,
    ) -> AuthResult<Principal> {
        if !allowed.session && !allowed.mcp {
            return Err(AuthError::NoMethodsPermitted);
        }

        if let Some(token) = creds.bearer {
            return self.authenticate_bearer(token, allowed).await;
        }

        if let Some(cookie_token) = creds.cookie {
            if !allowed.session {
                return Err(AuthError::InvalidSession);
            }
            return self.authenticate_session(cookie_token, true).await;
        }

        Err(AuthError::NoCredentials)
    }

    async fn authenticate_bearer(
        &self,
        token: &str,
        allowed: AllowedCredentials,
    ) -> AuthResult<Principal> {
        match classify_bearer(token)? {
            TokenKind::Mcp => {
                if !allowed.mcp {
                    return Err(AuthError::McpNotPermitted);
                }
                self.authenticate_mcp(token).await
            }
            TokenKind::Session => {
                if !allowed.session {
                    return Err(AuthError::InvalidSession);
                }
                self.authenticate_session(token, false).await
            }
        }
    }

    async fn authenticate_session(&self, raw_token: &str, from_cookie: bool) -> AuthResult<Principal> {
        let claims = self
            .session_store
            .validate(raw_token)
            .await?
            .ok_or(AuthError::InvalidSession)?;

        Ok(Principal::Session(SessionPrincipal {
            session_id: claims.session_id,
            user_id: claims.user_id,
            role: claims.user_role,
            versions: VersionClaims {
                token_version: claims.token_version,
                admin_role_version: claims.admin_role_version,
            },
            is_service: claims.is_service,
            source: if from_cookie {
                SessionSource::Cookie
            } else {
                SessionSource::Header
            },
        }))
    }

    async fn authenticate_mcp(&self, raw_token: &str) -> AuthResult<Principal> {
        let claims = self
            .mcp_token_store
            .validate(raw_token)
            .await?
            .ok_or(AuthError::InvalidMcpToken)?;

        Ok(Principal::Mcp(McpPrincipal {
            token_id: claims.token_id,
            user_id: claims.user_id,
            role: claims.user_role,
            versions: VersionClaims {
                token_version: claims.token_version,
                admin_role_version: claims.admin_role_version,
            },
            allowed_drive_ids: claims.allowed_drive_ids,
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::{Duration, Utc};
    use pagespace_core::{DriveId, UserId};

    use super::*;
    use crate::mcp_token::{InMemoryMcpTokenStore, McpTokenClaims};
    use crate::principal::Role;
    use crate::session::{InMemorySessionStore, SessionClaims};

    fn authenticator_with(
        sessions: InMemorySessionStore,
        tokens: InMemoryMcpTokenStore,
    ) -> Authenticator {
        Authenticator::new(Arc::new(sessions), Arc::new(tokens))
    }

    #[tokio::test]
    async fn rejects_malformed_bearer() {
        let auth = authenticator_with(InMemorySessionStore::new(), InMemoryMcpTokenStore::new());
        let err = auth
            .authenticate(
                IncomingCredentials {
                    bearer: Some("not-a-real-token"),
                    cookie: None,
                },
                AllowedCredentials::session_and_mcp(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidTokenFormat));
    }

    #[tokio::test]
    async fn rejects_mcp_on_session_only_route() {
        let sessions = InMemorySessionStore::new();
        let tokens = InMemoryMcpTokenStore::new();
        tokens
            .insert(
                "hashed".into(),
                McpTokenClaims {
                    token_id: "t1".into(),
                    user_id: UserId::new(),
                    user_role: Role::User,
                    token_version: 1,
                    admin_role_version: 1,
                    allowed_drive_ids: HashSet::new(),
                },
            )
            .await;
        let auth = authenticator_with(sessions, tokens);
        let err = auth
            .authenticate(
                IncomingCredentials {
                    bearer: Some("mcp_hashed"),
                    cookie: None,
                },
                AllowedCredentials::session_only(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::McpNotPermitted));
    }

    #[tokio::test]
    async fn no_credentials_rejected() {
        let auth = authenticator_with(InMemorySessionStore::new(), InMemoryMcpTokenStore::new());
        let err = auth
            .authenticate(
                IncomingCredentials {
                    bearer: None,
                    cookie: None,
                },
                AllowedCredentials::session_and_mcp(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NoCredentials));
    }

    #[tokio::test]
    async fn valid_session_cookie_authenticates() {
        let sessions = InMemorySessionStore::new();
        sessions
            .insert(
                "ps_sess_good".into(),
                SessionClaims {
                    session_id: "sess1".into(),
                    user_id: UserId::new(),
                    user_role: Role::User,
                    token_version: 1,
                    admin_role_version: 1,
                    is_service: false,
                    scopes: vec!["*".into()],
                    expires_at: Utc::now() + Duration::days(7),
                },
            )
            .await;
        let auth = authenticator_with(sessions, InMemoryMcpTokenStore::new());
        let principal = auth
            .authenticate(
                IncomingCredentials {
                    bearer: None,
                    cookie: Some("ps_sess_good"),
                },
                AllowedCredentials::session_only(),
            )
            .await
            .unwrap();
        assert!(principal.is_cookie_bound());
        assert!(!principal.is_mcp());
    }

    #[tokio::test]
    async fn scoped_mcp_token_with_all_drives_deleted_is_fail_closed() {
        let tokens = InMemoryMcpTokenStore::new();
        let drive = DriveId::new();
        tokens.add_live_drive(drive).await;
        tokens
            .insert_scoped(
                "hashed".into(),
                McpTokenClaims {
                    token_id: "t1".into(),
                    user_id: UserId::new(),
                    user_role: Role::User,
                    token_version: 1,
                    admin_role_version: 1,
                    allowed_drive_ids: HashSet::from([drive]),
                },
            )
            .await;
        tokens.remove_live_drive(drive).await;

        let auth = authenticator_with(InMemorySessionStore::new(), tokens);
        let err = auth
            .authenticate(
                IncomingCredentials {
                    bearer: Some("mcp_hashed"),
                    cookie: None,
                },
                AllowedCredentials::session_and_mcp(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidMcpToken));
    }
}
