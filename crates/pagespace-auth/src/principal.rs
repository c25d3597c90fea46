//! The authenticated principal attached to a request by C1, and consumed
//! by C2/C3 and every downstream component.

use std::collections::HashSet;

use pagespace_core::{DriveId, UserId};

/// A user's application role. `Admin` privilege additionally requires
/// `admin_role_version` to still match the persisted value (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Ordinary user.
    User,
    /// Administrator — subject to `adminRoleVersion` revocation (spec.md §3).
    Admin,
}

/// Where the caller's bearer/session material came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSource {
    /// `session=` cookie.
    Cookie,
    /// `Authorization: Bearer ps_sess_*` (native client).
    Header,
}

/// Claims common to both session and MCP principals, used to re-validate
/// revocation on every request (spec.md §3 invariants).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionClaims {
    /// Must match the user row's `tokenVersion` or the credential is dead.
    pub token_version: i64,
    /// Must match the user row's `adminRoleVersion` for admin privilege to
    /// still apply; a stale admin credential degrades to `Role::User`
    /// rather than failing outright (spec.md §3: "invalidates admin
    /// elevation without requiring a re-login").
    pub admin_role_version: i64,
}

/// A principal authenticated via session (cookie or bearer).
#[derive(Debug, Clone)]
pub struct SessionPrincipal {
    /// Opaque session id (hash key into the session store).
    pub session_id: String,
    /// Owning user.
    pub user_id: UserId,
    /// Effective role, after admin-version re-check.
    pub role: Role,
    /// Revocation claims as captured at validation time.
    pub versions: VersionClaims,
    /// Session type from spec.md §3 (`user` vs `service`).
    pub is_service: bool,
    /// How the credential was presented.
    pub source: SessionSource,
}

/// A principal authenticated via a scoped or unscoped MCP token.
#[derive(Debug, Clone)]
pub struct McpPrincipal {
    /// Token row id (for `lastUsed` bookkeeping, not the secret itself).
    pub token_id: String,
    /// Owning user.
    pub user_id: UserId,
    /// Effective role, after admin-version re-check.
    pub role: Role,
    /// Revocation claims as captured at validation time.
    pub versions: VersionClaims,
    /// Empty set means unscoped (unrestricted by C3); non-empty means the
    /// token may only reach these drives.
    pub allowed_drive_ids: HashSet<DriveId>,
}

impl McpPrincipal {
    /// `true` when C3 scope checks are a no-op for this token.
    #[must_use]
    pub fn is_unscoped(&self) -> bool {
        self.allowed_drive_ids.is_empty()
    }
}

/// The authenticated identity attached to a request after C1 succeeds.
#[derive(Debug, Clone)]
pub enum Principal {
    /// Cookie- or header-bound session.
    Session(SessionPrincipal),
    /// `mcp_*` bearer token.
    Mcp(McpPrincipal),
}

impl Principal {
    /// The authenticated user, regardless of credential type.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        match self {
            Self::Session(s) => s.user_id,
            Self::Mcp(m) => m.user_id,
        }
    }

    /// Effective role, regardless of credential type.
    #[must_use]
    pub fn role(&self) -> Role {
        match self {
            Self::Session(s) => s.role,
            Self::Mcp(m) => m.role,
        }
    }

    /// `true` if this principal is an `mcp_*` token.
    #[must_use]
    pub fn is_mcp(&self) -> bool {
        matches!(self, Self::Mcp(_))
    }

    /// `true` if the request arrived with a cookie rather than a bearer
    /// header — the condition C2 uses to decide whether origin/CSRF checks
    /// apply at all.
    #[must_use]
    pub fn is_cookie_bound(&self) -> bool {
        matches!(
            self,
            Self::Session(SessionPrincipal {
                source: SessionSource::Cookie,
                ..
            })
        )
    }
}
