//! Scope Enforcer (C3, spec.md §4.3).
//!
//! Constrains MCP principals to the drives they were scoped to at token
//! creation. Unscoped principals (empty `allowedDriveIds`) and every
//! session principal are unrestricted by this module — callers should
//! short-circuit on [`Principal::is_mcp`] before reaching for it, but each
//! function here also treats a non-MCP or unscoped principal as
//! unrestricted directly, so misuse fails safe rather than silently.

use std::collections::HashSet;

use async_trait::async_trait;
use pagespace_core::{DriveId, PageId};

use crate::error::ScopeError;
use crate::principal::{McpPrincipal, Principal};

/// Resolves a page to its owning drive, so page-scoped checks can delegate
/// to drive-scoped ones. Implemented by the server crate's page repository.
#[async_trait]
pub trait PageDriveResolver: Send + Sync {
    /// Look up the drive a page belongs to.
    async fn drive_for_page(&self, page_id: PageId) -> Result<Option<DriveId>, ScopeError>;
}

fn allowed_drives(principal: &Principal) -> Option<&HashSet<DriveId>> {
    match principal {
        Principal::Mcp(McpPrincipal {
            allowed_drive_ids, ..
        }) if !allowed_drive_ids.is_empty() => Some(allowed_drive_ids),
        _ => None,
    }
}

/// `checkMCPDriveScope`: ok iff unscoped, session-authenticated, or
/// `drive_id` is in the principal's `allowedDriveIds`.
///
/// # Errors
/// [`ScopeError::DriveNotInScope`] if the principal is scoped and
/// `drive_id` is not in its set.
pub fn check_drive_scope(principal: &Principal, drive_id: DriveId) -> Result<(), ScopeError> {
    match allowed_drives(principal) {
        Some(allowed) if !allowed.contains(&drive_id) => Err(ScopeError::DriveNotInScope),
        _ => Ok(()),
    }
}

/// `checkMCPPageScope`: resolves the page's drive, then delegates to
/// [`check_drive_scope`].
///
/// # Errors
/// [`ScopeError::PageNotFound`] if the page does not exist;
/// [`ScopeError::DriveNotInScope`] if it exists but is out of scope.
pub async fn check_page_scope(
    principal: &Principal,
    page_id: PageId,
    resolver: &dyn PageDriveResolver,
) -> Result<(), ScopeError> {
    let drive_id = resolver
        .drive_for_page(page_id)
        .await?
        .ok_or(ScopeError::PageNotFound)?;
    check_drive_scope(principal, drive_id)
}

/// `checkMCPCreateScope`: scoped tokens can never create a new drive
/// (`drive_id: None`); creating within an existing drive requires that
/// drive to be in scope.
///
/// # Errors
/// [`ScopeError::CannotCreateDrive`] for a scoped token attempting to
/// create a drive; [`ScopeError::DriveNotInScope`] for out-of-scope
/// creation within an existing drive.
pub fn check_create_scope(principal: &Principal, drive_id: Option<DriveId>) -> Result<(), ScopeError> {
    match (allowed_drives(principal), drive_id) {
        (Some(_), None) => Err(ScopeError::CannotCreateDrive),
        (Some(allowed), Some(id)) if !allowed.contains(&id) => Err(ScopeError::DriveNotInScope),
        _ => Ok(()),
    }
}

/// `filterDrivesByMCPScope`: intersects `ids` with the principal's
/// `allowedDriveIds`, or returns `ids` unchanged for an unscoped principal.
#[must_use]
pub fn filter_drives_by_scope(principal: &Principal, ids: &[DriveId]) -> Vec<DriveId> {
    match allowed_drives(principal) {
        Some(allowed) => ids.iter().filter(|id| allowed.contains(id)).copied().collect(),
        None => ids.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use pagespace_core::UserId;

    use super::*;
    use crate::principal::{Role, VersionClaims};

    fn versions() -> VersionClaims {
        VersionClaims {
            token_version: 1,
            admin_role_version: 1,
        }
    }

    fn scoped_principal(ids: &[DriveId]) -> Principal {
        Principal::Mcp(McpPrincipal {
            token_id: "t1".into(),
            user_id: UserId::new(),
            role: Role::User,
            versions: versions(),
            allowed_drive_ids: ids.iter().copied().collect(),
        })
    }

    fn unscoped_principal() -> Principal {
        scoped_principal(&[])
    }

    struct FakeResolver(Option<DriveId>);

    #[async_trait]
    impl PageDriveResolver for FakeResolver {
        async fn drive_for_page(&self, _page_id: PageId) -> Result<Option<DriveId>, ScopeError> {
            Ok(self.0)
        }
    }

    #[test]
    fn scoped_principal_restricted_to_its_drives() {
        let a = DriveId::new();
        let b = DriveId::new();
        let principal = scoped_principal(&[a]);
        assert!(check_drive_scope(&principal, a).is_ok());
        assert!(matches!(
            check_drive_scope(&principal, b),
            Err(ScopeError::DriveNotInScope)
        ));
    }

    #[test]
    fn unscoped_principal_is_unrestricted() {
        let principal = unscoped_principal();
        assert!(check_drive_scope(&principal, DriveId::new()).is_ok());
    }

    #[tokio::test]
    async fn page_scope_resolves_drive_then_delegates() {
        let a = DriveId::new();
        let principal = scoped_principal(&[a]);
        let resolver = FakeResolver(Some(a));
        assert!(check_page_scope(&principal, PageId::new(), &resolver).await.is_ok());

        let other = DriveId::new();
        let resolver = FakeResolver(Some(other));
        assert!(matches!(
            check_page_scope(&principal, PageId::new(), &resolver).await,
            Err(ScopeError::DriveNotInScope)
        ));
    }

    #[tokio::test]
    async fn page_scope_missing_page_is_not_found() {
        let principal = unscoped_principal();
        let resolver = FakeResolver(None);
        assert!(matches!(
            check_page_scope(&principal, PageId::new(), &resolver).await,
            Err(ScopeError::PageNotFound)
        ));
    }

    #[test]
    fn scoped_token_cannot_create_drive() {
        let principal = scoped_principal(&[DriveId::new()]);
        assert!(matches!(
            check_create_scope(&principal, None),
            Err(ScopeError::CannotCreateDrive)
        ));
    }

    #[test]
    fn scoped_token_can_create_within_its_scope() {
        let a = DriveId::new();
        let principal = scoped_principal(&[a]);
        assert!(check_create_scope(&principal, Some(a)).is_ok());
    }

    #[test]
    fn unscoped_principal_can_create_a_new_drive() {
        let principal = unscoped_principal();
        assert!(check_create_scope(&principal, None).is_ok());
    }

    #[test]
    fn filter_intersects_scope() {
        let a = DriveId::new();
        let b = DriveId::new();
        let c = DriveId::new();
        let principal = scoped_principal(&[a, b]);
        let filtered = filter_drives_by_scope(&principal, &[a, b, c]);
        assert_eq!(filtered.len(), 2);
        assert!(filtered.contains(&a));
        assert!(filtered.contains(&b));
    }

    #[test]
    fn filter_passes_through_for_unscoped() {
        let a = DriveId::new();
        let principal = unscoped_principal();
        assert_eq!(filter_drives_by_scope(&principal, &[a]), vec![a]);
    }
}
