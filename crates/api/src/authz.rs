//! API-side authorization guard.
//!
//! Checks run in the service layer before any store access, while keeping
//! the domain crates and infra auth-agnostic.

use movierent_accounts::{AuthzError, Permission, authorize, authorize_owner_or};
use movierent_core::UserId;

use crate::context::PrincipalContext;

/// Require `permission` in the current request context.
pub fn require(principal: &PrincipalContext, permission: &'static str) -> Result<(), AuthzError> {
    authorize(&principal.principal(), &Permission::new(permission))
}

/// Require `permission` on a resource owned by `owner`. Admins pass for any
/// owner; everyone else only for themselves.
pub fn require_owner(
    principal: &PrincipalContext,
    owner: UserId,
    permission: &'static str,
) -> Result<(), AuthzError> {
    authorize_owner_or(&principal.principal(), owner, &Permission::new(permission))
}
