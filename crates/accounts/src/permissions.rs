use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Role;

/// Permission identifier.
///
/// Permissions are opaque strings (e.g. "rentals.create"). The wildcard `"*"`
/// grants everything and is only handed out to admins.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const WILDCARD: &'static str = "*";

    pub const MOVIES_RATE: &'static str = "movies.rate";
    pub const RENTALS_CREATE: &'static str = "rentals.create";
    pub const RENTALS_READ: &'static str = "rentals.read";
    pub const RENTALS_CANCEL: &'static str = "rentals.cancel";
    pub const USERS_READ: &'static str = "users.read";
    pub const USERS_UPDATE: &'static str = "users.update";

    pub const CATALOG_MANAGE: &'static str = "catalog.manage";
    pub const RENTALS_MANAGE: &'static str = "rentals.manage";
    pub const IMAGES_MANAGE: &'static str = "images.manage";

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == Self::WILDCARD
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Static role → permission policy.
///
/// `admin` grants the wildcard; `user` grants the customer-facing actions.
/// Ownership ("only your own rentals") is checked separately, see
/// [`crate::authorize_owner_or`].
pub fn permissions_for_roles(roles: &[Role]) -> Vec<Permission> {
    if roles.iter().any(Role::is_admin) {
        return vec![Permission::new(Permission::WILDCARD)];
    }

    if roles.iter().any(|r| r.as_str() == Role::USER) {
        return [
            Permission::MOVIES_RATE,
            Permission::RENTALS_CREATE,
            Permission::RENTALS_READ,
            Permission::RENTALS_CANCEL,
            Permission::USERS_READ,
            Permission::USERS_UPDATE,
        ]
        .into_iter()
        .map(Permission::new)
        .collect();
    }

    Vec::new()
}
