use movierent_accounts::{Principal, Role};
use movierent_core::UserId;

/// Principal context for a request (authenticated identity + roles).
///
/// Inserted by [`crate::middleware::auth_middleware`] from verified token
/// claims; never built from request bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    user_id: UserId,
    email: String,
    roles: Vec<Role>,
}

impl PrincipalContext {
    pub fn new(user_id: UserId, email: String, roles: Vec<Role>) -> Self {
        Self { user_id, email, roles }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// Resolve the principal (roles → permissions) for authorization checks.
    pub fn principal(&self) -> Principal {
        Principal::from_roles(self.user_id, self.roles.clone())
    }
}
