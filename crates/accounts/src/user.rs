//! User accounts.
//!
//! A user registers with an email and a password, and can later update the
//! contact fields of their profile. Email, role and password hash are never
//! changed by a profile update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use movierent_core::{DomainError, DomainResult, UserId, entity::Entity};

use crate::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    /// bcrypt hash; never serialized out of the API layer.
    pub password_hash: String,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration input. The password is hashed by the caller before the
/// account is built so this crate never holds plaintext longer than needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterUser {
    pub email: String,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProfile {
    pub full_name: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

impl User {
    pub fn register(cmd: RegisterUser, password_hash: String, now: DateTime<Utc>) -> DomainResult<Self> {
        let email = normalize_email(&cmd.email)?;
        let full_name = require_name(&cmd.full_name)?;

        Ok(Self {
            id: UserId::new(),
            email,
            password_hash,
            full_name,
            phone_number: blank_to_none(cmd.phone_number),
            address: blank_to_none(cmd.address),
            role: Role::user(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_profile(&mut self, cmd: UpdateProfile, now: DateTime<Utc>) -> DomainResult<()> {
        self.full_name = require_name(&cmd.full_name)?;
        self.phone_number = blank_to_none(cmd.phone_number);
        self.address = blank_to_none(cmd.address);
        self.updated_at = now;
        Ok(())
    }

    /// Builder used by seeding and tests to create administrators.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Trim + lowercase, and require a plausible `local@domain` shape.
pub fn normalize_email(raw: &str) -> DomainResult<String> {
    let email = raw.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => Ok(email),
        _ => Err(DomainError::validation("email must be a valid address")),
    }
}

fn require_name(raw: &str) -> DomainResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DomainError::validation("full name cannot be empty"));
    }
    Ok(name.to_string())
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
