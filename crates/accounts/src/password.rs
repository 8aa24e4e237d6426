//! Password policy and hashing (bcrypt).

use thiserror::Error;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("password must be at least {MIN_PASSWORD_LEN} characters")]
    TooShort,

    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Hash a plaintext password after checking the length policy.
///
/// `cost` is the bcrypt work factor; production uses `bcrypt::DEFAULT_COST`,
/// tests pass `4` to stay fast.
pub fn hash_password(plain: &str, cost: u32) -> Result<String, PasswordError> {
    if plain.chars().count() < MIN_PASSWORD_LEN {
        return Err(PasswordError::TooShort);
    }
    bcrypt::hash(plain, cost).map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Constant-time check of a plaintext password against a stored hash.
///
/// A malformed stored hash counts as a mismatch.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    bcrypt::verify(plain, hash).unwrap_or(false)
}
