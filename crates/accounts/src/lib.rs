//! `movierent-accounts`: user accounts, credentials and access policy.
//!
//! Decoupled from HTTP and storage: the API crate turns bearer tokens into a
//! [`Principal`] and asks [`authorize`] before touching anything.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod password;
pub mod permissions;
pub mod roles;
pub mod user;

pub use authorize::{AuthzError, Principal, authorize, authorize_owner_or};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtIssuer, Hs256JwtValidator, JwtValidator, TokenError};
pub use password::{MIN_PASSWORD_LEN, PasswordError, hash_password, verify_password};
pub use permissions::{Permission, permissions_for_roles};
pub use roles::Role;
pub use user::{RegisterUser, UpdateProfile, User, normalize_email};
