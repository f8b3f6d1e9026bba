//! Authentication and authorization primitives.
//!
//! - [`password`]: argon2 hashing for stored credentials
//! - [`token`]: HS256 JWT bearer tokens
//! - [`guard`]: checks run by handlers once the caller is known

pub mod error;
pub mod guard;
pub mod password;
pub mod token;

pub use error::AuthError;
pub use guard::{require_admin, require_owner, require_owner_or_admin, Principal};
pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenSigner};
