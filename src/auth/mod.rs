//! Authentication for Idea Bank
//!
//! Account passwords are stored as Argon2id hashes. A successful login is
//! answered with an HS256 JWT bound to the display name; gated handlers check
//! that token through the [`AuthorizationGate`] before touching any data.

pub mod gate;
pub mod jwt;
pub mod password;

pub use gate::AuthorizationGate;
pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenValidationResult};
pub use password::{hash_password, verify_password};
