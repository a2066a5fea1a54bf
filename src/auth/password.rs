//! Password hashing and verification using Argon2
//!
//! Uses argon2id variant with recommended parameters for password hashing.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::types::IdeaBankError;

/// Hash a password using Argon2id
///
/// Returns the PHC-formatted hash string and the salt it was derived with.
pub fn hash_password(password: &str) -> Result<(String, String), IdeaBankError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| IdeaBankError::Internal(format!("Failed to hash password: {e}")))?;

    Ok((hash, salt.as_str().to_string()))
}

/// Verify a password against a stored hash
///
/// Returns true if the password matches the hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, IdeaBankError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| IdeaBankError::Internal(format!("Invalid password hash format: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let password = "correct-horse-battery-staple";
        let (hash, salt) = hash_password(password).unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(hash.contains(&salt));

        assert!(verify_password(password, &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_different_salts() {
        let (hash1, salt1) = hash_password("same-password").unwrap();
        let (hash2, salt2) = hash_password("same-password").unwrap();

        assert_ne!(salt1, salt2);
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_invalid_hash_format() {
        assert!(verify_password("password", "not-a-valid-hash").is_err());
    }
}
