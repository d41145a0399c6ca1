//! Password hashing
//!
//! Argon2id PHC strings via the argon2 crate. This module only wires the
//! library; it contains no cryptography of its own.

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};

use crate::error::AppError;

/// Hash a password with a fresh random salt
///
/// # Returns
/// PHC-formatted hash string for storage
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?;
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?;
    let argon2 = Argon2::default();
    let phc = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(phc)
}

/// Verify a password against a stored PHC string
///
/// Malformed stored hashes verify as false rather than erroring.
pub fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        let argon2 = Argon2::default();
        argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_roundtrip() {
        let hash = hash_password("pw123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "pw123"));
    }

    #[test]
    fn wrong_password_does_not_verify() {
        let hash = hash_password("pw123").unwrap();
        assert!(!verify_password(&hash, "pw124"));
    }

    #[test]
    fn same_password_hashes_differently() {
        let first = hash_password("pw123").unwrap();
        let second = hash_password("pw123").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn malformed_hash_verifies_false() {
        assert!(!verify_password("not-a-phc-string", "pw123"));
    }
}
