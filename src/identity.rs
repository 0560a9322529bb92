// src/identity.rs - One-way password hashing
use crate::error::{ChirpyError, Result};

/// bcrypt work factor used for every stored password.
pub const HASH_COST: u32 = 10;

/// Hash a password with a fresh salt.
pub fn hash_password(password: &str) -> Result<String> {
    Ok(bcrypt::hash(password, HASH_COST)?)
}

/// Check `password` against a stored hash. A malformed hash counts as a mismatch.
pub fn verify_password(hash: &str, password: &str) -> Result<()> {
    match bcrypt::verify(password, hash) {
        Ok(true) => Ok(()),
        Ok(false) | Err(_) => Err(ChirpyError::unauthorized("passwords do not match")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_password("hunter2").unwrap();
        assert_ne!(hash, "hunter2");
        assert!(verify_password(&hash, "hunter2").is_ok());
        assert!(matches!(
            verify_password(&hash, "hunter3"),
            Err(ChirpyError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_is_unauthorized() {
        assert!(matches!(
            verify_password("not-a-bcrypt-hash", "pw"),
            Err(ChirpyError::Unauthorized(_))
        ));
    }
}
