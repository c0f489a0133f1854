//! Credential hashing for the email/password provider.
//!
//! Stored hashes are argon2id PHC strings. Both operations are CPU-bound and
//! run on tokio's blocking pool from request handlers.

use anyhow::Context;
use argon2::password_hash::{self, rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|phc| phc.to_string())
        .map_err(|e| anyhow::anyhow!("argon2 hashing failed: {e}"))
}

/// `Ok(false)` means the password is wrong. Anything else that goes wrong,
/// such as a stored hash that no longer parses, is an error.
pub fn verify_password(stored: &str, password: &str) -> anyhow::Result<bool> {
    let phc =
        PasswordHash::new(stored).map_err(|e| anyhow::anyhow!("stored hash unreadable: {e}"))?;
    match Argon2::default().verify_password(password.as_bytes(), &phc) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("argon2 verification failed: {e}")),
    }
}

pub async fn hash_password_blocking(password: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .context("hashing task panicked")?
}

pub async fn verify_password_blocking(stored: String, password: String) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&stored, &password))
        .await
        .context("verification task panicked")?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_argon2id_phc() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert_ne!(hash, hash_password("hunter22").unwrap());
    }

    #[test]
    fn wrong_password_is_false_not_error() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password(&hash, "hunter22").unwrap());
        assert!(!verify_password(&hash, "hunter23").unwrap());
    }

    #[test]
    fn corrupt_stored_hash_is_an_error() {
        assert!(verify_password("not-a-hash", "anything").is_err());
    }

    #[tokio::test]
    async fn blocking_variants_agree() {
        let hash = hash_password_blocking("analytical1".into()).await.unwrap();
        assert!(verify_password_blocking(hash, "analytical1".into()).await.unwrap());
    }
}
