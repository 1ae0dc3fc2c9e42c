//! Argon2id credential hashing.
//!
//! Hashing is CPU and memory intensive by design, so the async variants run
//! on the blocking thread pool instead of the runtime workers.

use anyhow::{Context, Result};
use argon2::{
    ARGON2ID_IDENT, Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tokio::task;

use crate::config::SecurityConfig;

#[derive(Debug, Clone)]
pub struct CredentialHasher {
    params: Params,
}

impl CredentialHasher {
    pub fn new(config: &SecurityConfig) -> Result<Self> {
        let params = Params::new(
            config.argon2_memory_cost_kib,
            config.argon2_time_cost,
            config.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Produces a salted PHC string. Two calls with the same input never
    /// return the same digest.
    pub fn hash(&self, plaintext: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

        Ok(hash.to_string())
    }

    /// A malformed digest is a failed verification, never an error.
    #[must_use]
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            return false;
        };

        // Params are taken from the digest itself, so hashes produced with
        // older settings still verify.
        self.argon2()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }

    /// Whether `digest` was produced with settings other than the configured
    /// ones. Malformed digests report `false`: there is nothing to migrate.
    #[must_use]
    pub fn needs_rehash(&self, digest: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            return false;
        };

        if parsed.algorithm != ARGON2ID_IDENT {
            return true;
        }

        Params::try_from(&parsed).map_or(true, |stored| {
            stored.m_cost() != self.params.m_cost()
                || stored.t_cost() != self.params.t_cost()
                || stored.p_cost() != self.params.p_cost()
        })
    }

    pub async fn hash_blocking(&self, plaintext: &str) -> Result<String> {
        let hasher = self.clone();
        let plaintext = plaintext.to_string();

        task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .context("Password hashing task panicked")?
    }

    pub async fn verify_blocking(&self, plaintext: &str, digest: &str) -> Result<bool> {
        let hasher = self.clone();
        let plaintext = plaintext.to_string();
        let digest = digest.to_string();

        task::spawn_blocking(move || hasher.verify(&plaintext, &digest))
            .await
            .context("Password verification task panicked")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_hasher(time_cost: u32) -> CredentialHasher {
        let config = SecurityConfig {
            argon2_memory_cost_kib: 64,
            argon2_time_cost: time_cost,
            argon2_parallelism: 1,
            ..SecurityConfig::default()
        };
        CredentialHasher::new(&config).unwrap()
    }

    #[test]
    fn hash_then_verify() {
        let hasher = fast_hasher(1);
        let digest = hasher.hash("secret1").unwrap();

        assert!(digest.starts_with("$argon2id$"));
        assert!(hasher.verify("secret1", &digest));
        assert!(!hasher.verify("secret2", &digest));
    }

    #[test]
    fn hashes_are_salted() {
        let hasher = fast_hasher(1);
        let a = hasher.hash("secret1").unwrap();
        let b = hasher.hash("secret1").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_digest_fails_verification() {
        let hasher = fast_hasher(1);
        assert!(!hasher.verify("secret1", ""));
        assert!(!hasher.verify("secret1", "not-a-phc-string"));
        assert!(!hasher.verify("secret1", "$argon2id$v=19$garbage"));
    }

    #[test]
    fn detects_outdated_params() {
        let old = fast_hasher(1);
        let current = fast_hasher(2);
        let digest = old.hash("secret1").unwrap();

        assert!(current.needs_rehash(&digest));
        assert!(!old.needs_rehash(&digest));
        assert!(!current.needs_rehash("garbage"));
        // Older digests still verify under the new settings.
        assert!(current.verify("secret1", &digest));
    }

    #[test]
    fn rejects_invalid_params() {
        let config = SecurityConfig {
            argon2_time_cost: 0,
            ..SecurityConfig::default()
        };
        assert!(CredentialHasher::new(&config).is_err());
    }

    #[tokio::test]
    async fn blocking_variants() {
        let hasher = fast_hasher(1);
        let digest = hasher.hash_blocking("secret1").await.unwrap();
        assert!(hasher.verify_blocking("secret1", &digest).await.unwrap());
        assert!(!hasher.verify_blocking("nope", &digest).await.unwrap());
    }
}
