//! Password hashing collaborator.
//!
//! Digests are Argon2id PHC strings (`$argon2id$v=19$m=...$salt$hash`), so the salt and the
//! work factor travel with the digest and verification needs no extra state.

use crate::config::HashCost;
use crate::{PatientError, PatientResult};
use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};

/// One-way, salted password hashing with a verification counterpart.
pub trait CredentialHasher: Send + Sync {
    /// Hash `plaintext` with a fresh random salt.
    fn hash(&self, plaintext: &str) -> PatientResult<String>;

    /// Returns `Ok(false)` for a mismatch; `Err` only for a digest that cannot be parsed.
    fn verify(&self, plaintext: &str, digest: &str) -> PatientResult<bool>;
}

/// Argon2id hasher with a fixed work factor.
#[derive(Clone, Debug)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    /// # Errors
    ///
    /// Returns `PatientError::InvalidInput` if Argon2 rejects the cost parameters.
    pub fn new(cost: HashCost) -> PatientResult<Self> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|e| PatientError::InvalidInput(format!("invalid Argon2 params: {e}")))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> PatientResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| PatientError::PasswordHash(e.to_string()))?;
        Ok(hash.to_string())
    }

    fn verify(&self, plaintext: &str, digest: &str) -> PatientResult<bool> {
        let parsed =
            PasswordHash::new(digest).map_err(|e| PatientError::PasswordHash(e.to_string()))?;

        // Parameters come from the digest, so older digests still verify after a cost change.
        match self.argon2().verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PatientError::PasswordHash(e.to_string())),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Cheapest cost Argon2 accepts; keeps the test suite fast.
    pub(crate) fn fast_hasher() -> Argon2Hasher {
        Argon2Hasher::new(HashCost {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        })
        .expect("minimal Argon2 params should be accepted")
    }

    #[test]
    fn test_hash_then_verify() {
        let hasher = fast_hasher();
        let digest = hasher.hash("correct horse").expect("hash should succeed");

        assert!(digest.starts_with("$argon2id$"));
        assert!(hasher.verify("correct horse", &digest).expect("verify should succeed"));
        assert!(!hasher.verify("wrong horse", &digest).expect("verify should succeed"));
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        let hasher = fast_hasher();
        let a = hasher.hash("pw").expect("hash should succeed");
        let b = hasher.hash("pw").expect("hash should succeed");
        assert_ne!(a, b);
    }

    #[test]
    fn test_digest_from_other_cost_still_verifies() {
        let digest = fast_hasher().hash("pw").expect("hash should succeed");
        let stronger = Argon2Hasher::new(HashCost {
            memory_kib: 64,
            iterations: 2,
            parallelism: 1,
        })
        .expect("params should be accepted");

        assert!(stronger.verify("pw", &digest).expect("verify should succeed"));
    }

    #[test]
    fn test_malformed_digest_is_an_error() {
        let err = fast_hasher()
            .verify("pw", "plaintext-from-legacy-row")
            .expect_err("malformed digest should fail");
        assert!(matches!(err, PatientError::PasswordHash(_)));
    }
}
