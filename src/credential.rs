//! Credential verification against stored Argon2id hashes.
//!
//! Stored credentials are PHC strings, so the algorithm tag, version, and
//! salt travel with the hash. Comparison goes through `argon2`'s
//! `verify_password`, which recomputes the hash and compares in constant
//! time; nothing here branches on match position.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use rand::rngs::OsRng;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// Fixed hash burned on paths with nothing real to verify, so an unknown
/// principal costs the same as a wrong secret.
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$AAAAAAAAAAAAAAAAAAAAAA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to hash secret")]
    Hash,
}

/// Verifies presented secrets against stored hashes. Stateless and
/// side-effect free.
#[derive(Clone, Copy, Debug, Default)]
pub struct CredentialVerifier;

impl CredentialVerifier {
    /// Compare a presented secret against a stored PHC hash.
    ///
    /// Fails closed: an unparseable or foreign-format hash verifies as
    /// `false` after burning a full verification.
    #[must_use]
    pub fn verify(&self, stored_phc: &str, presented: &SecretString) -> bool {
        let Ok(parsed) = PasswordHash::new(stored_phc) else {
            self.dummy_verify(presented);
            return false;
        };
        Argon2::default()
            .verify_password(presented.expose_secret().as_bytes(), &parsed)
            .is_ok()
    }

    /// Burn one verification against the fixed hash. Keeps missing-principal
    /// and corrupt-hash paths on the same latency as a real mismatch.
    pub fn dummy_verify(&self, presented: &SecretString) {
        if let Ok(parsed) = PasswordHash::new(DUMMY_HASH) {
            let _ = Argon2::default()
                .verify_password(presented.expose_secret().as_bytes(), &parsed);
        }
    }
}

/// Hash a secret into an Argon2id PHC string for storage.
///
/// Provisioning-side helper for hosting layers and tests; the core itself
/// never writes credential hashes.
///
/// # Errors
///
/// Returns an error if hashing fails.
pub fn hash_secret(secret: &SecretString) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.expose_secret().as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| CredentialError::Hash)
}
