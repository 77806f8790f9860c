use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::{self, SaltString},
};
use base64::{Engine as _, engine::general_purpose};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::fmt;

use crate::errors::InternalError;

/// Cryptographic operations provider
///
/// Peppered Argon2id hashing for passwords, random opaque tokens and
/// SHA-256 digests for storing those tokens at rest.
pub struct CryptoProvider {
    password_pepper: String,
}

impl CryptoProvider {
    /// Create a new CryptoProvider
    ///
    /// # Arguments
    /// * `password_pepper` - Secret mixed into every Argon2 hash (from SecretManager)
    pub fn new(password_pepper: impl Into<String>) -> Self {
        Self {
            password_pepper: password_pepper.into(),
        }
    }

    fn argon2(&self) -> Result<Argon2<'_>, InternalError> {
        Argon2::new_with_secret(
            self.password_pepper.as_bytes(),
            Algorithm::Argon2id,
            Version::V0x13,
            Params::default(),
        )
        .map_err(|e| InternalError::crypto("argon2_init", e.to_string()))
    }

    /// Hash a password with Argon2id and a random salt
    ///
    /// # Returns
    /// PHC-formatted hash string
    pub fn hash_password(&self, password: &str) -> Result<String, InternalError> {
        let salt = SaltString::generate(&mut rand_core::OsRng);

        self.argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| InternalError::crypto("password_hash", e.to_string()))
    }

    /// Verify a password against a stored PHC hash
    ///
    /// # Returns
    /// * `Ok(true)` / `Ok(false)` - match / mismatch
    /// * `Err(InternalError)` - the stored hash is unreadable
    pub fn verify_password(&self, password: &str, stored_hash: &str) -> Result<bool, InternalError> {
        let parsed = PasswordHash::new(stored_hash)
            .map_err(|e| InternalError::crypto("password_hash_parse", e.to_string()))?;

        match self.argon2()?.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(InternalError::crypto("password_verify", e.to_string())),
        }
    }

    /// Generate a 256-bit random token, URL-safe base64 without padding
    pub fn generate_token(&self) -> String {
        let mut rng = rand::rng();
        let random_bytes: [u8; 32] = rng.random();
        general_purpose::URL_SAFE_NO_PAD.encode(random_bytes)
    }

    /// SHA-256 of `value` as lowercase hex
    pub fn sha256_hex(&self, value: &str) -> String {
        format!("{:x}", Sha256::digest(value.as_bytes()))
    }
}

impl fmt::Debug for CryptoProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoProvider")
            .field("password_pepper", &"<redacted>")
            .finish()
    }
}
