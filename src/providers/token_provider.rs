use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::SecretManager;
use crate::errors::InternalError;
use crate::types::internal::auth::Claims;

/// Issues and validates the HS256 bearer tokens that carry admin identity
pub struct TokenProvider {
    secret_manager: Arc<SecretManager>,
    jwt_expiration_minutes: i64,
}

impl TokenProvider {
    pub fn new(secret_manager: Arc<SecretManager>) -> Self {
        Self {
            secret_manager,
            jwt_expiration_minutes: 15,
        }
    }

    /// Generate a JWT for `user_id` carrying `role`
    ///
    /// # Returns
    /// * `Result<(String, String), InternalError>` - Tuple of (encoded JWT, JWT ID) or an error
    pub fn generate_jwt(&self, user_id: &str, role: &str) -> Result<(String, String), InternalError> {
        let now = Utc::now().timestamp();
        let jti = Uuid::new_v4().to_string();

        let claims = Claims {
            sub: user_id.to_string(),
            role: role.to_string(),
            exp: now + (self.jwt_expiration_minutes * 60),
            iat: now,
            jti: Some(jti.clone()),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret_manager.jwt_secret().as_bytes()),
        )
        .map_err(|e| InternalError::crypto("jwt_generation", format!("Failed to generate JWT: {}", e)))?;

        Ok((token, jti))
    }

    /// Validate a JWT and return the claims
    pub fn validate_jwt(&self, token: &str) -> Result<Claims, InternalError> {
        let validation = Validation::new(Algorithm::HS256);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret_manager.jwt_secret().as_bytes()),
            &validation,
        )
        .map(|token_data| token_data.claims)
        .map_err(|e| InternalError::crypto("jwt_validation", e.to_string()))
    }
}

impl fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenProvider")
            .field("secret_manager", &"<redacted>")
            .field("jwt_expiration_minutes", &self.jwt_expiration_minutes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(secret: &str) -> TokenProvider {
        TokenProvider::new(Arc::new(SecretManager::from_values(
            secret,
            "test-pepper-for-unit-tests",
        )))
    }

    #[test]
    fn test_generated_token_validates() {
        let provider = provider("test-secret-key-minimum-32-characters-long");
        let (token, jti) = provider.generate_jwt("admin-1", "admin").unwrap();

        let claims = provider.validate_jwt(&token).unwrap();
        assert_eq!(claims.sub, "admin-1");
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.jti, Some(jti));
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let issuer = provider("test-secret-key-minimum-32-characters-long");
        let verifier = provider("a-completely-different-secret-of-32-chars");
        let (token, _) = issuer.generate_jwt("admin-1", "admin").unwrap();

        assert!(verifier.validate_jwt(&token).is_err());
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        let provider = provider("test-secret-key-minimum-32-characters-long");
        assert!(provider.validate_jwt("not.a.jwt").is_err());
    }
}
