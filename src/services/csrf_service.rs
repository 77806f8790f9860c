use chrono::{DateTime, Duration, Utc};
use poem::http::Method;
use std::sync::Arc;

use crate::errors::InternalError;
use crate::providers::CryptoProvider;
use crate::stores::CsrfTokenStore;

/// A CSRF token handed to the client
#[derive(Debug, Clone)]
pub struct IssuedCsrfToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// Seconds until expiry
    pub expires_in: i64,
}

/// Issues and single-use-verifies anti-forgery tokens
///
/// Only the SHA-256 of a token is persisted. Verification consumes the
/// token atomically, so a replayed token is always rejected.
pub struct CsrfService {
    store: Arc<CsrfTokenStore>,
    crypto: Arc<CryptoProvider>,
    ttl: Duration,
}

impl CsrfService {
    pub fn new(store: Arc<CsrfTokenStore>, crypto: Arc<CryptoProvider>) -> Self {
        Self {
            store,
            crypto,
            ttl: Duration::hours(1),
        }
    }

    /// Whether requests with this method must carry a valid token
    pub fn requires_verification(method: &Method) -> bool {
        [Method::POST, Method::PUT, Method::PATCH, Method::DELETE].contains(method)
    }

    /// Issue a new token bound to `user_id`
    ///
    /// # Errors
    /// Returns `InternalError` when the token cannot be stored; the caller
    /// must not hand out a token that would never verify.
    pub async fn generate(&self, user_id: &str) -> Result<IssuedCsrfToken, InternalError> {
        let token = self.crypto.generate_token();
        let now = Utc::now();
        let expires_at = now + self.ttl;

        self.store
            .insert_token(
                &self.crypto.sha256_hex(&token),
                user_id,
                now.timestamp(),
                expires_at.timestamp(),
            )
            .await?;

        tracing::debug!(user_id, "CSRF token issued");

        Ok(IssuedCsrfToken {
            token,
            expires_at,
            expires_in: self.ttl.num_seconds(),
        })
    }

    /// Check and consume `token` for `user_id`
    ///
    /// Returns true exactly once per issued token, and only for its owner
    /// before expiry. Storage faults deny.
    pub async fn verify(&self, token: &str, user_id: &str) -> bool {
        if token.is_empty() {
            return false;
        }

        let token_hash = self.crypto.sha256_hex(token);
        match self
            .store
            .consume_token(&token_hash, user_id, Utc::now().timestamp())
            .await
        {
            Ok(true) => true,
            Ok(false) => {
                tracing::warn!(user_id, "CSRF token rejected: missing, expired, spent or foreign");
                false
            }
            Err(e) => {
                tracing::error!(user_id, "CSRF verification failed closed: {}", e);
                false
            }
        }
    }

    /// Delete expired tokens
    ///
    /// Housekeeping only: failures are logged and reported as zero removals.
    pub async fn cleanup_expired(&self) -> u64 {
        match self.store.delete_expired(Utc::now().timestamp()).await {
            Ok(removed) => {
                tracing::info!(removed, "Expired CSRF tokens removed");
                removed
            }
            Err(e) => {
                tracing::error!("CSRF token cleanup failed: {}", e);
                0
            }
        }
    }
}

impl std::fmt::Debug for CsrfService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfService")
            .field("ttl_seconds", &self.ttl.num_seconds())
            .finish()
    }
}
