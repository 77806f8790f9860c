use chrono::Utc;
use std::sync::Arc;

use crate::errors::InternalError;
use crate::providers::CryptoProvider;
use crate::stores::PasswordHistoryStore;

/// Number of previous passwords a user may not reuse
pub const HISTORY_DEPTH: u64 = 5;

/// Rejects reuse of a user's recent passwords
///
/// Storage faults propagate from both operations. Treating a failed lookup
/// as "not used" would permit reuse.
pub struct PasswordHistoryService {
    store: Arc<PasswordHistoryStore>,
    crypto: Arc<CryptoProvider>,
}

impl PasswordHistoryService {
    pub fn new(store: Arc<PasswordHistoryStore>, crypto: Arc<CryptoProvider>) -> Self {
        Self { store, crypto }
    }

    /// Whether `candidate` matches any of the user's recent password hashes
    ///
    /// A stored hash that cannot be parsed is skipped with a warning rather
    /// than failing the whole check.
    pub async fn was_recently_used(&self, user_id: &str, candidate: &str) -> Result<bool, InternalError> {
        let hashes = self.store.recent_hashes(user_id, HISTORY_DEPTH).await?;

        for stored_hash in &hashes {
            match self.crypto.verify_password(candidate, stored_hash) {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(user_id, "Skipping unreadable password history entry: {}", e);
                }
            }
        }

        Ok(false)
    }

    /// Hash `password` and append it to the user's history, pruning beyond the window
    pub async fn record(&self, user_id: &str, password: &str) -> Result<(), InternalError> {
        let password_hash = self.crypto.hash_password(password)?;
        let pruned = self
            .store
            .insert_and_prune(user_id, password_hash, Utc::now().timestamp_millis(), HISTORY_DEPTH)
            .await?;

        tracing::debug!(user_id, pruned, "Password history updated");
        Ok(())
    }
}

impl std::fmt::Debug for PasswordHistoryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHistoryService")
            .field("depth", &HISTORY_DEPTH)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::utils::{setup_test_auth_db, setup_unmigrated_db, test_crypto_provider};

    async fn setup() -> (Arc<PasswordHistoryStore>, PasswordHistoryService) {
        let store = Arc::new(PasswordHistoryStore::new(setup_test_auth_db().await));
        let service = PasswordHistoryService::new(store.clone(), test_crypto_provider());
        (store, service)
    }

    #[tokio::test]
    async fn test_recorded_password_is_recently_used() {
        let (_store, service) = setup().await;
        service.record("user-1", "P@ss1").await.unwrap();

        assert!(service.was_recently_used("user-1", "P@ss1").await.unwrap());
        assert!(!service.was_recently_used("user-1", "P@ss2").await.unwrap());
        assert!(!service.was_recently_used("user-2", "P@ss1").await.unwrap());
    }

    #[tokio::test]
    async fn test_history_window_is_five_deep() {
        let (store, service) = setup().await;
        service.record("user-1", "P@ss1").await.unwrap();
        for n in 2..=6 {
            service.record("user-1", &format!("P@ss{}", n)).await.unwrap();
        }

        assert!(!service.was_recently_used("user-1", "P@ss1").await.unwrap());
        for n in 2..=6 {
            assert!(service.was_recently_used("user-1", &format!("P@ss{}", n)).await.unwrap());
        }
        assert_eq!(store.count_for_user("user-1").await.unwrap(), HISTORY_DEPTH);
    }

    #[tokio::test]
    async fn test_unreadable_hash_is_skipped() {
        let (store, service) = setup().await;
        store
            .insert_and_prune("user-1", "garbage".to_string(), 1, HISTORY_DEPTH)
            .await
            .unwrap();
        service.record("user-1", "P@ss1").await.unwrap();

        assert!(service.was_recently_used("user-1", "P@ss1").await.unwrap());
        assert!(!service.was_recently_used("user-1", "P@ss9").await.unwrap());
    }

    #[tokio::test]
    async fn test_storage_faults_propagate() {
        let store = Arc::new(PasswordHistoryStore::new(setup_unmigrated_db().await));
        let service = PasswordHistoryService::new(store, test_crypto_provider());

        assert!(service.was_recently_used("user-1", "P@ss1").await.is_err());
        assert!(service.record("user-1", "P@ss1").await.is_err());
    }
}
