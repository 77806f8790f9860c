use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::errors::InternalError;
use crate::types::db::csrf_token::{self, Column, Entity as CsrfToken};

/// CsrfTokenStore persists hashed CSRF tokens
pub struct CsrfTokenStore {
    db: DatabaseConnection,
}

impl CsrfTokenStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Store a freshly issued token hash
    pub async fn insert_token(
        &self,
        token_hash: &str,
        user_id: &str,
        created_at: i64,
        expires_at: i64,
    ) -> Result<(), InternalError> {
        let token = csrf_token::ActiveModel {
            token_hash: Set(token_hash.to_owned()),
            user_id: Set(user_id.to_owned()),
            expires_at: Set(expires_at),
            created_at: Set(created_at),
        };

        token
            .insert(&self.db)
            .await
            .map_err(|e| InternalError::database("insert_csrf_token", e))?;

        Ok(())
    }

    /// Consume a token in one statement
    ///
    /// The validity check (owner, expiry) and the removal are the same
    /// conditional DELETE, so two concurrent callers can never both observe
    /// the token as live. A missing, expired or foreign token deletes nothing.
    ///
    /// # Returns
    /// * `Ok(true)` - the token was live, belonged to `user_id` and is now gone
    /// * `Ok(false)` - nothing matched; stored state is unchanged
    pub async fn consume_token(
        &self,
        token_hash: &str,
        user_id: &str,
        now: i64,
    ) -> Result<bool, InternalError> {
        let result = CsrfToken::delete_many()
            .filter(Column::TokenHash.eq(token_hash))
            .filter(Column::UserId.eq(user_id))
            .filter(Column::ExpiresAt.gt(now))
            .exec(&self.db)
            .await
            .map_err(|e| InternalError::database("consume_csrf_token", e))?;

        Ok(result.rows_affected == 1)
    }

    /// Look up a token without consuming it
    pub async fn find_token(&self, token_hash: &str) -> Result<Option<csrf_token::Model>, InternalError> {
        CsrfToken::find_by_id(token_hash.to_owned())
            .one(&self.db)
            .await
            .map_err(|e| InternalError::database("find_csrf_token", e))
    }

    /// Delete every token whose expiry is at or before `now`
    pub async fn delete_expired(&self, now: i64) -> Result<u64, InternalError> {
        let result = CsrfToken::delete_many()
            .filter(Column::ExpiresAt.lte(now))
            .exec(&self.db)
            .await
            .map_err(|e| InternalError::database("delete_expired_csrf_tokens", e))?;

        Ok(result.rows_affected)
    }
}

impl std::fmt::Debug for CsrfTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfTokenStore")
            .field("db", &"<connection>")
            .finish()
    }
}
