use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::errors::InternalError;
use crate::errors::internal::DatabaseError;
use crate::types::db::password_history::{self, Column, Entity as PasswordHistory};

/// PasswordHistoryStore keeps a bounded window of past password hashes per user
pub struct PasswordHistoryStore {
    db: DatabaseConnection,
}

impl PasswordHistoryStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Most recent `limit` hashes for `user_id`, newest first
    pub async fn recent_hashes(&self, user_id: &str, limit: u64) -> Result<Vec<String>, InternalError> {
        Self::newest_first(user_id)
            .select_only()
            .column(Column::PasswordHash)
            .limit(limit)
            .into_tuple::<String>()
            .all(&self.db)
            .await
            .map_err(|e| InternalError::database("get_recent_password_hashes", e))
    }

    /// Append a hash and drop everything past the newest `keep` entries
    ///
    /// Insert and prune run in one transaction so the per-user count never
    /// exceeds `keep` once this returns.
    ///
    /// # Returns
    /// * `Ok(u64)` - number of pruned rows
    pub async fn insert_and_prune(
        &self,
        user_id: &str,
        password_hash: String,
        created_at: i64,
        keep: u64,
    ) -> Result<u64, InternalError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|source| DatabaseError::TransactionBegin { source })?;

        let entry = password_history::ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            user_id: Set(user_id.to_owned()),
            password_hash: Set(password_hash),
            created_at: Set(created_at),
        };
        entry
            .insert(&txn)
            .await
            .map_err(|e| InternalError::database("insert_password_history", e))?;

        let pruned = Self::prune(&txn, user_id, keep).await?;

        txn.commit()
            .await
            .map_err(|source| DatabaseError::TransactionCommit { source })?;

        Ok(pruned)
    }

    /// Number of stored entries for `user_id`
    pub async fn count_for_user(&self, user_id: &str) -> Result<u64, InternalError> {
        use sea_orm::PaginatorTrait;

        PasswordHistory::find()
            .filter(Column::UserId.eq(user_id))
            .count(&self.db)
            .await
            .map_err(|e| InternalError::database("count_password_history", e))
    }

    async fn prune(conn: &impl ConnectionTrait, user_id: &str, keep: u64) -> Result<u64, InternalError> {
        let stale_ids: Vec<i64> = Self::newest_first(user_id)
            .select_only()
            .column(Column::Id)
            .into_tuple::<i64>()
            .all(conn)
            .await
            .map_err(|e| InternalError::database("find_stale_password_history", e))?
            .into_iter()
            .skip(keep as usize)
            .collect();

        if stale_ids.is_empty() {
            return Ok(0);
        }

        let result = PasswordHistory::delete_many()
            .filter(Column::Id.is_in(stale_ids))
            .exec(conn)
            .await
            .map_err(|e| InternalError::database("prune_password_history", e))?;

        Ok(result.rows_affected)
    }

    fn newest_first(user_id: &str) -> sea_orm::Select<PasswordHistory> {
        PasswordHistory::find()
            .filter(Column::UserId.eq(user_id))
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
    }
}

impl std::fmt::Debug for PasswordHistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHistoryStore")
            .field("db", &"<connection>")
            .finish()
    }
}
