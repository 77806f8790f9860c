use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
    sea_query::Expr,
};

use crate::errors::InternalError;
use crate::types::db::ip_allowlist::{self, Column, Entity as IpAllowlist};

/// IpAllowlistStore manages allowlist rows keyed by IP address
pub struct IpAllowlistStore {
    db: DatabaseConnection,
}

impl IpAllowlistStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Find the entry for `ip_address` if it is active and not expired at `now`
    pub async fn find_effective(
        &self,
        ip_address: &str,
        now: i64,
    ) -> Result<Option<ip_allowlist::Model>, InternalError> {
        IpAllowlist::find()
            .filter(Column::IpAddress.eq(ip_address))
            .filter(Column::IsActive.eq(true))
            .filter(
                Condition::any()
                    .add(Column::ExpiresAt.is_null())
                    .add(Column::ExpiresAt.gt(now)),
            )
            .one(&self.db)
            .await
            .map_err(|e| InternalError::database("find_allowlist_entry", e))
    }

    /// Find the entry for `ip_address` regardless of state
    pub async fn find(&self, ip_address: &str) -> Result<Option<ip_allowlist::Model>, InternalError> {
        IpAllowlist::find_by_id(ip_address.to_owned())
            .one(&self.db)
            .await
            .map_err(|e| InternalError::database("get_allowlist_entry", e))
    }

    /// Insert or reactivate the entry for `ip_address`
    ///
    /// An existing row keeps its `created_at`; everything else is overwritten.
    pub async fn upsert(
        &self,
        ip_address: &str,
        description: Option<String>,
        added_by: &str,
        expires_at: Option<i64>,
        now: i64,
    ) -> Result<ip_allowlist::Model, InternalError> {
        match self.find(ip_address).await? {
            Some(existing) => {
                let mut active_model: ip_allowlist::ActiveModel = existing.into();
                active_model.is_active = Set(true);
                active_model.description = Set(description);
                active_model.added_by = Set(added_by.to_owned());
                active_model.expires_at = Set(expires_at);
                active_model.updated_at = Set(now);

                active_model
                    .update(&self.db)
                    .await
                    .map_err(|e| InternalError::database("update_allowlist_entry", e))
            }
            None => {
                let entry = ip_allowlist::ActiveModel {
                    ip_address: Set(ip_address.to_owned()),
                    is_active: Set(true),
                    description: Set(description),
                    added_by: Set(added_by.to_owned()),
                    expires_at: Set(expires_at),
                    created_at: Set(now),
                    updated_at: Set(now),
                };

                entry
                    .insert(&self.db)
                    .await
                    .map_err(|e| InternalError::database("insert_allowlist_entry", e))
            }
        }
    }

    /// Soft-deactivate the entry for `ip_address`
    ///
    /// # Returns
    /// * `Ok(true)` - an active row was deactivated
    /// * `Ok(false)` - no active row existed
    pub async fn deactivate(&self, ip_address: &str, now: i64) -> Result<bool, InternalError> {
        let result = IpAllowlist::update_many()
            .col_expr(Column::IsActive, Expr::value(false))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::IpAddress.eq(ip_address))
            .filter(Column::IsActive.eq(true))
            .exec(&self.db)
            .await
            .map_err(|e| InternalError::database("deactivate_allowlist_entry", e))?;

        Ok(result.rows_affected > 0)
    }

    /// List entries ordered by IP address
    pub async fn list(&self, include_inactive: bool) -> Result<Vec<ip_allowlist::Model>, InternalError> {
        let mut query = IpAllowlist::find();
        if !include_inactive {
            query = query.filter(Column::IsActive.eq(true));
        }

        query
            .order_by_asc(Column::IpAddress)
            .all(&self.db)
            .await
            .map_err(|e| InternalError::database("list_allowlist_entries", e))
    }

    /// Flip active rows whose expiry has passed to inactive
    pub async fn deactivate_expired(&self, now: i64) -> Result<u64, InternalError> {
        let result = IpAllowlist::update_many()
            .col_expr(Column::IsActive, Expr::value(false))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::IsActive.eq(true))
            .filter(Column::ExpiresAt.is_not_null())
            .filter(Column::ExpiresAt.lte(now))
            .exec(&self.db)
            .await
            .map_err(|e| InternalError::database("deactivate_expired_allowlist_entries", e))?;

        Ok(result.rows_affected)
    }
}

impl std::fmt::Debug for IpAllowlistStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpAllowlistStore")
            .field("db", &"<connection>")
            .finish()
    }
}
