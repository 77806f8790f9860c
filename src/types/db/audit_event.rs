use sea_orm::entity::prelude::*;

/// SeaORM entity for audit_events table
///
/// Rows are written once by the audit store and never updated or deleted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "audit_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(indexed)]
    pub actor_user_id: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    /// JSON-encoded before/after payload
    pub changes: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    /// Unix milliseconds, assigned by the store
    #[sea_orm(indexed)]
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
