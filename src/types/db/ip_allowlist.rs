use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "ip_allowlist")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub ip_address: String,
    pub is_active: bool,
    pub description: Option<String>,
    pub added_by: String,
    /// Unix seconds; None means permanent
    pub expires_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Model {
    /// An entry counts only while active and not past its expiry
    pub fn is_effective(&self, now: i64) -> bool {
        self.is_active && self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
