use chrono::{DateTime, Utc};
use poem_openapi::Object;

use crate::types::db::ip_allowlist;

/// Request to allow an IP address into the admin area
#[derive(Object, Debug)]
pub struct AddAllowlistRequest {
    /// IPv4 or IPv6 address
    pub ip_address: String,

    pub description: Option<String>,

    /// Omit for a permanent entry
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Object, Debug)]
pub struct AllowlistEntryDto {
    pub ip_address: String,
    pub is_active: bool,
    pub description: Option<String>,
    pub added_by: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ip_allowlist::Model> for AllowlistEntryDto {
    fn from(model: ip_allowlist::Model) -> Self {
        let at = |secs: i64| DateTime::from_timestamp(secs, 0).unwrap_or_default();
        Self {
            expires_at: model.expires_at.map(at),
            created_at: at(model.created_at),
            updated_at: at(model.updated_at),
            ip_address: model.ip_address,
            is_active: model.is_active,
            description: model.description,
            added_by: model.added_by,
        }
    }
}

#[derive(Object, Debug)]
pub struct AllowlistResponse {
    pub entries: Vec<AllowlistEntryDto>,
}

/// Response after deactivating an entry
#[derive(Object, Debug)]
pub struct RemoveAllowlistResponse {
    pub ip_address: String,
    pub removed: bool,
}
