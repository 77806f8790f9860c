use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;

use crate::errors::InternalError;
use crate::errors::internal::AuditError;
use crate::types::db::audit_event;

/// Closed set of audited actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    View,
    Login,
    Logout,
    RoleChange,
    Suspend,
    Activate,
    Feature,
    Unfeature,
    Export,
    Approve,
    Reject,
    PasswordChange,
    SettingsChange,
    AllowlistAdd,
    AllowlistRemove,
}

impl AuditAction {
    pub const ALL: [AuditAction; 18] = [
        Self::Create,
        Self::Update,
        Self::Delete,
        Self::View,
        Self::Login,
        Self::Logout,
        Self::RoleChange,
        Self::Suspend,
        Self::Activate,
        Self::Feature,
        Self::Unfeature,
        Self::Export,
        Self::Approve,
        Self::Reject,
        Self::PasswordChange,
        Self::SettingsChange,
        Self::AllowlistAdd,
        Self::AllowlistRemove,
    ];

    /// Convert AuditAction to string representation for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::View => "VIEW",
            Self::Login => "LOGIN",
            Self::Logout => "LOGOUT",
            Self::RoleChange => "ROLE_CHANGE",
            Self::Suspend => "SUSPEND",
            Self::Activate => "ACTIVATE",
            Self::Feature => "FEATURE",
            Self::Unfeature => "UNFEATURE",
            Self::Export => "EXPORT",
            Self::Approve => "APPROVE",
            Self::Reject => "REJECT",
            Self::PasswordChange => "PASSWORD_CHANGE",
            Self::SettingsChange => "SETTINGS_CHANGE",
            Self::AllowlistAdd => "ALLOWLIST_ADD",
            Self::AllowlistRemove => "ALLOWLIST_REMOVE",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = InternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| InternalError::validation("action", format!("unknown action '{}'", s)))
    }
}

/// Closed set of audited entity types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    User,
    Recipe,
    MealPlan,
    Comment,
    Category,
    Tag,
    SystemSetting,
    IpAllowlist,
    AuditLog,
    Session,
}

impl EntityType {
    pub const ALL: [EntityType; 10] = [
        Self::User,
        Self::Recipe,
        Self::MealPlan,
        Self::Comment,
        Self::Category,
        Self::Tag,
        Self::SystemSetting,
        Self::IpAllowlist,
        Self::AuditLog,
        Self::Session,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Recipe => "Recipe",
            Self::MealPlan => "MealPlan",
            Self::Comment => "Comment",
            Self::Category => "Category",
            Self::Tag => "Tag",
            Self::SystemSetting => "SystemSetting",
            Self::IpAllowlist => "IpAllowlist",
            Self::AuditLog => "AuditLog",
            Self::Session => "Session",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = InternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|entity| entity.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                InternalError::validation("entity_type", format!("unknown entity type '{}'", s))
            })
    }
}

/// An audit event about to be recorded
///
/// Actor, client address, user agent and timestamp are not part of this
/// struct: the recorder takes them from the request context and the store
/// assigns the timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEvent {
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: Option<String>,
    pub changes: Option<Value>,
}

impl NewAuditEvent {
    pub fn new(action: AuditAction, entity_type: EntityType) -> Self {
        Self {
            action,
            entity_type,
            entity_id: None,
            changes: None,
        }
    }

    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Record a before/after pair as the changes payload
    pub fn with_changes(mut self, before: Option<Value>, after: Option<Value>) -> Self {
        self.changes = Some(json!({ "before": before, "after": after }));
        self
    }

    /// Record an arbitrary structured payload as the changes
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.changes = Some(payload);
        self
    }
}

/// A stored audit event, as returned by search, export and investigation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub id: i64,
    pub actor_user_id: String,
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: Option<String>,
    pub changes: Option<Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<audit_event::Model> for AuditEvent {
    type Error = InternalError;

    fn try_from(model: audit_event::Model) -> Result<Self, Self::Error> {
        let id = model.id;
        let corrupt = |reason: String| InternalError::Audit(AuditError::CorruptEvent { id, reason });

        let action = model
            .action
            .parse::<AuditAction>()
            .map_err(|e| corrupt(e.to_string()))?;
        let entity_type = model
            .entity_type
            .parse::<EntityType>()
            .map_err(|e| corrupt(e.to_string()))?;
        let changes = model
            .changes
            .as_deref()
            .map(serde_json::from_str::<Value>)
            .transpose()
            .map_err(|e| corrupt(format!("changes payload is not JSON: {}", e)))?;
        let created_at = DateTime::from_timestamp_millis(model.created_at)
            .ok_or_else(|| corrupt(format!("invalid created_at {}", model.created_at)))?;

        Ok(Self {
            id,
            actor_user_id: model.actor_user_id,
            action,
            entity_type,
            entity_id: model.entity_id,
            changes,
            ip_address: model.ip_address,
            user_agent: model.user_agent,
            created_at,
        })
    }
}
