use chrono::{DateTime, Utc};
use serde_json::json;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;

use crate::audit::AuditRecorder;
use crate::errors::InternalError;
use crate::stores::IpAllowlistStore;
use crate::types::db::ip_allowlist;
use crate::types::internal::audit::{AuditAction, EntityType, NewAuditEvent};
use crate::types::internal::context::RequestContext;

/// What the allowlist guard answers when the store cannot be consulted
///
/// `AllowOnError` is the default: a broken allowlist table must not lock
/// every administrator out. Deployments that prefer strictness over
/// availability choose `DenyOnError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    #[default]
    AllowOnError,
    DenyOnError,
}

impl ErrorPolicy {
    fn on_error(&self) -> bool {
        matches!(self, Self::AllowOnError)
    }
}

impl FromStr for ErrorPolicy {
    type Err = InternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow" | "allow_on_error" | "open" => Ok(Self::AllowOnError),
            "deny" | "deny_on_error" | "closed" => Ok(Self::DenyOnError),
            other => Err(InternalError::validation(
                "ALLOWLIST_ON_ERROR",
                format!("expected 'allow' or 'deny', got '{}'", other),
            )),
        }
    }
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllowOnError => f.write_str("allow"),
            Self::DenyOnError => f.write_str("deny"),
        }
    }
}

/// Loopback and private ranges used by local development and internal networks
pub fn is_dev_address(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_loopback() || v4.is_private(),
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return mapped.is_loopback() || mapped.is_private();
            }
            // fc00::/7 unique local
            v6.is_loopback() || (v6.segments()[0] & 0xfe00) == 0xfc00
        }
    }
}

/// Gates admin functionality by source IP
pub struct IpAllowlistService {
    store: Arc<IpAllowlistStore>,
    audit_recorder: Arc<AuditRecorder>,
    policy: ErrorPolicy,
    trust_dev_ranges: bool,
}

impl IpAllowlistService {
    pub fn new(
        store: Arc<IpAllowlistStore>,
        audit_recorder: Arc<AuditRecorder>,
        policy: ErrorPolicy,
    ) -> Self {
        Self {
            store,
            audit_recorder,
            policy,
            trust_dev_ranges: true,
        }
    }

    /// Whether loopback/private sources bypass the table lookup
    pub fn with_dev_ranges_trusted(mut self, trusted: bool) -> Self {
        self.trust_dev_ranges = trusted;
        self
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// Whether `ip` may reach admin functionality
    ///
    /// Expired entries count as absent even while still flagged active.
    /// Lookup failures resolve according to the configured `ErrorPolicy`.
    pub async fn is_allowed(&self, ip: IpAddr) -> bool {
        let ip = ip.to_canonical();
        if self.trust_dev_ranges && is_dev_address(&ip) {
            return true;
        }

        match self
            .store
            .find_effective(&ip.to_string(), Utc::now().timestamp())
            .await
        {
            Ok(entry) => entry.is_some(),
            Err(e) => {
                let allowed = self.policy.on_error();
                tracing::error!(
                    %ip,
                    policy = %self.policy,
                    allowed,
                    "Allowlist lookup failed, applying error policy: {}",
                    e
                );
                allowed
            }
        }
    }

    /// Add or reactivate an entry
    ///
    /// # Errors
    /// * Validation when `expires_at` is not in the future
    /// * Database errors from the upsert
    pub async fn add(
        &self,
        ctx: &RequestContext,
        ip: IpAddr,
        description: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<ip_allowlist::Model, InternalError> {
        let now = Utc::now();
        if let Some(expires_at) = expires_at {
            if expires_at <= now {
                return Err(InternalError::validation("expires_at", "must be in the future"));
            }
        }

        let ip_address = ip.to_canonical().to_string();
        let before = self.store.find(&ip_address).await?;
        let entry = self
            .store
            .upsert(
                &ip_address,
                description,
                &ctx.actor_id,
                expires_at.map(|t| t.timestamp()),
                now.timestamp(),
            )
            .await?;

        tracing::info!(ip = %ip_address, actor = %ctx.actor_id, "Allowlist entry added");

        self.audit_recorder
            .record(
                ctx,
                NewAuditEvent::new(AuditAction::AllowlistAdd, EntityType::IpAllowlist)
                    .with_entity_id(ip_address)
                    .with_changes(before.as_ref().map(entry_snapshot), Some(entry_snapshot(&entry))),
            )
            .await;

        Ok(entry)
    }

    /// Soft-deactivate the entry for `ip`
    ///
    /// # Returns
    /// * `Ok(false)` - there was no active entry to remove
    pub async fn remove(&self, ctx: &RequestContext, ip: IpAddr) -> Result<bool, InternalError> {
        let ip_address = ip.to_canonical().to_string();
        let removed = self
            .store
            .deactivate(&ip_address, Utc::now().timestamp())
            .await?;

        if removed {
            tracing::info!(ip = %ip_address, actor = %ctx.actor_id, "Allowlist entry deactivated");
            self.audit_recorder
                .record(
                    ctx,
                    NewAuditEvent::new(AuditAction::AllowlistRemove, EntityType::IpAllowlist)
                        .with_entity_id(ip_address)
                        .with_changes(Some(json!({"is_active": true})), Some(json!({"is_active": false}))),
                )
                .await;
        }

        Ok(removed)
    }

    pub async fn list(&self, include_inactive: bool) -> Result<Vec<ip_allowlist::Model>, InternalError> {
        self.store.list(include_inactive).await
    }

    /// Flip expired entries to inactive
    ///
    /// Housekeeping only: `is_allowed` already ignores expired entries, so a
    /// failed or skipped sweep changes nothing observable.
    pub async fn cleanup_expired(&self) -> u64 {
        match self.store.deactivate_expired(Utc::now().timestamp()).await {
            Ok(flipped) => {
                tracing::info!(flipped, "Expired allowlist entries deactivated");
                flipped
            }
            Err(e) => {
                tracing::error!("Allowlist cleanup failed: {}", e);
                0
            }
        }
    }
}

fn entry_snapshot(entry: &ip_allowlist::Model) -> serde_json::Value {
    json!({
        "ip_address": entry.ip_address,
        "is_active": entry.is_active,
        "description": entry.description,
        "added_by": entry.added_by,
        "expires_at": entry.expires_at,
    })
}

impl fmt::Debug for IpAllowlistService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IpAllowlistService")
            .field("policy", &self.policy)
            .field("trust_dev_ranges", &self.trust_dev_ranges)
            .finish()
    }
}
