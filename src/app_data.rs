use std::net::IpAddr;
use std::sync::Arc;

use crate::audit::{AuditQueryService, AuditRecorder, InvestigationService};
use crate::config::{BootstrapSettings, DatabaseConnections, SecretManager};
use crate::providers::{CryptoProvider, TokenProvider};
use crate::services::{
    CsrfService, ErrorPolicy, IpAllowlistService, PasswordHistoryService, PermissionOracle,
    StaticRoleTable,
};
use crate::stores::{AuditStore, CsrfTokenStore, IpAllowlistStore, PasswordHistoryStore};

/// Guard policy knobs taken from bootstrap settings
#[derive(Debug, Clone)]
pub struct GuardPolicy {
    pub allowlist_error_policy: ErrorPolicy,
    pub allowlist_trust_private: bool,
    /// Peers allowed to report the client address in forwarding headers
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self {
            allowlist_error_policy: ErrorPolicy::AllowOnError,
            allowlist_trust_private: true,
            trusted_proxies: Vec::new(),
        }
    }
}

impl From<&BootstrapSettings> for GuardPolicy {
    fn from(settings: &BootstrapSettings) -> Self {
        Self {
            allowlist_error_policy: settings.allowlist_error_policy(),
            allowlist_trust_private: settings.allowlist_trust_private(),
            trusted_proxies: settings.trusted_proxies().to_vec(),
        }
    }
}

/// Centralized application data following the main-owned stores pattern
///
/// Everything is created once and shared by the API layer and the CLI.
///
/// ```text
/// AppData::init()
///   ├─ connections (auth + audit DatabaseConnection)
///   ├─ providers: crypto, token
///   ├─ stores: audit, csrf_token, ip_allowlist, password_history
///   ├─ audit: recorder, query, investigation
///   └─ services: csrf, allowlist, password_history, permissions
/// ```
pub struct AppData {
    pub connections: DatabaseConnections,
    pub secret_manager: Arc<SecretManager>,

    pub crypto_provider: Arc<CryptoProvider>,
    pub token_provider: Arc<TokenProvider>,

    pub audit_store: Arc<AuditStore>,
    pub csrf_token_store: Arc<CsrfTokenStore>,
    pub ip_allowlist_store: Arc<IpAllowlistStore>,
    pub password_history_store: Arc<PasswordHistoryStore>,

    pub audit_recorder: Arc<AuditRecorder>,
    pub audit_query: Arc<AuditQueryService>,
    pub investigation: Arc<InvestigationService>,

    pub csrf_service: Arc<CsrfService>,
    pub allowlist_service: Arc<IpAllowlistService>,
    pub password_history_service: Arc<PasswordHistoryService>,
    pub permissions: Arc<dyn PermissionOracle>,

    pub guard_policy: GuardPolicy,
}

impl AppData {
    /// Wire every store and service onto the given connections
    ///
    /// Connections should already be migrated.
    pub fn init(connections: DatabaseConnections, secret_manager: Arc<SecretManager>, policy: GuardPolicy) -> Self {
        tracing::info!("Initializing AppData...");

        let crypto_provider = Arc::new(CryptoProvider::new(secret_manager.password_pepper()));
        let token_provider = Arc::new(TokenProvider::new(secret_manager.clone()));

        let audit_store = Arc::new(AuditStore::new(connections.audit.clone()));
        let csrf_token_store = Arc::new(CsrfTokenStore::new(connections.auth.clone()));
        let ip_allowlist_store = Arc::new(IpAllowlistStore::new(connections.auth.clone()));
        let password_history_store = Arc::new(PasswordHistoryStore::new(connections.auth.clone()));
        tracing::debug!("Stores created");

        let audit_recorder = Arc::new(AuditRecorder::new(audit_store.clone()));
        let audit_query = Arc::new(AuditQueryService::new(audit_store.clone()));
        let investigation = Arc::new(InvestigationService::new(audit_store.clone()));

        let csrf_service = Arc::new(CsrfService::new(csrf_token_store.clone(), crypto_provider.clone()));
        let allowlist_service = Arc::new(
            IpAllowlistService::new(
                ip_allowlist_store.clone(),
                audit_recorder.clone(),
                policy.allowlist_error_policy,
            )
            .with_dev_ranges_trusted(policy.allowlist_trust_private),
        );
        let password_history_service = Arc::new(PasswordHistoryService::new(
            password_history_store.clone(),
            crypto_provider.clone(),
        ));
        let permissions: Arc<dyn PermissionOracle> = Arc::new(StaticRoleTable::default_roles());
        tracing::debug!(?policy, "Services created");

        tracing::info!("AppData initialization complete");

        Self {
            connections,
            secret_manager,
            crypto_provider,
            token_provider,
            audit_store,
            csrf_token_store,
            ip_allowlist_store,
            password_history_store,
            audit_recorder,
            audit_query,
            investigation,
            csrf_service,
            allowlist_service,
            password_history_service,
            permissions,
            guard_policy: policy,
        }
    }
}
