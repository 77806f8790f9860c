// Stores layer - Data access and repository pattern
pub mod audit_store;
pub mod csrf_token_store;
pub mod ip_allowlist_store;
pub mod password_history_store;

pub use audit_store::AuditStore;
pub use csrf_token_store::CsrfTokenStore;
pub use ip_allowlist_store::IpAllowlistStore;
pub use password_history_store::PasswordHistoryStore;
